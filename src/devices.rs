//! Camera and photo library collaborators.
//!
//! Both are reached through [`ImageSource`]. The binary uses
//! [`HostImageSource`], which parks the session until the host platform
//! delivers the captured or picked image over HTTP.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

/// Opaque reference to an image owned by the host (usually a file URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHandle(String);

impl ImageHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn uri(&self) -> &str {
        &self.0
    }

    /// A blank reference cannot point at an image.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Camera,
    Library,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Camera => f.write_str("camera"),
            SourceKind::Library => f.write_str("library"),
        }
    }
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Ask the user for access. `false` means refused.
    async fn request_access(&self) -> bool;

    /// `Ok(None)` when the user cancelled.
    async fn acquire(&self) -> anyhow::Result<Option<ImageHandle>>;
}

enum Delivery {
    Image(ImageHandle),
    Cancelled,
}

/// Image source fed by the host platform.
///
/// `acquire` registers a waiter and suspends until the host calls
/// [`deliver`](Self::deliver) or [`cancel`](Self::cancel). Only the most
/// recent waiter is kept.
pub struct HostImageSource {
    kind: SourceKind,
    access_granted: bool,
    waiter: Mutex<Option<oneshot::Sender<Delivery>>>,
}

impl HostImageSource {
    pub fn new(kind: SourceKind, access_granted: bool) -> Self {
        Self {
            kind,
            access_granted,
            waiter: Mutex::new(None),
        }
    }

    /// Whether a session is currently waiting on this source.
    pub async fn is_waiting(&self) -> bool {
        self.waiter
            .lock()
            .await
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Hand an image to the waiting session. Returns `false` if nobody waits.
    pub async fn deliver(&self, image: ImageHandle) -> bool {
        self.resolve(Delivery::Image(image)).await
    }

    /// Report that the user backed out. Returns `false` if nobody waits.
    pub async fn cancel(&self) -> bool {
        self.resolve(Delivery::Cancelled).await
    }

    async fn resolve(&self, delivery: Delivery) -> bool {
        let Some(tx) = self.waiter.lock().await.take() else {
            debug!(source = %self.kind, "no session waiting for an image");
            return false;
        };
        if tx.send(delivery).is_err() {
            debug!(source = %self.kind, "session stopped waiting before delivery");
            return false;
        }
        true
    }
}

#[async_trait]
impl ImageSource for HostImageSource {
    async fn request_access(&self) -> bool {
        self.access_granted
    }

    async fn acquire(&self) -> anyhow::Result<Option<ImageHandle>> {
        let (tx, rx) = oneshot::channel();
        if self.waiter.lock().await.replace(tx).is_some() {
            warn!(source = %self.kind, "replacing a stale image waiter");
        }
        match rx.await {
            Ok(Delivery::Image(image)) => Ok(Some(image)),
            Ok(Delivery::Cancelled) => Ok(None),
            Err(_) => anyhow::bail!("{} waiter dropped without a result", self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn blank_handles_are_invalid() {
        assert!(ImageHandle::new("file:///tmp/a.jpg").is_valid());
        assert!(!ImageHandle::new("").is_valid());
        assert!(!ImageHandle::new("   ").is_valid());
    }

    #[tokio::test]
    async fn deliver_without_waiter_is_rejected() {
        let source = HostImageSource::new(SourceKind::Camera, true);
        assert!(!source.is_waiting().await);
        assert!(!source.deliver(ImageHandle::new("file:///a.jpg")).await);
        assert!(!source.cancel().await);
    }

    #[tokio::test]
    async fn acquire_resolves_with_delivered_image() {
        let source = Arc::new(HostImageSource::new(SourceKind::Library, true));
        let waiting = {
            let source = source.clone();
            tokio::spawn(async move { source.acquire().await })
        };

        while !source.is_waiting().await {
            tokio::task::yield_now().await;
        }
        assert!(source.deliver(ImageHandle::new("file:///b.jpg")).await);

        let got = waiting.await.unwrap().unwrap();
        assert_eq!(got, Some(ImageHandle::new("file:///b.jpg")));
        assert!(!source.is_waiting().await);
    }

    #[tokio::test]
    async fn acquire_resolves_to_none_on_cancel() {
        let source = Arc::new(HostImageSource::new(SourceKind::Camera, true));
        let waiting = {
            let source = source.clone();
            tokio::spawn(async move { source.acquire().await })
        };

        while !source.is_waiting().await {
            tokio::task::yield_now().await;
        }
        assert!(source.cancel().await);
        assert_eq!(waiting.await.unwrap().unwrap(), None);
    }

    #[tokio::test]
    async fn access_answer_comes_from_construction() {
        assert!(HostImageSource::new(SourceKind::Camera, true).request_access().await);
        assert!(!HostImageSource::new(SourceKind::Library, false).request_access().await);
    }
}
