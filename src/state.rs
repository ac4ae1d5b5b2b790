use std::sync::Arc;

use tracing::info;

use crate::{
    catalog::NutritionCatalog,
    classifier::Classifier,
    clock::{Clock, SystemClock},
    config::{AppConfig, StorageBackend},
    devices::{HostImageSource, SourceKind},
    meals::MealStore,
    session::{SessionController, SessionDeps},
    storage::{FileStore, KeyValueStore, MemoryStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session: Arc<SessionController>,
    pub camera: Arc<HostImageSource>,
    pub library: Arc<HostImageSource>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let kv: Arc<dyn KeyValueStore> = match config.storage.backend {
            StorageBackend::File => {
                info!(dir = %config.storage.data_dir.display(), "using file store");
                Arc::new(FileStore::open(&config.storage.data_dir).await?)
            }
            StorageBackend::Memory => {
                info!("using in-memory store; meals are lost on exit");
                Arc::new(MemoryStore::new())
            }
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.utc_offset));
        Ok(Self::from_parts(config, kv, clock).await)
    }

    pub async fn from_parts(
        config: AppConfig,
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog = Arc::new(NutritionCatalog::builtin());
        let classifier = match config.classifier.seed {
            Some(seed) => Classifier::with_seed(catalog, config.classifier.delay, seed),
            None => Classifier::new(catalog, config.classifier.delay),
        };
        let camera = Arc::new(HostImageSource::new(SourceKind::Camera, config.camera_access));
        let library = Arc::new(HostImageSource::new(SourceKind::Library, config.library_access));
        let store = MealStore::new(kv, clock).with_prune_on_write(config.storage.prune_on_write);

        let session = SessionController::start(SessionDeps {
            camera: camera.clone(),
            library: library.clone(),
            classifier,
            store,
        })
        .await;

        Self {
            config: Arc::new(config),
            session: Arc::new(session),
            camera,
            library,
        }
    }

    pub fn source(&self, kind: SourceKind) -> &HostImageSource {
        match kind {
            SourceKind::Camera => &self.camera,
            SourceKind::Library => &self.library,
        }
    }

    /// In-memory state with no analysis delay, pinned to a fixed clock.
    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::clock::FixedClock;
        use time::{macros::datetime, UtcOffset};

        let config = AppConfig::from_lookup(|key| match key {
            "CLASSIFY_DELAY_MS" => Some("0".into()),
            "UTC_OFFSET_MINUTES" => Some("0".into()),
            "STORAGE_BACKEND" => Some("memory".into()),
            _ => None,
        })
        .expect("static test config");
        let clock = Arc::new(FixedClock::new(
            datetime!(2024-05-01 13:05 UTC),
            UtcOffset::UTC,
        ));
        Self::from_parts(config, Arc::new(MemoryStore::new()), clock).await
    }
}
