use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    catalog::FoodEntry,
    classifier::Classifier,
    clock::Clock,
    devices::{ImageHandle, ImageSource, SourceKind},
    error::{SessionError, StoreError},
    meals::{services, DailyTotals, MealRecord, MealStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Capturing,
    Classifying,
    ResultsReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    PermissionDenied,
    CaptureFailed,
    PickFailed,
    StorageWriteFailed,
}

/// Transient, non-fatal message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn from_session_error(err: &SessionError) -> Option<Self> {
        let kind = match err {
            SessionError::PermissionDenied(_) => NoticeKind::PermissionDenied,
            SessionError::CaptureFailed(_) => NoticeKind::CaptureFailed,
            SessionError::PickFailed(_) => NoticeKind::PickFailed,
            SessionError::Classify(_) => return None,
        };
        Some(Self {
            kind,
            message: err.to_string(),
        })
    }

    fn from_store_error(err: &StoreError) -> Self {
        Self {
            kind: NoticeKind::StorageWriteFailed,
            message: err.to_string(),
        }
    }
}

/// Everything a session needs from the outside.
pub struct SessionDeps {
    pub camera: Arc<dyn ImageSource>,
    pub library: Arc<dyn ImageSource>,
    pub classifier: Classifier,
    pub store: MealStore,
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub meals: Vec<MealRecord>,
    pub totals: DailyTotals,
    pub current: Option<MealRecord>,
    pub notice: Option<Notice>,
}

struct Shared {
    camera: Arc<dyn ImageSource>,
    library: Arc<dyn ImageSource>,
    classifier: Classifier,
    clock: Arc<dyn Clock>,
    store: tokio::sync::Mutex<MealStore>,
    state: watch::Sender<SessionState>,
    meals: watch::Sender<Vec<MealRecord>>,
    totals: watch::Sender<DailyTotals>,
    current: watch::Sender<Option<MealRecord>>,
    notice: watch::Sender<Option<Notice>>,
    slot: Mutex<Slot>,
}

/// The running session task. `committing` is set once a result has been
/// claimed for saving; from then on the session can no longer be cancelled.
#[derive(Default)]
struct Slot {
    task: Option<JoinHandle<()>>,
    committing: bool,
}

/// Drives capture → classify → store → aggregate for one user session.
///
/// Actions return immediately; the session itself runs on a spawned task,
/// so they must be called from within a Tokio runtime. State is published
/// through watch channels. At most one session task exists at a time.
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    /// Load today's meals and come up `Idle`.
    ///
    /// An unreadable history starts the day empty.
    pub async fn start(deps: SessionDeps) -> Self {
        let SessionDeps {
            camera,
            library,
            classifier,
            mut store,
        } = deps;

        let meals = match store.load_today().await {
            Ok(meals) => meals,
            Err(e) => {
                warn!(error = %e, "meal history unavailable; starting with an empty day");
                Vec::new()
            }
        };
        let totals = services::recompute(&meals);
        info!(meals = meals.len(), calories = totals.calories, "session ready");

        let shared = Shared {
            camera,
            library,
            classifier,
            clock: store.clock(),
            store: tokio::sync::Mutex::new(store),
            state: watch::Sender::new(SessionState::Idle),
            meals: watch::Sender::new(meals),
            totals: watch::Sender::new(totals),
            current: watch::Sender::new(None),
            notice: watch::Sender::new(None),
            slot: Mutex::new(Slot::default()),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn session_state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    pub fn todays_meals(&self) -> Vec<MealRecord> {
        self.shared.meals.borrow().clone()
    }

    pub fn daily_totals(&self) -> DailyTotals {
        *self.shared.totals.borrow()
    }

    /// The meal shown while in `ResultsReady`.
    pub fn current_result(&self) -> Option<MealRecord> {
        self.shared.current.borrow().clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.shared.notice.borrow().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.session_state(),
            meals: self.todays_meals(),
            totals: self.daily_totals(),
            current: self.current_result(),
            notice: self.notice(),
        }
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn watch_meals(&self) -> watch::Receiver<Vec<MealRecord>> {
        self.shared.meals.subscribe()
    }

    pub fn watch_totals(&self) -> watch::Receiver<DailyTotals> {
        self.shared.totals.subscribe()
    }

    pub fn watch_notice(&self) -> watch::Receiver<Option<Notice>> {
        self.shared.notice.subscribe()
    }

    /// Open the camera. Ignored unless `Idle`.
    pub fn start_capture(&self) -> bool {
        self.begin(SourceKind::Camera)
    }

    /// Open the photo library. Ignored unless `Idle`.
    pub fn start_pick(&self) -> bool {
        self.begin(SourceKind::Library)
    }

    fn begin(&self, kind: SourceKind) -> bool {
        let mut slot = self.shared.lock_slot();
        let accepted = self.shared.state.send_if_modified(|s| {
            if *s == SessionState::Idle {
                *s = SessionState::Capturing;
                true
            } else {
                false
            }
        });
        if !accepted {
            debug!(source = %kind, state = ?self.session_state(), "session busy; request ignored");
            return false;
        }

        // a finished session only reaches Idle as its last state change
        if let Some(previous) = slot.task.take() {
            previous.abort();
        }
        self.shared.notice.send_replace(None);
        let shared = self.shared.clone();
        slot.task = Some(tokio::spawn(shared.run(kind)));
        info!(source = %kind, "session started");
        true
    }

    /// Abandon a capture or classification in progress.
    ///
    /// Ignored once classification has produced a meal that is being saved.
    pub fn cancel_session(&self) -> bool {
        let mut slot = self.shared.lock_slot();
        if slot.committing {
            debug!("meal already being saved; cancel ignored");
            return false;
        }
        let cancelled = self.shared.state.send_if_modified(|s| {
            if matches!(*s, SessionState::Capturing | SessionState::Classifying) {
                *s = SessionState::Idle;
                true
            } else {
                false
            }
        });
        if cancelled {
            if let Some(handle) = slot.task.take() {
                handle.abort();
            }
            info!("session cancelled");
        }
        cancelled
    }

    /// Close the results. The meal was saved when classification finished.
    pub fn dismiss_results(&self) -> bool {
        let dismissed = self.shared.state.send_if_modified(|s| {
            if *s == SessionState::ResultsReady {
                *s = SessionState::Idle;
                true
            } else {
                false
            }
        });
        if dismissed {
            self.shared.current.send_replace(None);
            debug!("results dismissed");
        }
        dismissed
    }

    /// "Save to My Meals". Same as dismissing since the meal is already logged.
    pub fn save_results(&self) -> bool {
        if let Some(meal) = self.current_result() {
            debug!(meal_id = %meal.id, "meal already persisted on classification");
        }
        self.dismiss_results()
    }

    /// Forget every logged meal.
    ///
    /// Memory is cleared even when the write fails; the failure is also
    /// raised as a notice.
    pub async fn clear_history(&self) -> Result<(), StoreError> {
        let mut store = self.shared.store.lock().await;
        let result = store.clear().await;
        self.shared.publish(&store);
        drop(store);

        match &result {
            Ok(()) => info!("meal history cleared"),
            Err(e) => {
                warn!(error = %e, "meal history cleared in memory only");
                self.shared
                    .notice
                    .send_replace(Some(Notice::from_store_error(e)));
            }
        }
        result
    }

    /// Abort any in-flight session task.
    pub fn shutdown(&self) {
        let mut slot = self.shared.lock_slot();
        if let Some(handle) = slot.task.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn source(&self, kind: SourceKind) -> &dyn ImageSource {
        match kind {
            SourceKind::Camera => self.camera.as_ref(),
            SourceKind::Library => self.library.as_ref(),
        }
    }

    async fn run(self: Arc<Self>, kind: SourceKind) {
        match self.acquire_and_classify(kind).await {
            Ok(Some((image, entry))) => {
                if self.claim_result() {
                    self.commit(image, entry).await;
                } else {
                    debug!(image = %image, "session cancelled; result discarded");
                }
            }
            Ok(None) => self.return_to_idle(),
            Err(err) => self.fail(err),
        }
    }

    async fn acquire_and_classify(
        &self,
        kind: SourceKind,
    ) -> Result<Option<(ImageHandle, FoodEntry)>, SessionError> {
        let source = self.source(kind);
        if !source.request_access().await {
            return Err(SessionError::PermissionDenied(kind));
        }

        let image = match source.acquire().await {
            Ok(Some(image)) => image,
            Ok(None) => {
                info!(source = %kind, "cancelled by user");
                return Ok(None);
            }
            Err(e) => return Err(SessionError::acquisition(kind, e)),
        };

        let classifying = self.state.send_if_modified(|s| {
            if *s == SessionState::Capturing {
                *s = SessionState::Classifying;
                true
            } else {
                false
            }
        });
        if !classifying {
            return Ok(None);
        }
        debug!(source = %kind, image = %image, "analyzing food");

        let entry = self.classifier.classify(&image).await?;
        Ok(Some((image, entry)))
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the classified meal for saving unless the session was cancelled.
    fn claim_result(&self) -> bool {
        let mut slot = self.lock_slot();
        if *self.state.borrow() != SessionState::Classifying {
            return false;
        }
        slot.committing = true;
        true
    }

    /// Save a claimed meal and show it. The state stays `Classifying` until
    /// the meal is stored, and nothing else can move it meanwhile.
    async fn commit(&self, image: ImageHandle, entry: FoodEntry) {
        let record = MealRecord {
            id: Uuid::now_v7().to_string(),
            image,
            captured_at: truncate_to_millis(self.clock.now_utc()),
            food_name: entry.display_name,
            facts: entry.facts,
        };

        let mut store = self.store.lock().await;
        if let Err(e) = store.append(record.clone()).await {
            warn!(error = %e, meal_id = %record.id, "meal kept in memory but not persisted");
            self.notice
                .send_replace(Some(Notice::from_store_error(&e)));
        }
        self.publish(&store);
        drop(store);

        {
            let mut slot = self.lock_slot();
            slot.committing = false;
            self.current.send_replace(Some(record.clone()));
            self.state.send_replace(SessionState::ResultsReady);
        }
        info!(
            meal_id = %record.id,
            food = %record.food_name,
            calories = record.facts.calories,
            "meal logged"
        );
    }

    fn publish(&self, store: &MealStore) {
        let meals = store.todays_meals();
        self.totals.send_replace(services::recompute(meals));
        self.meals.send_replace(meals.to_vec());
    }

    fn fail(&self, err: SessionError) {
        match Notice::from_session_error(&err) {
            Some(notice) => {
                warn!(error = %err, "session ended early");
                self.notice.send_replace(Some(notice));
            }
            None => error!(error = %err, "session ended on a wiring fault"),
        }
        self.return_to_idle();
    }

    fn return_to_idle(&self) {
        self.state.send_if_modified(|s| {
            if matches!(*s, SessionState::Capturing | SessionState::Classifying) {
                *s = SessionState::Idle;
                true
            } else {
                false
            }
        });
    }
}

fn truncate_to_millis(at: OffsetDateTime) -> OffsetDateTime {
    at.replace_nanosecond(u32::from(at.millisecond()) * 1_000_000)
        .unwrap_or(at)
}
