use std::sync::Arc;

use tracing::{debug, warn};

use super::repo_types::MealRecord;
use crate::{clock::Clock, error::StoreError, storage::KeyValueStore};

/// Key holding the serialized meal history.
pub const HISTORY_KEY: &str = "mealHistory";

/// Today's meals on top of the full persisted history.
///
/// Loading filters the active set down to the current local day; writing
/// always rewrites the whole history so earlier days survive unless
/// `prune_on_write` is set.
pub struct MealStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    prune_on_write: bool,
    history: Vec<MealRecord>,
    today: Vec<MealRecord>,
}

impl MealStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            clock,
            prune_on_write: false,
            history: Vec::new(),
            today: Vec::new(),
        }
    }

    pub fn with_prune_on_write(mut self, prune: bool) -> Self {
        self.prune_on_write = prune;
        self
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn todays_meals(&self) -> &[MealRecord] {
        &self.today
    }

    pub fn history(&self) -> &[MealRecord] {
        &self.history
    }

    /// Restore the persisted history and return the meals logged today.
    ///
    /// On error both sets are left empty.
    pub async fn load_today(&mut self) -> Result<Vec<MealRecord>, StoreError> {
        self.history.clear();
        self.today.clear();

        let raw = self
            .kv
            .get(HISTORY_KEY)
            .await
            .map_err(StoreError::StorageReadFailed)?;
        let Some(raw) = raw else {
            debug!("no meal history persisted yet");
            return Ok(Vec::new());
        };
        let history: Vec<MealRecord> = serde_json::from_str(&raw)?;

        let today = self.clock.today();
        self.today = history
            .iter()
            .filter(|m| self.clock.local_date(m.captured_at) == today)
            .cloned()
            .collect();
        self.history = history;
        debug!(
            total = self.history.len(),
            today = self.today.len(),
            %today,
            "meal history loaded"
        );
        Ok(self.today.clone())
    }

    /// Add a meal and rewrite the persisted history.
    ///
    /// The meal stays in memory even when the write fails.
    pub async fn append(&mut self, record: MealRecord) -> Result<(), StoreError> {
        self.today.push(record.clone());
        self.history.push(record);
        if self.prune_on_write {
            self.prune();
        }
        self.persist().await
    }

    pub async fn clear(&mut self) -> Result<(), StoreError> {
        self.today.clear();
        self.history.clear();
        self.persist().await
    }

    fn prune(&mut self) {
        let clock = self.clock.clone();
        let today = clock.today();
        let before = self.history.len();
        self.history
            .retain(|m| clock.local_date(m.captured_at) >= today);
        if self.history.len() != before {
            debug!(dropped = before - self.history.len(), "pruned meals from earlier days");
        }
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&self.history)
            .map_err(|e| StoreError::StorageWriteFailed(e.into()))?;
        self.kv.set(HISTORY_KEY, payload).await.map_err(|e| {
            warn!(error = %e, meals = self.history.len(), "meal history write failed");
            StoreError::StorageWriteFailed(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::FixedClock,
        devices::ImageHandle,
        meals::NutritionFacts,
        storage::MemoryStore,
    };
    use time::{macros::datetime, OffsetDateTime, UtcOffset};

    const NOW: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(NOW, UtcOffset::UTC))
    }

    fn meal(id: &str, at: OffsetDateTime) -> MealRecord {
        MealRecord {
            id: id.into(),
            image: ImageHandle::new(format!("file:///photos/{id}.jpg")),
            captured_at: at,
            food_name: "Steak".into(),
            facts: NutritionFacts::new(271.0, 26.0, 0.0, 17.0),
        }
    }

    async fn persisted(kv: &MemoryStore) -> Vec<MealRecord> {
        let raw = kv.get(HISTORY_KEY).await.unwrap().expect("payload written");
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn missing_payload_is_an_empty_day() {
        let mut store = MealStore::new(Arc::new(MemoryStore::new()), clock());
        assert!(store.load_today().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appended_meal_survives_reload_unchanged() {
        let kv = Arc::new(MemoryStore::new());
        let first = meal("a", datetime!(2024-05-01 08:15:30.125 UTC));
        let second = meal("b", datetime!(2024-05-01 11:00 UTC));

        let mut store = MealStore::new(kv.clone(), clock());
        store.load_today().await.unwrap();
        store.append(first.clone()).await.unwrap();
        store.append(second.clone()).await.unwrap();

        let mut reopened = MealStore::new(kv, clock());
        assert_eq!(reopened.load_today().await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn earlier_days_are_filtered_but_kept_in_payload() {
        let yesterday = meal("y", datetime!(2024-04-30 21:00 UTC));
        let today = meal("t", datetime!(2024-05-01 07:00 UTC));
        let payload = serde_json::to_string(&vec![yesterday.clone(), today.clone()]).unwrap();
        let kv = Arc::new(MemoryStore::with_entry(HISTORY_KEY, payload).await);

        let mut store = MealStore::new(kv.clone(), clock());
        assert_eq!(store.load_today().await.unwrap(), vec![today.clone()]);
        assert_eq!(store.history().len(), 2);

        let lunch = meal("l", NOW);
        store.append(lunch.clone()).await.unwrap();
        assert_eq!(store.todays_meals(), &[today.clone(), lunch.clone()]);
        assert_eq!(persisted(&kv).await, vec![yesterday, today, lunch]);
    }

    #[tokio::test]
    async fn day_boundary_uses_local_offset() {
        // 23:30 UTC on the 30th is already May 1st at +02:00
        let late = meal("late", datetime!(2024-04-30 23:30 UTC));
        let payload = serde_json::to_string(&vec![late.clone()]).unwrap();
        let kv = Arc::new(MemoryStore::with_entry(HISTORY_KEY, payload).await);
        let clock = Arc::new(FixedClock::new(NOW, time::macros::offset!(+2)));

        let mut store = MealStore::new(kv, clock);
        assert_eq!(store.load_today().await.unwrap(), vec![late]);
    }

    #[tokio::test]
    async fn prune_on_write_drops_earlier_days() {
        let yesterday = meal("y", datetime!(2024-04-30 21:00 UTC));
        let payload = serde_json::to_string(&vec![yesterday]).unwrap();
        let kv = Arc::new(MemoryStore::with_entry(HISTORY_KEY, payload).await);

        let mut store = MealStore::new(kv.clone(), clock()).with_prune_on_write(true);
        assert!(store.load_today().await.unwrap().is_empty());
        let lunch = meal("l", NOW);
        store.append(lunch.clone()).await.unwrap();
        assert_eq!(persisted(&kv).await, vec![lunch]);
    }

    #[tokio::test]
    async fn corrupt_payload_reports_and_leaves_store_usable() {
        let kv = Arc::new(MemoryStore::with_entry(HISTORY_KEY, "{not json").await);
        let mut store = MealStore::new(kv.clone(), clock());

        let err = store.load_today().await.unwrap_err();
        assert!(matches!(err, StoreError::StorageCorrupt(_)));
        assert!(store.todays_meals().is_empty());

        let lunch = meal("l", NOW);
        store.append(lunch.clone()).await.unwrap();
        assert_eq!(persisted(&kv).await, vec![lunch]);
    }

    #[tokio::test]
    async fn failed_write_keeps_meal_in_memory() {
        let kv = Arc::new(MemoryStore::new());
        kv.set_fail_writes(true);
        let mut store = MealStore::new(kv.clone(), clock());

        let lunch = meal("l", NOW);
        let err = store.append(lunch.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageWriteFailed(_)));
        assert_eq!(store.todays_meals(), &[lunch]);
        assert_eq!(kv.get(HISTORY_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_empties_memory_and_payload() {
        let kv = Arc::new(MemoryStore::new());
        let mut store = MealStore::new(kv.clone(), clock());
        store.append(meal("l", NOW)).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.todays_meals().is_empty());
        assert!(store.history().is_empty());
        assert_eq!(kv.get(HISTORY_KEY).await.unwrap().as_deref(), Some("[]"));
    }
}
