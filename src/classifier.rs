use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, error};

use crate::{
    catalog::{FoodEntry, NutritionCatalog},
    devices::ImageHandle,
    error::ClassifyError,
};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

/// Stand-in for food recognition: waits, then picks a catalog entry at random.
pub struct Classifier {
    catalog: Arc<NutritionCatalog>,
    delay: Duration,
    rng: Mutex<StdRng>,
}

impl Classifier {
    pub fn new(catalog: Arc<NutritionCatalog>, delay: Duration) -> Self {
        Self {
            catalog,
            delay,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(catalog: Arc<NutritionCatalog>, delay: Duration, seed: u64) -> Self {
        Self {
            catalog,
            delay,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn catalog(&self) -> &NutritionCatalog {
        &self.catalog
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn classify(&self, image: &ImageHandle) -> Result<FoodEntry, ClassifyError> {
        if !image.is_valid() {
            error!(image = %image, "classify called with an invalid image handle");
            return Err(ClassifyError::InvalidInput);
        }
        if self.catalog.is_empty() {
            return Err(ClassifyError::EmptyCatalog);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let ids = self.catalog.all_ids();
        let idx = {
            let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
            rng.gen_range(0..ids.len())
        };
        let entry = self
            .catalog
            .lookup(ids[idx])
            .map_err(|_| ClassifyError::EmptyCatalog)?
            .clone();
        debug!(image = %image, food = %entry.id, "image classified");
        Ok(entry)
    }
}
