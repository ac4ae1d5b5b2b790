use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use time::UtcOffset;

use crate::{classifier::DEFAULT_DELAY, meals::NutritionGoals};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("unknown storage backend {:?}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    pub prune_on_write: bool,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub delay: Duration,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    pub classifier: ClassifierConfig,
    pub utc_offset: UtcOffset,
    pub camera_access: bool,
    pub library_access: bool,
    pub goals: NutritionGoals,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let utc_offset = match get("UTC_OFFSET_MINUTES") {
            Some(v) => {
                let minutes: i32 = v.trim().parse().context("UTC_OFFSET_MINUTES")?;
                let seconds = minutes
                    .checked_mul(60)
                    .context("UTC_OFFSET_MINUTES out of range")?;
                UtcOffset::from_whole_seconds(seconds).context("UTC_OFFSET_MINUTES out of range")?
            }
            None => UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        };

        let defaults = NutritionGoals::default();
        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "APP_PORT", 8080)?,
            storage: StorageConfig {
                backend: parse_or(&get, "STORAGE_BACKEND", StorageBackend::File)?,
                data_dir: get("DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data")),
                prune_on_write: parse_or(&get, "PRUNE_ON_WRITE", false)?,
            },
            classifier: ClassifierConfig {
                delay: get("CLASSIFY_DELAY_MS")
                    .map(|v| v.trim().parse::<u64>().context("CLASSIFY_DELAY_MS"))
                    .transpose()?
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_DELAY),
                seed: get("CLASSIFIER_SEED")
                    .map(|v| v.trim().parse::<u64>().context("CLASSIFIER_SEED"))
                    .transpose()?,
            },
            utc_offset,
            camera_access: parse_or(&get, "CAMERA_ACCESS", true)?,
            library_access: parse_or(&get, "LIBRARY_ACCESS", true)?,
            goals: NutritionGoals {
                calories: parse_or(&get, "GOAL_CALORIES", defaults.calories)?,
                protein_g: parse_or(&get, "GOAL_PROTEIN_G", defaults.protein_g)?,
                carbs_g: parse_or(&get, "GOAL_CARBS_G", defaults.carbs_g)?,
                fat_g: parse_or(&get, "GOAL_FAT_G", defaults.fat_g)?,
            },
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", key, v, e)),
        None => Ok(default),
    }
}
