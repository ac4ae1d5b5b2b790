//! Meal logging core: capture or pick a food photo, run the simulated
//! analysis, log the result for today and keep the daily totals current.

pub mod app;
pub mod catalog;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod devices;
pub mod error;
pub mod meals;
pub mod session;
pub mod state;
pub mod storage;

pub use catalog::{FoodEntry, NutritionCatalog};
pub use classifier::Classifier;
pub use devices::{ImageHandle, ImageSource, SourceKind};
pub use meals::{DailyTotals, MealRecord, MealStore, NutritionFacts};
pub use session::{SessionController, SessionDeps, SessionState};
pub use storage::KeyValueStore;
