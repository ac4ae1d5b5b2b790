use std::collections::HashSet;

use serde::Serialize;

use crate::{error::CatalogError, meals::NutritionFacts};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodEntry {
    pub id: String,
    pub display_name: String,
    pub facts: NutritionFacts,
}

const BUILTIN_FOODS: [(&str, &str, NutritionFacts); 8] = [
    ("apple", "Apple", NutritionFacts::new(95.0, 0.5, 25.0, 0.3)),
    ("banana", "Banana", NutritionFacts::new(105.0, 1.3, 27.0, 0.4)),
    ("pizza", "Pizza Slice", NutritionFacts::new(285.0, 12.0, 36.0, 10.0)),
    ("burger", "Burger", NutritionFacts::new(354.0, 20.0, 40.0, 17.0)),
    ("salad", "Garden Salad", NutritionFacts::new(152.0, 7.0, 10.0, 8.0)),
    ("pasta", "Pasta Dish", NutritionFacts::new(200.0, 7.0, 43.0, 1.1)),
    ("steak", "Steak", NutritionFacts::new(271.0, 26.0, 0.0, 17.0)),
    ("sushi", "Sushi Roll", NutritionFacts::new(140.0, 6.0, 28.0, 0.5)),
];

/// Fixed food table, kept in definition order.
#[derive(Debug, Clone)]
pub struct NutritionCatalog {
    entries: Vec<FoodEntry>,
}

impl NutritionCatalog {
    pub fn new(entries: Vec<FoodEntry>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for e in &entries {
            if !seen.insert(e.id.as_str()) {
                return Err(CatalogError::DuplicateId(e.id.clone()));
            }
            if !e.facts.is_valid() {
                return Err(CatalogError::InvalidFacts(e.id.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn builtin() -> Self {
        let entries = BUILTIN_FOODS
            .iter()
            .map(|(id, name, facts)| FoodEntry {
                id: (*id).to_string(),
                display_name: (*name).to_string(),
                facts: *facts,
            })
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, id: &str) -> Result<&FoodEntry, CatalogError> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    pub fn all_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &FoodEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NutritionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
