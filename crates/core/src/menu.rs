use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allergens::AllergenSet;
use crate::errors::MenuError;

/// A single menu item. Immutable after the menu is loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub allergens: AllergenSet,
    #[serde(default)]
    pub vegetarian: bool,
    #[serde(default)]
    pub spicy: bool,
}

/// Category name to dish list, as fed by the menu source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Menu {
    pub categories: BTreeMap<String, Vec<Dish>>,
}

impl Menu {
    pub fn from_toml_str(raw: &str) -> Result<Self, MenuError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn dishes(&self) -> impl Iterator<Item = &Dish> {
        self.categories.values().flatten()
    }
}

/// Read-only lookup from lower-cased dish name to dish record.
/// Built once from a `Menu` and shared for the process lifetime.
#[derive(Clone, Debug)]
pub struct MenuIndex {
    dishes: BTreeMap<String, Dish>,
}

impl MenuIndex {
    pub fn build(menu: &Menu) -> Result<Self, MenuError> {
        let mut dishes = BTreeMap::new();
        for (category, items) in &menu.categories {
            for dish in items {
                let key = dish.name.trim().to_lowercase();
                if key.is_empty() {
                    return Err(MenuError::EmptyDishName { category: category.clone() });
                }
                if dish.price < Decimal::ZERO {
                    return Err(MenuError::NegativePrice {
                        dish: dish.name.clone(),
                        price: dish.price,
                    });
                }
                if dishes.insert(key.clone(), dish.clone()).is_some() {
                    return Err(MenuError::DuplicateDish { name: key });
                }
            }
        }
        Ok(Self { dishes })
    }

    pub fn get(&self, name: &str) -> Option<&Dish> {
        self.dishes.get(&name.to_lowercase())
    }

    /// Iterate `(lower-cased name, dish)` pairs in stable order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Dish)> {
        self.dishes.iter().map(|(key, dish)| (key.as_str(), dish))
    }

    pub fn len(&self) -> usize {
        self.dishes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }
}
