use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical allergen tags shared by menu records and session constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allergen {
    Gluten,
    Peanuts,
    Dairy,
    Shellfish,
    Eggs,
    Soy,
    Nuts,
}

/// A set of allergen constraints. `BTreeSet` keeps iteration order stable.
pub type AllergenSet = BTreeSet<Allergen>;

impl Allergen {
    pub const ALL: [Allergen; 7] = [
        Allergen::Gluten,
        Allergen::Peanuts,
        Allergen::Dairy,
        Allergen::Shellfish,
        Allergen::Eggs,
        Allergen::Soy,
        Allergen::Nuts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gluten => "gluten",
            Self::Peanuts => "peanuts",
            Self::Dairy => "dairy",
            Self::Shellfish => "shellfish",
            Self::Eggs => "eggs",
            Self::Soy => "soy",
            Self::Nuts => "nuts",
        }
    }

    pub fn from_canonical(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|allergen| allergen.as_str() == token)
    }

    /// Common user phrasings that map onto a canonical tag.
    pub fn from_synonym(token: &str) -> Option<Self> {
        match token {
            "milk" | "cheese" | "lactose" => Some(Self::Dairy),
            "peanut" => Some(Self::Peanuts),
            "nut" => Some(Self::Nuts),
            "egg" => Some(Self::Eggs),
            "prawn" | "prawns" | "shrimp" => Some(Self::Shellfish),
            _ => None,
        }
    }
}

impl fmt::Display for Allergen {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Allergen;

    #[test]
    fn canonical_round_trip_covers_every_tag() {
        for allergen in Allergen::ALL {
            assert_eq!(Allergen::from_canonical(allergen.as_str()), Some(allergen));
        }
    }

    #[test]
    fn synonyms_resolve_to_canonical_tags() {
        assert_eq!(Allergen::from_synonym("milk"), Some(Allergen::Dairy));
        assert_eq!(Allergen::from_synonym("cheese"), Some(Allergen::Dairy));
        assert_eq!(Allergen::from_synonym("peanut"), Some(Allergen::Peanuts));
        assert_eq!(Allergen::from_synonym("egg"), Some(Allergen::Eggs));
        assert_eq!(Allergen::from_synonym("shrimp"), Some(Allergen::Shellfish));
        assert_eq!(Allergen::from_synonym("bread"), None);
    }

    #[test]
    fn serde_uses_snake_case_tags() {
        let json = serde_json::to_string(&Allergen::Shellfish).expect("serialize");
        assert_eq!(json, "\"shellfish\"");
        let parsed: Allergen = serde_json::from_str("\"peanuts\"").expect("deserialize");
        assert_eq!(parsed, Allergen::Peanuts);
    }
}
