use std::collections::BTreeMap;

use regex::Regex;
use serde_json::json;

use crate::allergens::{Allergen, AllergenSet};
use crate::menu::MenuIndex;
use crate::validation::{ErrorKind, Severity, ValidationError, Validator};

/// Flags responses that endanger allergic users: recommending a dish
/// that violates the session constraints, or claiming a dish is free
/// of an allergen it actually contains. Findings are always CRITICAL
/// and never carry a correction; the only safe handling is to block
/// and regenerate.
pub struct AllergenValidator {
    absence_patterns: Vec<(Allergen, Vec<Regex>)>,
}

impl AllergenValidator {
    pub fn new() -> Self {
        let absence_patterns = vec![
            (
                Allergen::Gluten,
                compile(&[
                    r"gluten[\s-]*free",
                    r"no\s+gluten",
                    r"without\s+gluten",
                    r"contains\s+no\s+gluten",
                ]),
            ),
            (
                Allergen::Peanuts,
                compile(&[
                    r"peanut[\s-]*free",
                    r"no\s+peanuts?",
                    r"without\s+peanuts?",
                    r"nut[\s-]*free",
                ]),
            ),
            (
                Allergen::Nuts,
                compile(&[r"nut[\s-]*free", r"no\s+nuts?", r"without\s+nuts?"]),
            ),
            (
                Allergen::Dairy,
                compile(&[
                    r"dairy[\s-]*free",
                    r"no\s+dairy",
                    r"without\s+dairy",
                    r"lactose[\s-]*free",
                ]),
            ),
            (
                Allergen::Shellfish,
                compile(&[r"shellfish[\s-]*free", r"no\s+shellfish", r"without\s+shellfish"]),
            ),
            (
                Allergen::Eggs,
                compile(&[r"egg[\s-]*free", r"no\s+eggs?", r"without\s+eggs?"]),
            ),
            (
                Allergen::Soy,
                compile(&[r"soy[\s-]*free", r"no\s+soy", r"without\s+soy"]),
            ),
        ];
        Self { absence_patterns }
    }

    fn unsafe_recommendation(dish_name: &str, violating: &[Allergen], constraints: &AllergenSet) -> ValidationError {
        let violating_tags: Vec<&str> = violating.iter().map(Allergen::as_str).collect();
        let details = BTreeMap::from([
            ("dish".to_string(), json!(dish_name)),
            ("violating_allergens".to_string(), json!(violating_tags)),
            (
                "user_constraints".to_string(),
                json!(constraints.iter().map(Allergen::as_str).collect::<Vec<_>>()),
            ),
        ]);

        ValidationError {
            kind: ErrorKind::UnsafeRecommendation,
            severity: Severity::Critical,
            message: format!(
                "response mentions `{dish_name}`, which contains {} the user is allergic to",
                violating_tags.join(", ")
            ),
            details,
            correction: None,
        }
    }

    fn misinformation(dish_name: &str, allergen: Allergen) -> ValidationError {
        let details = BTreeMap::from([
            ("dish".to_string(), json!(dish_name)),
            ("allergen_found".to_string(), json!(allergen.as_str())),
        ]);

        ValidationError {
            kind: ErrorKind::AllergenMisinformation,
            severity: Severity::Critical,
            message: format!(
                "`{dish_name}` contains {allergen}, but the response suggests it is {allergen}-free"
            ),
            details,
            correction: None,
        }
    }
}

impl Default for AllergenValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|pattern| Regex::new(pattern).expect("static absence pattern")).collect()
}

impl Validator for AllergenValidator {
    fn validate(
        &self,
        text: &str,
        index: &MenuIndex,
        constraints: &AllergenSet,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let text_lower = text.to_lowercase();

        for (name_lower, dish) in index.entries() {
            if !text_lower.contains(name_lower) {
                continue;
            }

            let violating: Vec<Allergen> =
                constraints.intersection(&dish.allergens).copied().collect();
            if !violating.is_empty() {
                errors.push(Self::unsafe_recommendation(&dish.name, &violating, constraints));
                // Already blocked for this dish; wording checks add nothing.
                continue;
            }

            for (allergen, patterns) in &self.absence_patterns {
                if !dish.allergens.contains(allergen) {
                    continue;
                }
                if patterns.iter().any(|pattern| pattern.is_match(&text_lower)) {
                    errors.push(Self::misinformation(&dish.name, *allergen));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::allergens::{Allergen, AllergenSet};
    use crate::fixtures::sample_menu;
    use crate::menu::MenuIndex;
    use crate::validation::{ErrorKind, Severity, ValidationError, Validator};

    use super::AllergenValidator;

    fn validate(text: &str, constraints: &[Allergen]) -> Vec<ValidationError> {
        let index = MenuIndex::build(&sample_menu()).expect("sample menu builds");
        let constraints: AllergenSet = constraints.iter().copied().collect();
        AllergenValidator::new().validate(text, &index, &constraints)
    }

    #[test]
    fn safe_recommendation_passes() {
        let errors = validate("I recommend the Fruit Salad", &[Allergen::Peanuts]);
        assert!(errors.is_empty());
    }

    #[test]
    fn unsafe_recommendation_is_critical() {
        let errors = validate("I highly recommend our Pad Thai!", &[Allergen::Peanuts]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::UnsafeRecommendation);
        assert_eq!(errors[0].severity, Severity::Critical);
        assert!(errors[0].message.contains("Pad Thai"));
        assert_eq!(errors[0].details["violating_allergens"], json!(["peanuts"]));
        assert!(errors[0].correction.is_none());
    }

    #[test]
    fn false_safety_claim_is_critical_without_constraints() {
        let errors = validate("Our Pad Thai is peanut-free and delicious!", &[]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::AllergenMisinformation);
        assert_eq!(errors[0].severity, Severity::Critical);
        assert!(errors[0].message.contains("Pad Thai"));
        assert!(errors[0].correction.is_none());
    }

    #[test]
    fn every_violating_dish_is_flagged() {
        let errors = validate(
            "Try the Margherita Pizza or the Pad Thai",
            &[Allergen::Peanuts, Allergen::Dairy],
        );

        assert_eq!(errors.len(), 2);
        let dishes: Vec<&str> =
            errors.iter().map(|error| error.details["dish"].as_str().expect("dish")).collect();
        assert!(dishes.contains(&"Margherita Pizza"));
        assert!(dishes.contains(&"Pad Thai"));
    }

    #[test]
    fn shellfish_constraint_blocks_pad_thai_mention() {
        let errors = validate("Our Pad Thai is a customer favorite", &[Allergen::Shellfish]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, Severity::Critical);
    }

    #[test]
    fn unsafe_dish_skips_the_false_claim_check() {
        // Pad Thai violates the peanut constraint and the text also makes
        // a false gluten claim about it; only the recommendation error fires.
        let errors = validate("Our Pad Thai is gluten-free!", &[Allergen::Peanuts]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::UnsafeRecommendation);
    }

    #[test]
    fn no_constraints_and_no_claims_passes() {
        let errors = validate("Try our Pad Thai or Margherita Pizza", &[]);
        assert!(errors.is_empty());
    }

    #[test]
    fn unmentioned_dishes_are_never_flagged() {
        let errors = validate("We close at ten tonight", &[Allergen::Peanuts]);
        assert!(errors.is_empty());
    }

    #[test]
    fn dairy_free_claim_about_dairy_dish_is_flagged() {
        let errors = validate("The Ice Cream is completely dairy-free!", &[]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::AllergenMisinformation);
        assert_eq!(errors[0].details["allergen_found"], json!("dairy"));
    }

    #[test]
    fn absence_phrasings_match_case_insensitively() {
        let errors = validate("Our Pad Thai is PEANUT-FREE!", &[]);
        assert_eq!(errors.len(), 1);
    }
}
