use crate::allergens::{Allergen, AllergenSet};

/// Keyword-based extraction of allergen constraints from user text.
///
/// Constraints only accumulate: there is no negation handling, so
/// "no peanuts anymore" still adds `peanuts`. Shedding a constraint
/// requires a session reset. Cumulative-only is a known limitation of
/// the extraction rules, not of the session model.
#[derive(Clone, Debug, Default)]
pub struct ConstraintExtractor;

impl ConstraintExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Returns the union of `current` and every allergen mentioned in
    /// `text`. Pure: the input set is never mutated.
    pub fn extract(&self, text: &str, current: &AllergenSet) -> AllergenSet {
        let mut updated = current.clone();
        let lowered = text.to_lowercase();
        for token in lowered.replace(['.', ','], " ").split_whitespace() {
            let tag = Allergen::from_canonical(token).or_else(|| Allergen::from_synonym(token));
            if let Some(tag) = tag {
                updated.insert(tag);
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use crate::allergens::{Allergen, AllergenSet};

    use super::ConstraintExtractor;

    fn extract(text: &str, current: &AllergenSet) -> AllergenSet {
        ConstraintExtractor::new().extract(text, current)
    }

    #[test]
    fn extracts_canonical_allergens() {
        let constraints = extract("I'm allergic to peanuts and shellfish", &AllergenSet::new());
        assert!(constraints.contains(&Allergen::Peanuts));
        assert!(constraints.contains(&Allergen::Shellfish));
        assert_eq!(constraints.len(), 2);
    }

    #[test]
    fn synonyms_map_to_canonical_tags() {
        let constraints = extract("I can't have milk", &AllergenSet::new());
        assert!(constraints.contains(&Allergen::Dairy));

        let constraints = extract("no cheese please", &AllergenSet::new());
        assert!(constraints.contains(&Allergen::Dairy));
    }

    #[test]
    fn extraction_is_case_insensitive_and_punctuation_tolerant() {
        let constraints = extract("I'm allergic to GLUTEN.", &AllergenSet::new());
        assert!(constraints.contains(&Allergen::Gluten));

        let constraints = extract("peanuts, eggs, and dairy.", &AllergenSet::new());
        assert!(constraints.contains(&Allergen::Peanuts));
        assert!(constraints.contains(&Allergen::Eggs));
        assert!(constraints.contains(&Allergen::Dairy));
    }

    #[test]
    fn text_without_allergens_returns_input_unchanged() {
        let existing: AllergenSet = [Allergen::Gluten, Allergen::Soy].into_iter().collect();
        let constraints = extract("I'd like to see the menu please", &existing);
        assert_eq!(constraints, existing);

        assert!(extract("", &AllergenSet::new()).is_empty());
    }

    #[test]
    fn extraction_is_monotonic_over_existing_constraints() {
        let existing: AllergenSet = [Allergen::Gluten, Allergen::Soy].into_iter().collect();
        let constraints = extract("I'm also allergic to peanuts", &existing);

        assert!(constraints.is_superset(&existing));
        assert!(constraints.contains(&Allergen::Peanuts));
        assert_eq!(existing.len(), 2, "input set must not be mutated");
    }

    #[test]
    fn constraints_accumulate_across_calls() {
        let extractor = ConstraintExtractor::new();
        let first = extractor.extract("allergic to peanuts", &AllergenSet::new());
        let second = extractor.extract("also no dairy", &first);

        assert!(second.contains(&Allergen::Peanuts));
        assert!(second.contains(&Allergen::Dairy));
    }
}
