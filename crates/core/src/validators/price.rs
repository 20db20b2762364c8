use std::collections::BTreeMap;

use regex::RegexBuilder;
use rust_decimal::Decimal;
use serde_json::json;

use crate::allergens::AllergenSet;
use crate::menu::MenuIndex;
use crate::validation::{Correction, ErrorKind, Severity, ValidationError, Validator};

/// Up to 50 characters of filler between the dish name and an amount,
/// then an optional `$` and a two-decimal price.
const PRICE_LOOKAHEAD: &str = r"(?:[^$0-9\n]{0,50})\$?(\d+\.\d{2})";

/// Flags stated prices that do not match the menu, with a literal
/// substitution the caller can apply. Runs regardless of session
/// constraints; price accuracy is universal.
#[derive(Clone, Debug)]
pub struct PriceValidator {
    tolerance: Decimal,
}

impl PriceValidator {
    pub fn new() -> Self {
        Self { tolerance: Decimal::new(1, 3) }
    }
}

impl Default for PriceValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for PriceValidator {
    fn validate(
        &self,
        text: &str,
        index: &MenuIndex,
        _constraints: &AllergenSet,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let text_lower = text.to_lowercase();

        for (name_lower, dish) in index.entries() {
            if !text_lower.contains(name_lower) {
                continue;
            }

            let pattern = format!("{}{}", regex::escape(name_lower), PRICE_LOOKAHEAD);
            let Ok(pattern) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
                continue;
            };

            for captures in pattern.captures_iter(text) {
                let (Some(full), Some(stated_raw)) = (captures.get(0), captures.get(1)) else {
                    continue;
                };
                let Ok(stated) = stated_raw.as_str().parse::<Decimal>() else {
                    continue;
                };
                if (stated - dish.price).abs() <= self.tolerance {
                    continue;
                }

                let actual = format!("{:.2}", dish.price);
                let corrected = full.as_str().replace(stated_raw.as_str(), &actual);
                let details = BTreeMap::from([
                    ("dish".to_string(), json!(dish.name)),
                    ("stated_price".to_string(), json!(format!("{stated:.2}"))),
                    ("actual_price".to_string(), json!(actual)),
                ]);

                errors.push(ValidationError {
                    kind: ErrorKind::IncorrectPrice,
                    severity: Severity::High,
                    message: format!(
                        "incorrect price for `{}`: stated ${stated:.2}, actual ${actual}",
                        dish.name
                    ),
                    details,
                    correction: Some(Correction {
                        original: full.as_str().to_string(),
                        corrected,
                    }),
                });
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::allergens::AllergenSet;
    use crate::fixtures::sample_menu;
    use crate::menu::MenuIndex;
    use crate::validation::{ErrorKind, Severity, Validator};

    use super::PriceValidator;

    fn validate(text: &str) -> Vec<crate::validation::ValidationError> {
        let index = MenuIndex::build(&sample_menu()).expect("sample menu builds");
        PriceValidator::new().validate(text, &index, &AllergenSet::new())
    }

    #[test]
    fn correct_price_passes() {
        assert!(validate("The Coca-Cola is $2.99").is_empty());
    }

    #[test]
    fn incorrect_price_is_flagged_with_details() {
        let errors = validate("The Coca-Cola costs $4.99");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::IncorrectPrice);
        assert_eq!(errors[0].severity, Severity::High);
        assert!(errors[0].message.contains("Coca-Cola"));
        assert_eq!(errors[0].details["stated_price"], json!("4.99"));
        assert_eq!(errors[0].details["actual_price"], json!("2.99"));
    }

    #[test]
    fn price_without_dollar_sign_is_still_checked() {
        assert!(validate("Coffee is 2.49").is_empty());
        assert_eq!(validate("Coffee is 3.49").len(), 1);
    }

    #[test]
    fn only_the_mismatched_dish_is_flagged_among_many() {
        let text = "We have several drinks: Coca-Cola for $2.99,\n\
                    Orange Juice for $4.50, and Coffee for $2.49";
        let errors = validate(text);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Orange Juice"));
    }

    #[test]
    fn dish_mentioned_without_amount_yields_nothing() {
        assert!(validate("We have Coca-Cola available today").is_empty());
        assert!(validate("").is_empty());
        assert!(validate("We have great food and excellent service!").is_empty());
    }

    #[test]
    fn correction_replaces_only_the_price_portion() {
        let errors = validate("Our refreshing Coca-Cola is just $1.99!");

        assert_eq!(errors.len(), 1);
        let correction = errors[0].correction.as_ref().expect("price errors are correctable");
        assert_eq!(correction.original, "Coca-Cola is just $1.99");
        assert_eq!(correction.corrected, "Coca-Cola is just $2.99");
        assert_eq!(errors[0].details["actual_price"], json!("2.99"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let errors = validate("COCA-COLA is $5.00");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Coca-Cola"));
    }

    #[test]
    fn each_wrong_mention_yields_an_independent_error() {
        let text = "Pad Thai is $10.50 today, but tomorrow Pad Thai will be $12.00";
        let errors = validate(text);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn tolerance_absorbs_rounding_noise_only() {
        assert!(validate("Spaghetti Carbonara at $13.49").is_empty());
        let errors = validate("Spaghetti Carbonara at $15.00");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].details["actual_price"], json!("13.49"));
    }
}
