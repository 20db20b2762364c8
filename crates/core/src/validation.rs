use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::allergens::AllergenSet;
use crate::menu::MenuIndex;

/// Ordered so that `Medium < High < Critical`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    IncorrectPrice,
    UnsafeRecommendation,
    AllergenMisinformation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncorrectPrice => "incorrect_price",
            Self::UnsafeRecommendation => "unsafe_recommendation",
            Self::AllergenMisinformation => "allergen_misinformation",
        }
    }
}

/// A literal text substitution supplied by a validator. Both spans are
/// always present together; safety-critical findings never carry one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub original: String,
    pub corrected: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub details: BTreeMap<String, Value>,
    pub correction: Option<Correction>,
}

/// Aggregate outcome of one output-check pass. A fresh value per call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn critical_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|error| error.severity == Severity::Critical)
    }

    pub fn has_critical(&self) -> bool {
        self.critical_errors().next().is_some()
    }
}

/// One output check. Implementations must not fail on arbitrary text;
/// absence of a match is simply absence of an error.
pub trait Validator: Send + Sync {
    fn validate(
        &self,
        text: &str,
        index: &MenuIndex,
        constraints: &AllergenSet,
    ) -> Vec<ValidationError>;
}

#[cfg(test)]
mod tests {
    use super::{Correction, ErrorKind, Severity, ValidationError, ValidationResult};

    fn error(severity: Severity) -> ValidationError {
        ValidationError {
            kind: ErrorKind::IncorrectPrice,
            severity,
            message: "stub".to_string(),
            details: Default::default(),
            correction: None,
        }
    }

    #[test]
    fn severity_orders_critical_highest() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
    }

    #[test]
    fn result_is_valid_only_without_errors() {
        assert!(ValidationResult::default().is_valid());

        let result = ValidationResult { errors: vec![error(Severity::High)] };
        assert!(!result.is_valid());
        assert!(!result.has_critical());

        let result = ValidationResult { errors: vec![error(Severity::High), error(Severity::Critical)] };
        assert!(result.has_critical());
        assert_eq!(result.critical_errors().count(), 1);
    }

    #[test]
    fn error_kinds_have_stable_tags() {
        assert_eq!(ErrorKind::IncorrectPrice.as_str(), "incorrect_price");
        assert_eq!(ErrorKind::UnsafeRecommendation.as_str(), "unsafe_recommendation");
        assert_eq!(ErrorKind::AllergenMisinformation.as_str(), "allergen_misinformation");
    }

    #[test]
    fn correction_serializes_both_spans() {
        let correction = Correction {
            original: "Coca-Cola is $1.99".to_string(),
            corrected: "Coca-Cola is $2.99".to_string(),
        };
        let json = serde_json::to_value(&correction).expect("serialize");
        assert_eq!(json["original"], "Coca-Cola is $1.99");
        assert_eq!(json["corrected"], "Coca-Cola is $2.99");
    }
}
