pub mod allergen;
pub mod price;

pub use allergen::AllergenValidator;
pub use price::PriceValidator;
