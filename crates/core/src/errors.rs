use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("could not parse menu definition: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("dish with empty name in category `{category}`")]
    EmptyDishName { category: String },
    #[error("negative price {price} for dish `{dish}`")]
    NegativePrice { dish: String, price: Decimal },
    #[error("duplicate dish name `{name}` after lower-casing")]
    DuplicateDish { name: String },
}
