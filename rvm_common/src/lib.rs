mod grams;
mod money;

pub mod op;
mod secret;

pub use grams::Grams;
pub use money::{Money, MoneyConversionError};
pub use secret::Secret;
