mod cents;
mod secret;

pub use cents::{Cents, CentsConversionError, EUR_CURRENCY_CODE};
pub use secret::Secret;
