pub mod order_flow_api;
pub mod order_objects;
pub mod validation;

use thiserror::Error;

use crate::{api::validation::OrderValidationError, traits::StorefrontError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("{0}")]
    Validation(#[from] OrderValidationError),
    #[error("{0}")]
    Database(#[from] StorefrontError),
}
