pub mod comparison;
pub mod deal;
pub mod error;
pub mod leverage;
pub mod proforma;
pub mod returns;
pub mod sensitivity;
pub mod snapshot;
pub mod time_value;
pub mod types;

pub use error::CreError;
pub use types::*;

/// Standard result type for all analyzer operations
pub type CreResult<T> = Result<T, CreError>;
