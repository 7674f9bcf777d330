//! Core types and caller-input validation shared across Fiscal crates

pub mod error;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use error::*;
pub use types::*;
pub use validation::{validar_cnpj, validar_periodo};
