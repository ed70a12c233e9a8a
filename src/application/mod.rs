// Application layer: owns the in-memory ledger and keeps storage in step with it.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
