//! Application catalog domain models and repository contract.

mod model;
mod repository;

pub use model::*;
pub use repository::*;
