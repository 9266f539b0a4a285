//! The verification decision.
//!
//! A message is verified when it reached a genuine alias over a fully
//! authenticated, encrypted path, or when its sender's domain is on the
//! alias' allow-list. Everything else is filed as failed validation.

mod engine;
mod model;

pub use engine::{DecisionEngine, domain_allowed};
pub use model::{Checks, Classification};
