//! Repository implementations module.
//!
//! This module contains implementations of the repository traits:
//! - `local`: In-memory implementation for unit testing, local development
//!   and embedding without an external store
pub mod local;

pub use local::LocalRepository;
