//! Core value types for asynckit.
//!
//! This module contains:
//! - SafeResult, the error-as-value outcome, and safe_wrap
//! - named_join, a keyed wait-for-all

mod join;
mod result;

pub use join::{named_join, named_join_unwrap, NamedSettled};
pub use result::{safe_wrap, SafeResult};
