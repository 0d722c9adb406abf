//! crates/finance_core/src/lib.rs
//!
//! The core of the finance tracker: domain types, validation, the financial
//! summary, advice prompts and the ports the outer layers implement.

pub mod advice;
pub mod domain;
pub mod ports;
pub mod summary;
pub mod validation;
