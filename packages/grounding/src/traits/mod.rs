//! Core trait abstractions for the grounding library.
//!
//! These traits define the interfaces that applications implement
//! to provide storage, AI, and audit capabilities.

pub mod ai;
pub mod audit;
pub mod store;
