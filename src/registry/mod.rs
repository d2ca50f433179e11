//! # Process Key Registry
//!
//! Authoritative mapping from opaque step identifiers to process metadata.
//! The registry is the sole gate that blocks unmapped work from proceeding.

pub mod process_key_registry;

pub use process_key_registry::{ProcessKeyReference, ProcessKeyRegistry};
