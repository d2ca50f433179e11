//! # Branch State Management
//!
//! State definitions for branch workflow units. Transitions are driven only
//! by the execution planner, never by the branch itself.

pub mod states;

pub use states::BranchState;
