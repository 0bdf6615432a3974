//! Dialogic end-to-end test support
//!
//! - `harness`: isolated artifact directories and classifier setup
//! - `mocks`: deterministic embedders, generators and labeled datasets

pub mod harness;
pub mod mocks;
