//! Shared test utilities for lpr-monitor integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. The fake servers bind 127.0.0.1 on a random port.

pub mod assertions;
pub mod fake_camera;
pub mod fake_services;
pub mod fixtures;

pub use builders::*;
pub use fixtures::*;
