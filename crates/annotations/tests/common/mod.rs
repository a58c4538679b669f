//! Test infrastructure for the annotation service.
//!
//! Provides fixtures, failure-injecting collaborator doubles, and the
//! `service_test!` macro that runs one scenario against every backend.

#![allow(dead_code)]

pub mod doubles;
pub mod fixtures;
#[macro_use]
pub mod harness;

pub use doubles::*;
pub use fixtures::*;
pub use harness::*;
