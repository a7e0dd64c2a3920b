//! Shared test fixtures for ScoreForge crates.
//!
//! This crate provides plain domain types and brute-force oracles for
//! testing. It does NOT depend on `scoreforge-scoring`, so the scoring
//! crate can use it as a dev-dependency without a cycle; registering the
//! types in a `DomainSchema` is left to the tests.
//!
//! - [`shift`] - Employee scheduling with an interior-mutable assignment
//! - [`entity`] - A minimal grouped entity
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! scoreforge-test = { workspace = true }
//! ```

pub mod entity;
pub mod shift;

pub use entity::GroupedEntity;
pub use shift::{Employee, Shift, ShiftSchedule};
