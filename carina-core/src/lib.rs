//! Carina Core
//!
//! Core library for an infrastructure management tool that treats side effects as values.
//! Providers plug into it through the `Provider` trait; the core owns schemas,
//! planning, diffing and the execution of plans.

pub mod config;
pub mod differ;
pub mod effect;
pub mod interpreter;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
