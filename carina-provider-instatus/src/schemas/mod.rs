//! Instatus resource schema definitions

pub mod component;
