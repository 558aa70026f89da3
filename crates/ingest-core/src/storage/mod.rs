//! The relational store plus its colocated full-text and vector indexes.

pub mod schema;
mod store;
pub mod vector;

pub use store::{NewDefinition, Store};
