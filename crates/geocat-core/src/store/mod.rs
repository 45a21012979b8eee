//! Entity storage and constraint enforcement.

mod constraint;
mod entity_store;

pub use entity_store::EntityStore;
