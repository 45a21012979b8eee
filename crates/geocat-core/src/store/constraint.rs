//! Constraint checks shared by the entity store.

use std::fmt;

use im::OrdMap;

use crate::error::Error;
use crate::model::EntityKind;

/// Reject empty or whitespace-only text attributes.
pub(crate) fn require_text(what: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::InvalidData(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Check that `key` is free in `index`, or already owned by `id` (update case).
pub(crate) fn ensure_unique<K, I>(
    index: &OrdMap<K, I>,
    key: &K,
    id: I,
    kind: EntityKind,
    describe: impl FnOnce() -> String,
) -> Result<(), Error>
where
    K: Ord + Clone,
    I: Copy + PartialEq + fmt::Display,
{
    match index.get(key) {
        Some(existing) if *existing != id => Err(Error::DuplicateKey {
            kind,
            key: describe(),
            existing: existing.to_string(),
        }),
        _ => Ok(()),
    }
}
