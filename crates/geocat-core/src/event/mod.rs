//! Catalog events and the listener bus.
//!
//! Every mutation is announced twice: `before_event` for each event of the
//! batch (any listener may veto), then, once the mutation is committed,
//! `after_event` for each event in the same order.

mod listener;
mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use listener::{CatalogListener, ListenerFailure, ListenerKind, Veto};
pub use registry::{ListenerId, ListenerRegistry, RegisteredListener};

use crate::model::{CatalogInfo, Defaults, InfoRef, PropertyChange};

/// Kind of catalog event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Entity added.
    Add,
    /// Entity modified.
    Modify,
    /// Entity removed.
    Remove,
    /// Default workspace or namespace changed.
    DefaultChanged,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Add => write!(f, "add"),
            EventKind::Modify => write!(f, "modify"),
            EventKind::Remove => write!(f, "remove"),
            EventKind::DefaultChanged => write!(f, "default-changed"),
        }
    }
}

/// A change to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CatalogEvent {
    /// An entity was added.
    Add {
        /// The new entity.
        info: CatalogInfo,
    },
    /// An entity was modified.
    Modify {
        /// The entity after the change.
        info: CatalogInfo,
        /// The entity before the change.
        previous: CatalogInfo,
        /// Changed properties.
        changes: Vec<PropertyChange>,
    },
    /// An entity was removed.
    Remove {
        /// The removed entity.
        info: CatalogInfo,
    },
    /// The default workspace or namespace changed.
    DefaultChanged {
        /// Defaults before the change.
        previous: Defaults,
        /// Defaults after the change.
        current: Defaults,
    },
}

impl CatalogEvent {
    /// Kind of the event.
    pub fn kind(&self) -> EventKind {
        match self {
            CatalogEvent::Add { .. } => EventKind::Add,
            CatalogEvent::Modify { .. } => EventKind::Modify,
            CatalogEvent::Remove { .. } => EventKind::Remove,
            CatalogEvent::DefaultChanged { .. } => EventKind::DefaultChanged,
        }
    }

    /// The entity the event is about, if any.
    pub fn info(&self) -> Option<&CatalogInfo> {
        match self {
            CatalogEvent::Add { info }
            | CatalogEvent::Modify { info, .. }
            | CatalogEvent::Remove { info } => Some(info),
            CatalogEvent::DefaultChanged { .. } => None,
        }
    }

    /// Reference to the entity the event is about, if any.
    pub fn reference(&self) -> Option<InfoRef> {
        self.info().map(CatalogInfo::reference)
    }

    /// Changed properties of a modify event; empty otherwise.
    pub fn changes(&self) -> &[PropertyChange] {
        match self {
            CatalogEvent::Modify { changes, .. } => changes,
            _ => &[],
        }
    }
}

impl fmt::Display for CatalogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reference() {
            Some(target) => write!(f, "{} {}", self.kind(), target),
            None => write!(f, "{}", self.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Workspace;

    #[test]
    fn test_event_display_names_target() {
        let ws = Workspace::new("topp");
        let event = CatalogEvent::Add {
            info: ws.clone().into(),
        };
        assert_eq!(event.to_string(), format!("add {}", ws.id));
        assert_eq!(event.reference(), Some(InfoRef::Workspace(ws.id)));
        assert!(event.changes().is_empty());

        let event = CatalogEvent::DefaultChanged {
            previous: Defaults::default(),
            current: Defaults {
                workspace: Some(ws.id),
                namespace: None,
            },
        };
        assert_eq!(event.to_string(), "default-changed");
        assert_eq!(event.info(), None);
    }
}
