//! Delete-action handler bookkeeping for rendered gallery rows.

use std::collections::HashMap;
use std::fmt;

use crate::models::ItemId;

/// Handle for one bound delete action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// What a reconcile pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingChanges {
    pub bound: Vec<(ItemId, HandlerId)>,
    pub detached: Vec<(ItemId, HandlerId)>,
}

impl BindingChanges {
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty() && self.detached.is_empty()
    }
}

/// Exactly one delete handler per rendered row.
///
/// Rows that survive a re-render keep their handler; rows that disappear
/// have theirs detached.
#[derive(Debug, Default)]
pub struct DeleteBindings {
    by_item: HashMap<ItemId, HandlerId>,
    by_handler: HashMap<HandlerId, ItemId>,
    next_handler: u64,
}

impl DeleteBindings {
    /// Bring the bindings in line with `rows`.
    pub fn reconcile<'a>(&mut self, rows: impl IntoIterator<Item = &'a ItemId>) -> BindingChanges {
        let wanted: Vec<&ItemId> = rows.into_iter().collect();
        let mut changes = BindingChanges::default();

        let stale: Vec<ItemId> = self
            .by_item
            .keys()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(handler) = self.by_item.remove(&id) {
                self.by_handler.remove(&handler);
                changes.detached.push((id, handler));
            }
        }

        for id in wanted {
            if self.by_item.contains_key(id) {
                continue;
            }
            let handler = HandlerId(self.next_handler);
            self.next_handler += 1;
            self.by_item.insert(id.clone(), handler);
            self.by_handler.insert(handler, id.clone());
            changes.bound.push((id.clone(), handler));
        }

        changes.detached.sort_by_key(|(_, handler)| *handler);
        changes
    }

    /// Item targeted by a delete handler, if it is still bound.
    pub fn resolve(&self, handler: HandlerId) -> Option<&ItemId> {
        self.by_handler.get(&handler)
    }

    pub fn handler_for(&self, id: &ItemId) -> Option<HandlerId> {
        self.by_item.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }

    /// Detach everything.
    pub fn clear(&mut self) -> Vec<HandlerId> {
        self.by_handler.clear();
        let mut detached: Vec<HandlerId> = self.by_item.drain().map(|(_, handler)| handler).collect();
        detached.sort();
        detached
    }
}
