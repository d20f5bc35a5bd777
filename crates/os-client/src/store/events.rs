//! Change notifications published by the store.

use crate::domain::EntityId;

/// What changed in the store.
///
/// Subscribers re-read whatever state they render; events carry only
/// enough to decide whether that is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The loading flag flipped.
    Loading(bool),
    /// The whole collection was replaced by a list fetch.
    OrdersReplaced { count: usize },
    /// A created order was prepended.
    OrderAdded(EntityId),
    /// A cached order was replaced by a server payload.
    OrderUpdated(EntityId),
    /// An order left the collection.
    OrderRemoved(EntityId),
    /// The current (detail) order was set, replaced or cleared.
    CurrentChanged(Option<EntityId>),
    FiltersChanged,
    /// The error field was set or cleared.
    ErrorChanged(Option<String>),
}
