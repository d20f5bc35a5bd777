//! Reactive store over the service-order endpoints.

mod events;
mod os_store;

pub use events::StoreEvent;
pub use os_store::{OsStore, EVENT_CHANNEL_CAPACITY};
