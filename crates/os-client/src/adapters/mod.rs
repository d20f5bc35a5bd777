//! Adapters implementing the outbound ports.

mod mock;
mod navigator;
mod reqwest_transport;
mod token_storage;

pub use mock::MockTransport;
pub use navigator::RecordingNavigator;
pub use reqwest_transport::ReqwestTransport;
pub use token_storage::{FileTokenStorage, MemoryTokenStorage};
