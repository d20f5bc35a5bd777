//! API client module for communicating with the OS backend.

mod client;
mod service;

pub use client::{ApiClient, ClientError};
pub use service::OsService;
