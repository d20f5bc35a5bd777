//! Ports (hexagonal boundaries) of the client.

pub mod outbound;

pub use outbound::{
    HttpRequest, HttpResponse, HttpTransport, Navigator, StorageError, TokenStorage,
    TransportError,
};
