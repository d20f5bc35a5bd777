//! # OS Client
//!
//! Client library for the municipal service-order ("Ordem de Serviço")
//! backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   OsStore    │──▶│  OsService   │──▶│  ApiClient   │
//! │ (cache, UI   │   │ (1 fn per    │   │ (bearer in,  │
//! │  state)      │   │  endpoint)   │   │  401 out)    │
//! └──────┬───────┘   └──────────────┘   └──────┬───────┘
//!        │ StoreEvent                          │ ports
//!        ▼                                     ▼
//!   subscribers            HttpTransport · TokenStorage · Navigator
//! ```
//!
//! Dependencies are wired explicitly: build an [`AppConfig`], pick the
//! adapters, then hand them to [`ApiClient::new`].
//!
//! ```rust,ignore
//! let config = AppConfig::from_env();
//! let transport = Arc::new(ReqwestTransport::new(config.api.timeout())?);
//! let tokens = Arc::new(FileTokenStorage::open(&config.storage.path)?);
//! let client = ApiClient::new(&config, transport, tokens, Arc::new(RecordingNavigator::new()))?;
//! let mut store = OsStore::new(OsService::new(Arc::new(client)));
//! store.fetch_orders(&EntityId::from("1"), &ListParams::new()).await;
//! ```

pub mod adapters;
pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod ports;
pub mod store;
pub mod telemetry;

pub use api::{ApiClient, ClientError, OsService};
pub use auth::AuthSession;
pub use config::{AppConfig, ConfigError};
pub use domain::*;
pub use store::{OsStore, StoreEvent};
