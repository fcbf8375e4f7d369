//! Remote backend gateway for the rollcall data layer.
//!
//! - **[`RemoteGateway`]**: the four-call contract (`get_items`, `save_data`,
//!   `update_data`, `delete_data`) the offline-first core consumes. The core
//!   only distinguishes "call succeeded" from "call failed".
//! - **[`HttpGateway`]**: a `reqwest` binding of that contract against a
//!   JSON REST backend.
//! - **[`OfflineGateway`]**: refuses every call; used by profiles with no
//!   backend URL.
//! - **[`TransportConfig`]**: shared timeout / TLS / auth settings used to
//!   build the HTTP client.

pub mod error;
pub mod gateway;
pub mod http;
pub mod transport;

pub use error::Error;
pub use gateway::{DeleteAck, OfflineGateway, RemoteGateway, RemoteRecord};
pub use http::HttpGateway;
pub use transport::{GatewayConfig, TlsMode, TransportConfig};
