mod api_client;
pub mod refresh;
mod session;
pub mod transport;

// Re-export so callers can "use crate::client::ApiClient;"
pub use api_client::ApiClient;
pub use refresh::{RefreshCoordinator, RefreshStatus};
pub use transport::{OutgoingRequest, ReqwestTransport, Transport};
