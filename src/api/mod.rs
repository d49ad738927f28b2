pub mod http;
pub mod passthrough;

pub use http::{create_router, ApiError, ApiServer, AppState};
pub use passthrough::{override_network_options, Passthrough, PassthroughEndpoint, MIDDLEWARE_VERSION};
