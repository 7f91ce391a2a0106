//! HTTP surface: router, handlers, and the server runtime.

pub mod router;
pub mod server;

pub use router::{AGGREGATION_SCOPES, AppState, create_router};
pub use server::Gateway;
