//! Static (no-browser) acquisition path.

pub mod http_client;
pub mod static_fetch;
