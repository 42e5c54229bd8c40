//! HTTP API module.
//!
//! The export server, its JSON types and the broadcast log stream.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState};
pub use types::*;
