//! Captured request-log handling for specdeck
//!
//! Client consoles (RestAssured and friends) print requests as a
//! line-oriented log. This crate parses such a log into a structured
//! [`ParsedRequest`], renders requests and responses back into the same
//! textual shape, and replays a parsed request against its origin server.

mod log;
mod render;
mod replay;

pub use log::*;
pub use render::*;
pub use replay::*;
