//! Request handlers for collection operations.

mod collections;
mod websocket;

pub use collections::*;
pub use websocket::*;
