//! WebSocket support for live collection feeds.
//!
//! Each subscriber watches one collection and receives a full snapshot of it
//! on connect and after every change. Frames are the shared
//! [`tally_engine::remote::wire`] types.

mod manager;

pub use manager::FeedManager;
pub use tally_engine::remote::wire::{ClientFrame, Frame};
