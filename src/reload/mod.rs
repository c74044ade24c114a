//! Live reload over WebSocket.
//!
//! ```text
//! watch worker --[ReloadMessage]--> ReloadHub --[broadcast]--> browsers
//!                                      ^
//!                    server (acceptor) +
//! ```
//!
//! - `message` - JSON protocol shared with `embed/livereload.js`
//! - `hub` - connected clients, broadcast and pending-error replay
//! - `server` - listener with port retry

mod hub;
mod message;
pub mod server;

pub use hub::ReloadHub;
pub use message::ReloadMessage;
