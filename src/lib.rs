//! msgreader - speak incoming text messages aloud
//!
//! Takes batches of message fragments, merges them per sender and reads them
//! out through the system speech engine, unless policy says to stay quiet.
//! Unrecoverable failures become alerts for the user.

pub mod alert;
pub mod catalogue;
pub mod config;
pub mod contacts;
pub mod error;
pub mod keepalive;
pub mod logging;
pub mod message;
pub mod pipeline;
pub mod platform;
pub mod policy;
pub mod speech;

pub use error::{MsgReaderError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "msgreader";
