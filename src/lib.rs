pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod output;
pub mod watcher;

pub use crate::core::*;
pub use error::{Result, WatchError};
pub use watcher::{WatchOptions, WatchSession};
