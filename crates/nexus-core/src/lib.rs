pub mod collect;
pub mod config;
pub mod error;
pub mod export;
pub mod git;
pub mod io;
pub mod item;
pub mod meta;
pub mod paths;
pub mod sync;
pub mod types;

pub use error::{Result, SyncError};
