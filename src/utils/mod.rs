//! Shared utility functions.
//!
//! - `fsutil`: filesystem cleanup with bounded retries

mod fsutil;

pub use fsutil::{remove_dir_with_retry, remove_file_with_retry, RemoveError};
