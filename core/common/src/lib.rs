//! Common utilities and types shared across the JamTalk vault crates.
//!
//! This module provides the error taxonomy and the bucket namespace used by
//! every layer from the key-value store up to the storage facade.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Bucket, SensitiveBytes};
