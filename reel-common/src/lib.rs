//! # Reel Common Library
//!
//! Shared code for the reel generation services including:
//! - Error type shared across crates
//! - Configuration loading and root folder resolution
//! - Job event types and the broadcast event bus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
