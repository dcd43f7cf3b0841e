//! # MStress Common Library
//!
//! Shared code for the MStress assessment services including:
//! - Error taxonomy
//! - Configuration loading and data folder resolution
//! - Actor capability model (owner / reviewer / admin)

pub mod capability;
pub mod config;
pub mod error;

pub use capability::{Actor, Role};
pub use error::{Error, Result};
