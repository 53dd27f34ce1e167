pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod model;

pub use error::{HiveError, Result};
