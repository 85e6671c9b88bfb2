#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod relay;
pub mod telegram;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
