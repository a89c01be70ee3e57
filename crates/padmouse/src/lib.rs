pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod runner;

pub use crate::error::{Error, Result};
