use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("controller backend: {0}")]
    Gamepad(#[from] padmouse_gamepad::Error),
    #[error("input simulation unavailable: {0}")]
    Performer(#[from] enigo::NewConError),
    #[error("update loop: {0}")]
    Loop(#[from] padmouse_loop::Error),
    #[error("failed to set Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("failed to set up logger: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
