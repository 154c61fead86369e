use std::io;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid launch configuration: {0}")]
    InvalidConfig(String),

    #[error("debuggee is not running")]
    NotRunning,

    #[error("command `{0}` sent while another command is awaiting its response")]
    CommandInFlight(String),

    #[error("no response to command `{command}` within {timeout:?}")]
    ResponseTimeout { command: String, timeout: Duration },

    #[error("debuggee output closed while awaiting a response")]
    ChannelClosed,
}
