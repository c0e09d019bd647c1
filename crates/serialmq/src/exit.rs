use std::fmt;
use std::io;

use serialmq_bridge::{BridgeError, ConfigError};
use serialmq_frame::FrameError;
use serialmq_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const CONFIG_INVALID: i32 = 2;
pub const TRANSPORT_ERROR: i32 = 3;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn config_error(context: &str, err: ConfigError) -> CliError {
    match err {
        ConfigError::Read { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(CONFIG_INVALID, format!("{context}: {other}")),
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::InvalidDelimiters(_) => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::Io(_) | FrameError::ConnectionClosed => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn bridge_error(context: &str, err: BridgeError) -> CliError {
    match err {
        BridgeError::Transport(err) => transport_error(context, err),
        BridgeError::Frame(err) => frame_error(context, err),
        BridgeError::Config(err) => config_error(context, err),
        BridgeError::Disconnected => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        BridgeError::DelimiterInPayload(_) | BridgeError::InvalidPayload => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation_maps_to_config_invalid() {
        let err = ConfigError::Invalid {
            field: "serial_baud",
            reason: "must be greater than zero".to_string(),
        };
        assert_eq!(config_error("load", err).code, CONFIG_INVALID);
    }

    #[test]
    fn lost_link_maps_to_transport_error() {
        let err = BridgeError::Frame(FrameError::ConnectionClosed);
        assert_eq!(bridge_error("bridge", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn delimiter_in_message_is_usage() {
        let err = bridge_error("encode", BridgeError::DelimiterInPayload(0x03));
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("encode: "));
    }
}
