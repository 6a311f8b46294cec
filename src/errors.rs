use crate::response::ApiError;

/// All error types that can occur while talking to Hue bridges.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// A network socket operation failed (SSDP discovery).
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// Reading or writing the credential store failed.
    #[error("credential store {action} error: {err:?}")]
    Io { action: String, err: std::io::Error },

    /// The bridge is reachable but this application is not paired with it yet.
    #[error("bridge {address} is not registered; press the link button on the bridge")]
    RegistrationPending { address: String },

    /// A request to the bridge did not complete in time.
    #[error("request to bridge {address} timed out")]
    Timeout { address: String },

    /// The bridge could not be reached.
    #[error("cannot contact bridge {address}: {reason}")]
    Connection { address: String, reason: String },

    /// The bridge answered with something that is not a valid API response.
    #[error("bridge {address} returned a bad response: {reason}")]
    BadResponse { address: String, reason: String },

    /// The bridge answered with an API error object.
    #[error("bridge {address} error {code}: {description}")]
    Bridge {
        address: String,
        code: u32,
        description: String,
    },

    /// No bridge answered the auto-discovery search.
    #[error("no hue bridge found on the network")]
    NoBridgeFound,

    /// The bridge has no live session.
    #[error("bridge {0} is not connected")]
    NotConnected(String),

    /// No tracked node has this address.
    #[error("node {0} not found")]
    NodeNotFound(String),

    /// The node does not understand this command.
    #[error("node {address} does not support command {command}")]
    UnknownCommand { address: String, command: String },

    /// A command arrived without a value it needs.
    #[error("command {command} is missing parameter {field}")]
    MissingParameter { command: String, field: String },

    /// A command parameter could not be interpreted.
    #[error("command {command} has invalid parameter {field}: {value:?}")]
    InvalidParameter {
        command: String,
        field: String,
        value: String,
    },

    /// A host parameter could not be interpreted.
    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new credential store error
    pub fn io(action: &str, err: std::io::Error) -> Self {
        Error::Io {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new connection error
    pub fn connection(address: &str, reason: impl ToString) -> Self {
        Error::Connection {
            address: address.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new bad response error
    pub fn bad_response(address: &str, reason: impl ToString) -> Self {
        Error::BadResponse {
            address: address.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn registration_pending(address: &str) -> Self {
        Error::RegistrationPending {
            address: address.to_string(),
        }
    }

    pub fn timeout(address: &str) -> Self {
        Error::Timeout {
            address: address.to_string(),
        }
    }

    pub fn unknown_command(address: &str, command: &str) -> Self {
        Error::UnknownCommand {
            address: address.to_string(),
            command: command.to_string(),
        }
    }

    pub fn missing_parameter(command: &str, field: &str) -> Self {
        Error::MissingParameter {
            command: command.to_string(),
            field: field.to_string(),
        }
    }

    pub fn invalid_parameter(command: &str, field: &str, value: &str) -> Self {
        Error::InvalidParameter {
            command: command.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn invalid_setting(key: &str, reason: impl ToString) -> Self {
        Error::InvalidSetting {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for failures that mean the bridge itself is unavailable.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::Connection { .. } | Error::BadResponse { .. }
        )
    }

    /// True when the bridge no longer accepts the application key.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Bridge { code, .. } if *code == ApiError::UNAUTHORIZED_USER)
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
