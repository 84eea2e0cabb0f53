//! Scan errors
//!
//! Uses thiserror for type-safe error matching rather than opaque anyhow errors.
//! Every failed attempt reports exactly one of these causes; the message is what
//! the device or matcher said, the variant is what the flow acts on.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Network unavailable: {0}")]
    Network(String),

    #[error("Device not activated: {0}")]
    DeviceNotActivated(String),

    #[error("Device not initialized: {0}")]
    DeviceNotInitialized(String),

    #[error("Palm not registered: {0}")]
    NotEnrolled(String),

    #[error("Unknown scanner error: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanErrorKind {
    Network,
    DeviceNotActivated,
    DeviceNotInitialized,
    NotEnrolled,
    Unknown,
}

impl ScanError {
    pub fn network() -> Self {
        ScanError::Network("Please check the network".to_string())
    }

    pub fn device_not_activated() -> Self {
        ScanError::DeviceNotActivated("Please activate before use".to_string())
    }

    pub fn device_not_initialized() -> Self {
        ScanError::DeviceNotInitialized("Please contact the administrator".to_string())
    }

    pub fn not_enrolled() -> Self {
        ScanError::NotEnrolled("No palm enrollment found for this subject".to_string())
    }

    pub fn unknown() -> Self {
        ScanError::Unknown("Unknown error".to_string())
    }

    pub fn kind(&self) -> ScanErrorKind {
        match self {
            ScanError::Network(_) => ScanErrorKind::Network,
            ScanError::DeviceNotActivated(_) => ScanErrorKind::DeviceNotActivated,
            ScanError::DeviceNotInitialized(_) => ScanErrorKind::DeviceNotInitialized,
            ScanError::NotEnrolled(_) => ScanErrorKind::NotEnrolled,
            ScanError::Unknown(_) => ScanErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ScanError::Network(message)
            | ScanError::DeviceNotActivated(message)
            | ScanError::DeviceNotInitialized(message)
            | ScanError::NotEnrolled(message)
            | ScanError::Unknown(message) => message,
        }
    }

    /// Device error code as reported by the palm service.
    pub fn code(&self) -> i32 {
        match self.kind() {
            ScanErrorKind::Network => -1009,
            ScanErrorKind::Unknown => 1000,
            ScanErrorKind::DeviceNotActivated => 1001,
            ScanErrorKind::DeviceNotInitialized => 1002,
            ScanErrorKind::NotEnrolled => 1003,
        }
    }

    pub fn from_code(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            -1009 => ScanError::Network(message),
            1001 => ScanError::DeviceNotActivated(message),
            1002 => ScanError::DeviceNotInitialized(message),
            1003 => ScanError::NotEnrolled(message),
            _ => ScanError::Unknown(message),
        }
    }
}

pub type ScanResult<T> = std::result::Result<T, ScanError>;
