use crate::graph::NodeId;

/// A parameter value rejected at the setter boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NonPositiveWpm(f64),
    JitterOutOfRange(f64),
    VolumeOutOfRange { param: &'static str, value: f32 },
    FrequencyOutOfRange { param: &'static str, value: f32 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NonPositiveWpm(wpm) => {
                write!(f, "wpm must be a positive number, got {}", wpm)
            }
            ConfigError::JitterOutOfRange(jitter) => {
                write!(f, "jitter factor {} is out of range", jitter)
            }
            ConfigError::VolumeOutOfRange { param, value } => {
                write!(f, "{} must be within [0, 1], got {}", param, value)
            }
            ConfigError::FrequencyOutOfRange { param, value } => {
                write!(f, "{} must be a positive frequency, got {} Hz", param, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure reported by the audio collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    Device(String),
    Stream(String),
    QueueFull,
    UnknownNode(NodeId),
    InvalidConnection { from: NodeId, to: NodeId },
    NoParameter(NodeId),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::Device(msg) => write!(f, "audio device error: {}", msg),
            AudioError::Stream(msg) => write!(f, "audio stream error: {}", msg),
            AudioError::QueueFull => write!(f, "audio command queue is full"),
            AudioError::UnknownNode(node) => write!(f, "unknown audio node {}", node.0),
            AudioError::InvalidConnection { from, to } => {
                write!(f, "cannot connect node {} to node {}", from.0, to.0)
            }
            AudioError::NoParameter(node) => {
                write!(f, "audio node {} has no settable parameter", node.0)
            }
        }
    }
}

impl std::error::Error for AudioError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    InvalidConfiguration(ConfigError),
    Audio(AudioError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidConfiguration(e) => write!(f, "invalid configuration: {}", e),
            Error::Audio(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidConfiguration(e) => Some(e),
            Error::Audio(e) => Some(e),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::InvalidConfiguration(e)
    }
}

impl From<AudioError> for Error {
    fn from(e: AudioError) -> Self {
        Error::Audio(e)
    }
}
