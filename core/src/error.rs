//! Error types
//!
//! None of these terminate the control loop. They are returned to the loop,
//! logged, and the next attempt is paced by the relevant timer.

/// Link-layer join failed for good
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The retry policy's attempt cap was reached
    AttemptsExhausted { attempts: u32 },
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AttemptsExhausted { attempts } => {
                write!(f, "Link join gave up after {} attempts", attempts)
            }
        }
    }
}

impl core::error::Error for LinkError {}

/// Topic string could not be built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TopicError {
    /// Segment contains a wildcard (`+`, `#`) or NUL
    InvalidCharacter,
    /// Result does not fit the topic buffer
    TooLong,
}

impl core::fmt::Display for TopicError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidCharacter => write!(f, "Invalid character in topic"),
            Self::TooLong => write!(f, "Topic too long"),
        }
    }
}

impl core::error::Error for TopicError {}

/// Broker session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    /// Connect attempt rejected or timed out; carries the client status code
    ConnectFailed { status: i32 },
    /// Discovery topic or client identifier could not be built
    Topic(TopicError),
    /// Discovery record did not fit its buffer
    Encode,
    /// Discovery publish was not accepted by the client
    PublishFailed,
}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ConnectFailed { status } => write!(f, "MQTT connect failed (rc={})", status),
            Self::Topic(e) => write!(f, "MQTT topic error: {}", e),
            Self::Encode => write!(f, "Discovery record encoding failed"),
            Self::PublishFailed => write!(f, "MQTT publish failed"),
        }
    }
}

impl core::error::Error for SessionError {}

impl From<TopicError> for SessionError {
    fn from(e: TopicError) -> Self {
        Self::Topic(e)
    }
}

/// Time service errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeSyncError {
    /// Request never produced an HTTP response
    Transport,
    /// Response body is not the expected JSON document
    Parse,
}

impl core::fmt::Display for TimeSyncError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport => write!(f, "Time request failed"),
            Self::Parse => write!(f, "Time response could not be parsed"),
        }
    }
}

impl core::error::Error for TimeSyncError {}

/// Formatted time string was not `HH:MM:SS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayFormError {
    /// Input is not exactly eight bytes
    WrongLength { len: usize },
    /// Byte at `index` should have been `:`
    MissingSeparator { index: usize },
    /// Byte at `index` should have been an ASCII digit
    NotADigit { index: usize },
}

impl core::fmt::Display for DisplayFormError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WrongLength { len } => write!(f, "Expected 8 characters, got {}", len),
            Self::MissingSeparator { index } => write!(f, "Expected ':' at index {}", index),
            Self::NotADigit { index } => write!(f, "Expected digit at index {}", index),
        }
    }
}

impl core::error::Error for DisplayFormError {}

/// HTTP/1.0 framing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// URL is not `http://host[:port][/path]`
    InvalidUrl,
    /// Request does not fit the request buffer
    RequestTooLong,
    /// Response ended before the blank line closing the headers
    IncompleteHead,
    /// Status line is not `HTTP/1.x NNN ...`
    MalformedStatusLine,
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidUrl => write!(f, "Unsupported URL"),
            Self::RequestTooLong => write!(f, "HTTP request too long"),
            Self::IncompleteHead => write!(f, "HTTP response headers incomplete"),
            Self::MalformedStatusLine => write!(f, "Malformed HTTP status line"),
        }
    }
}

impl core::error::Error for HttpError {}
