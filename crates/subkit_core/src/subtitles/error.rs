//! Subtitle error types.

/// Errors that can occur during subtitle operations.
#[derive(Debug, thiserror::Error)]
pub enum SubtitleError {
    /// Extension does not map to a supported format.
    #[error("Invalid extension '{0}'")]
    InvalidExtension(String),

    /// Writing a document without items.
    #[error("No subtitles to write")]
    NoSubtitlesToWrite,

    /// Underlying stream failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
}

/// Errors that can occur during subtitle parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Invalid or malformed time format.
    #[error("Invalid time format at line {line}: '{value}'")]
    InvalidTime { line: usize, value: String },

    /// Invalid duration literal, no line context available.
    #[error("Invalid duration '{value}': {message}")]
    InvalidDuration { value: String, message: String },

    /// Missing required section or field.
    #[error("Missing required section: {0}")]
    MissingSection(String),

    /// Data line encountered before the section's `Format:` line.
    #[error("No {0} format provided")]
    MissingFormat(String),

    /// Invalid style definition.
    #[error("Invalid style at line {line}: {message}")]
    InvalidStyle { line: usize, message: String },

    /// Invalid event/dialogue line.
    #[error("Invalid event at line {line}: {message}")]
    InvalidEvent { line: usize, message: String },

    /// Reference to a style or region that does not exist.
    #[error("{kind} '{id}' requested by {requested_by} doesn't exist")]
    UnknownReference {
        kind: &'static str,
        id: String,
        requested_by: String,
    },

    /// Invalid color format.
    #[error("Invalid color format: '{0}'")]
    InvalidColor(String),

    /// Encoding error.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// Malformed binary record.
    #[error("Invalid {block} block: {message}")]
    InvalidBlock {
        block: &'static str,
        message: String,
    },

    /// XML document could not be read.
    #[error("Invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Generic parse error.
    #[error("Parse error at line {line}: {message}")]
    Generic { line: usize, message: String },
}

/// Result type for subtitle operations.
pub type SubtitleResult<T> = Result<T, SubtitleError>;

/// Result type for parsing.
pub type ParseResult<T> = Result<T, ParseError>;

impl ParseError {
    /// Create a generic parse error.
    pub fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self::Generic {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid time error.
    pub fn invalid_time(line: usize, value: impl Into<String>) -> Self {
        Self::InvalidTime {
            line,
            value: value.into(),
        }
    }

    /// Create an invalid duration error.
    pub fn invalid_duration(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create an invalid event error.
    pub fn invalid_event(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid style error.
    pub fn invalid_style(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidStyle {
            line,
            message: message.into(),
        }
    }

    /// Create an unknown style reference error.
    pub fn unknown_style(id: impl Into<String>, requested_by: impl Into<String>) -> Self {
        Self::UnknownReference {
            kind: "Style",
            id: id.into(),
            requested_by: requested_by.into(),
        }
    }

    /// Create an unknown region reference error.
    pub fn unknown_region(id: impl Into<String>, requested_by: impl Into<String>) -> Self {
        Self::UnknownReference {
            kind: "Region",
            id: id.into(),
            requested_by: requested_by.into(),
        }
    }

    /// Create an invalid binary block error.
    pub fn invalid_block(block: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidBlock {
            block,
            message: message.into(),
        }
    }

    /// Attach a line number to errors raised without one.
    pub fn with_line(self, line: usize) -> Self {
        match self {
            Self::InvalidDuration { value, .. } => Self::InvalidTime { line, value },
            Self::InvalidColor(value) => Self::at_line(line, format!("invalid color '{}'", value)),
            other => other,
        }
    }
}
