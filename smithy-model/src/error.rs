use crate::SourceLocation;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid shape id: {0}")]
    InvalidShapeId(String),

    #[error("Parse error at {location}: {message}")]
    Parse {
        message: String,
        location: SourceLocation,
    },

    #[error("Invalid JSON model file {0}: {1}")]
    JsonModel(String, String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The source location of this error, when it has one.
    #[must_use]
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Parse { location, .. } => Some(location),
            _ => None,
        }
    }
}
