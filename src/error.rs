use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum CardMergeError {
    UnresolvedNames(Vec<String>),
    InvalidLayout(String),
    EmptyInput,
    InvalidCardList(String),
    InvalidCard { path: PathBuf, reason: String },
    Pdf(String),
    Io(std::io::Error),
}

impl fmt::Display for CardMergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardMergeError::UnresolvedNames(names) => {
                write!(f, "could not find {} card(s): {}", names.len(), names.join(", "))
            }
            CardMergeError::InvalidLayout(message) => write!(f, "invalid layout: {}", message),
            CardMergeError::EmptyInput => write!(f, "no cards to merge"),
            CardMergeError::InvalidCardList(message) => {
                write!(f, "invalid card list: {}", message)
            }
            CardMergeError::InvalidCard { path, reason } => {
                write!(f, "invalid card {}: {}", path.display(), reason)
            }
            CardMergeError::Pdf(message) => write!(f, "pdf error: {}", message),
            CardMergeError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for CardMergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CardMergeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CardMergeError {
    fn from(value: std::io::Error) -> Self {
        CardMergeError::Io(value)
    }
}

pub(crate) fn lopdf_err(err: lopdf::Error) -> CardMergeError {
    CardMergeError::Pdf(err.to_string())
}

impl From<lopdf::Error> for CardMergeError {
    fn from(value: lopdf::Error) -> Self {
        lopdf_err(value)
    }
}
