use std::num::TryFromIntError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// A buffer length disagrees with the size a header declares (or a fixed record size).
    SizeMismatch { expected: usize, actual: usize },
    /// A value is outside its documented range.
    OutOfRange(String),
    /// The file system table failed shape validation.
    StructuralViolation(String),
    NotFound(String),
    /// An entry with the same name but a different kind already exists.
    DuplicateConflict(String),
    DirectoryNotEmpty(String),
    InvalidFormat(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::SizeMismatch { expected, actual } => {
                write!(f, "Size mismatch: expected {expected:#x} bytes, got {actual:#x}")
            }
            Error::OutOfRange(ref msg) => write!(f, "Out of range: {msg}"),
            Error::StructuralViolation(ref msg) => write!(f, "Invalid file system table: {msg}"),
            Error::NotFound(ref msg) => write!(f, "Not found: {msg}"),
            Error::DuplicateConflict(ref msg) => write!(f, "Conflicting entry: {msg}"),
            Error::DirectoryNotEmpty(ref msg) => write!(f, "Directory not empty: {msg}"),
            Error::InvalidFormat(ref msg) => write!(f, "Invalid format: {msg}"),
            Error::IoError(ref err) => write!(f, "{err}"),
            Error::JsonError(ref err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::IoError(ref err) => Some(err),
            Error::JsonError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<TryFromIntError> for Error {
    fn from(error: TryFromIntError) -> Self {
        Error::OutOfRange(error.to_string())
    }
}

impl std::convert::From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::IoError(error)
    }
}

impl std::convert::From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::JsonError(error)
    }
}
