/// Result type alias for the rule generator
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the rule generator
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ConfigError(String),
    FetchError { location: String, message: String },
    ParseError { location: String, message: String },
    /// A `{name}` placeholder in a path template has no declared parameter
    UnresolvablePathParameter { path: String, placeholder: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ConfigError(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::FetchError { location, message } => {
                write!(f, "Unable to fetch {}: {}", location, message)
            }
            Error::ParseError { location, message } => {
                write!(f, "Unable to parse {}: {}", location, message)
            }
            Error::UnresolvablePathParameter { path, placeholder } => write!(
                f,
                "Unresolvable path parameter '{{{}}}' in {}: no parameter with that name is declared",
                placeholder, path
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}
