use std::{
    error::Error,
    fmt::{self, Display},
};
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a monoform-related operation.
pub type MonoformResult<T> = Result<T, MonoformError>;

/// An error that occurred while deriving a formation from an image.
#[derive(pretty_error_debug::Debug, Error)]
pub enum MonoformError {
    /// The procfile could not be obtained by the current strategy.
    #[error("procfile not found: {0}")]
    Procfile(#[from] ProcfileError),

    /// Every strategy in an extraction chain reported that it does not apply.
    #[error("no suitable procfile extractor found")]
    NoExtractorApplicable,

    /// A command line could not be split into arguments.
    #[error("malformed command `{command}`: {reason}")]
    MalformedCommand {
        /// The offending command line.
        command: String,

        /// Why tokenizing failed.
        reason: String,
    },

    /// A single process entry of a procfile is invalid.
    #[error("invalid process `{name}`: {source}")]
    InvalidProcess {
        /// The name of the process.
        name: String,

        /// The underlying cause.
        source: Box<MonoformError>,
    },

    /// A procfile document violates the schema of its surface format.
    #[error("malformed procfile: {0}")]
    MalformedProcfile(String),

    /// An image reference could not be parsed.
    #[error("invalid image reference: {0}")]
    ImageReference(String),

    /// The extractor configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An extraction chain was built without any strategies.
    #[error("extractor chain is empty")]
    EmptyExtractorChain,

    /// A yaml (de)serialization error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The container runtime failed.
    #[error("container runtime error: {0}")]
    Runtime(AnyError),

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The reasons a procfile extraction strategy does not apply to an image.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProcfileError {
    /// The requested path does not exist in the container.
    #[error("path `{0}` does not exist in the container")]
    NotFound(String),

    /// The archive copied out of the container has no entries.
    #[error("archive is empty")]
    EmptyArchive,

    /// The archive copied out of the container could not be decoded.
    #[error("archive could not be read: {0}")]
    InvalidArchive(String),

    /// The image does not declare a default command.
    #[error("image has no default command")]
    NoDefaultCommand,

    /// The document matches neither the standard nor the extended format.
    #[error("unknown Procfile format")]
    UnknownFormat,
}

/// Classifies an error for the purposes of strategy fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The strategy found no relevant artifact. The next strategy may be tried.
    NotApplicable,

    /// The input was recognized but violates its schema.
    Malformed,

    /// The container runtime or the environment failed.
    Infrastructure,
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MonoformError {
    /// Creates a container runtime error from any error.
    pub fn runtime(error: impl Into<anyhow::Error>) -> MonoformError {
        MonoformError::Runtime(AnyError {
            error: error.into(),
        })
    }

    /// Wraps an error with the name of the process it belongs to.
    pub fn invalid_process(name: impl Into<String>, source: MonoformError) -> MonoformError {
        MonoformError::InvalidProcess {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Returns the fallback classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Procfile(_) | Self::NoExtractorApplicable => ErrorKind::NotApplicable,
            Self::MalformedCommand { .. }
            | Self::InvalidProcess { .. }
            | Self::MalformedProcfile(_)
            | Self::ImageReference(_)
            | Self::Config(_)
            | Self::EmptyExtractorChain
            | Self::Yaml(_) => ErrorKind::Malformed,
            Self::Runtime(_) | Self::Cancelled | Self::Io(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns `true` if the error means "this strategy does not apply".
    pub fn is_not_applicable(&self) -> bool {
        self.kind() == ErrorKind::NotApplicable
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `MonoformResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> MonoformResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
