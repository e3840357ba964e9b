use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use safetensors::{Dtype, SafeTensorError};

/// The result type used across the estimator crate.
pub type Result<T> = std::result::Result<T, EstimatorErr>;

/// Failures while loading or evaluating an estimator artifact.
#[derive(Debug)]
pub enum EstimatorErr {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Format(SafeTensorError),
    MissingMetadata {
        key: &'static str,
    },
    InvalidMetadata {
        key: &'static str,
        value: String,
    },
    UnknownKind(String),
    MissingTensor {
        name: String,
    },
    DtypeMismatch {
        name: String,
        got: Dtype,
        expected: Dtype,
    },
    ShapeMismatch {
        name: String,
        got: Vec<usize>,
        expected: usize,
    },
    InvalidTreeOffsets(String),
    MalformedTree {
        tree: usize,
        node: usize,
        reason: &'static str,
    },
    SizeMismatch {
        got: usize,
        expected: usize,
    },
}

impl Display for EstimatorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read '{}': {source}", path.display()),
            Self::Format(e) => write!(f, "invalid safetensors artifact: {e}"),
            Self::MissingMetadata { key } => write!(f, "missing metadata key '{key}'"),
            Self::InvalidMetadata { key, value } => {
                write!(f, "invalid value '{value}' for metadata key '{key}'")
            }
            Self::UnknownKind(kind) => write!(f, "unknown estimator kind '{kind}'"),
            Self::MissingTensor { name } => write!(f, "missing tensor '{name}'"),
            Self::DtypeMismatch {
                name,
                got,
                expected,
            } => write!(
                f,
                "tensor '{name}' has dtype {got:?}, expected {expected:?}"
            ),
            Self::ShapeMismatch {
                name,
                got,
                expected,
            } => write!(
                f,
                "tensor '{name}' has shape {got:?}, expected {expected} elements"
            ),
            Self::InvalidTreeOffsets(msg) => write!(f, "invalid tree offsets: {msg}"),
            Self::MalformedTree { tree, node, reason } => {
                write!(f, "malformed tree {tree} at node {node}: {reason}")
            }
            Self::SizeMismatch { got, expected } => write!(
                f,
                "feature vector has {got} entries, the estimator expects {expected}"
            ),
        }
    }
}

impl Error for EstimatorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Format(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SafeTensorError> for EstimatorErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Format(value)
    }
}
