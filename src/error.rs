use std::{error::Error, fmt, io, path::PathBuf};

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use estimator::EstimatorErr;
use serde::Serialize;

/// Failures while loading the model artifacts at startup.
#[derive(Debug)]
pub enum LoadError {
    /// The estimator artifact is missing, corrupt or inconsistent.
    Estimator(EstimatorErr),
    /// The columns artifact can't be read.
    Columns { path: PathBuf, source: io::Error },
    /// The columns artifact is not a JSON array of strings.
    ColumnsFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// A feature name appears more than once in the schema.
    DuplicateColumn(String),
    /// Estimator and schema come from different training runs.
    FeatureCountMismatch { schema: usize, estimator: usize },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Estimator(e) => write!(f, "estimator artifact: {e}"),
            Self::Columns { path, source } => {
                write!(f, "cannot read columns '{}': {source}", path.display())
            }
            Self::ColumnsFormat { path, source } => {
                write!(f, "invalid columns '{}': {source}", path.display())
            }
            Self::DuplicateColumn(name) => write!(f, "duplicate feature column '{name}'"),
            Self::FeatureCountMismatch { schema, estimator } => write!(
                f,
                "schema lists {schema} features but the estimator expects {estimator}"
            ),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Estimator(e) => Some(e),
            Self::Columns { source, .. } => Some(source),
            Self::ColumnsFormat { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<EstimatorErr> for LoadError {
    fn from(value: EstimatorErr) -> Self {
        Self::Estimator(value)
    }
}

/// Failures while serving a single prediction.
#[derive(Debug)]
pub enum PredictError {
    /// The model artifacts failed to load at startup.
    Unavailable(String),
    /// The body exceeds the accepted size.
    BodyTooLarge { limit: usize },
    /// The body could not be read off the connection.
    Payload(String),
    /// The body is not a JSON object.
    InvalidBody(serde_json::Error),
    /// A request field can't be coerced to the expected type.
    InvalidField { field: &'static str, reason: String },
    /// The schema lacks one of the fixed date columns.
    MissingColumn(&'static str),
    /// No one-hot column exists for the requested city.
    UnsupportedCity(String),
    /// The estimator failed to evaluate the feature vector.
    Estimator(EstimatorErr),
    /// The estimator returned no value or a non-finite one.
    InvalidPrediction(Option<f64>),
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "model unavailable: {msg}"),
            Self::BodyTooLarge { limit } => {
                write!(f, "request body exceeds the {limit} byte limit")
            }
            Self::Payload(msg) => write!(f, "cannot read request body: {msg}"),
            Self::InvalidBody(e) => write!(f, "invalid request body: {e}"),
            Self::InvalidField { field, reason } => write!(f, "invalid '{field}': {reason}"),
            Self::MissingColumn(name) => write!(f, "feature schema has no '{name}' column"),
            Self::UnsupportedCity(city) => write!(f, "City '{city}' not supported"),
            Self::Estimator(e) => write!(f, "prediction failed: {e}"),
            Self::InvalidPrediction(Some(value)) => {
                write!(f, "estimator produced a non-finite value: {value}")
            }
            Self::InvalidPrediction(None) => write!(f, "estimator produced no value"),
        }
    }
}

impl Error for PredictError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidBody(e) => Some(e),
            Self::Estimator(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EstimatorErr> for PredictError {
    fn from(value: EstimatorErr) -> Self {
        Self::Estimator(value)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Boundary conversion for the HTTP layer: an unsupported city is the client's fault,
/// everything else is ours.
impl ResponseError for PredictError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedCity(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

/// Malformed process configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidVar { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVar { key, value } => {
                write!(f, "invalid value '{value}' for environment variable {key}")
            }
        }
    }
}

impl Error for ConfigError {}
