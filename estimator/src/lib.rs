mod artifact;
mod error;
mod linear;
pub mod tree;
mod writer;

use std::path::Path;

use log::debug;
use ndarray::{Array1, ArrayView1, ArrayView2};

pub use artifact::Element;
pub use error::{EstimatorErr, Result};
pub use linear::Linear;
pub use tree::{Aggregation, Node, TreeEnsemble};
pub use writer::ArtifactWriter;

use artifact::MappedArtifact;

/// A trained model that maps a feature vector to a single scalar.
///
/// Implementors are immutable after loading, so a single instance can be shared across
/// threads and queried concurrently.
pub trait Regressor: Send + Sync {
    /// Returns the width of the feature vectors this regressor accepts.
    fn n_features(&self) -> usize;

    /// Predicts the target for a single feature vector.
    ///
    /// # Arguments
    /// * `x` - A feature vector of length `n_features`.
    ///
    /// # Returns
    /// The prediction or an error if the input or the model is malformed.
    fn predict_row(&self, x: ArrayView1<f32>) -> Result<f64>;

    /// Predicts the target for every row of `x`.
    ///
    /// # Arguments
    /// * `x` - A matrix with one feature vector per row.
    ///
    /// # Returns
    /// One prediction per row.
    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f64>> {
        self.check_width(x.ncols())?;
        x.rows()
            .into_iter()
            .map(|row| self.predict_row(row))
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }

    /// Fails with `SizeMismatch` unless `got` equals `n_features`.
    fn check_width(&self, got: usize) -> Result<()> {
        let expected = self.n_features();
        if got != expected {
            return Err(EstimatorErr::SizeMismatch { got, expected });
        }

        Ok(())
    }
}

/// Every estimator kind an artifact can hold, selected by its `estimator` metadata key.
pub enum Estimator {
    TreeEnsemble(TreeEnsemble),
    Linear(Linear),
}

impl Estimator {
    /// Memory-maps and validates the estimator artifact at `path`.
    ///
    /// # Arguments
    /// * `path` - Location of a safetensors estimator artifact.
    ///
    /// # Returns
    /// The estimator or an error if the artifact can't be read or is inconsistent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let artifact = MappedArtifact::open(path)?;
        let n_features: usize = artifact.meta_required("n_features")?;
        let kind = artifact.meta("estimator").map(str::to_string);

        let estimator = match kind.as_deref() {
            Some("tree_ensemble") => {
                Self::TreeEnsemble(TreeEnsemble::from_artifact(artifact, n_features)?)
            }
            Some("linear") => Self::Linear(Linear::from_artifact(artifact, n_features)?),
            Some(other) => return Err(EstimatorErr::UnknownKind(other.to_string())),
            None => return Err(EstimatorErr::MissingMetadata { key: "estimator" }),
        };

        debug!(
            kind = estimator.kind(), n_features = n_features;
            "estimator mapped from {}", path.display()
        );

        Ok(estimator)
    }

    /// Returns the artifact kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TreeEnsemble(_) => "tree_ensemble",
            Self::Linear(_) => "linear",
        }
    }
}

impl Regressor for Estimator {
    fn n_features(&self) -> usize {
        match self {
            Self::TreeEnsemble(model) => model.n_features(),
            Self::Linear(model) => model.n_features(),
        }
    }

    fn predict_row(&self, x: ArrayView1<f32>) -> Result<f64> {
        match self {
            Self::TreeEnsemble(model) => model.predict_row(x),
            Self::Linear(model) => model.predict_row(x),
        }
    }
}
