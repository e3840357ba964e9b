use std::path::Path;

use estimator::{Estimator, Regressor};
use log::info;

use crate::{
    error::{LoadError, PredictError},
    schema::{ColumnIndex, FeatureSchema},
};

/// The trained estimator together with the feature layout it expects.
///
/// Built once before the server starts and only read afterwards, so it is shared across
/// workers without locking.
pub struct ModelStore {
    estimator: Box<dyn Regressor>,
    schema: FeatureSchema,
    index: ColumnIndex,
}

impl ModelStore {
    /// Pairs an estimator with its schema.
    ///
    /// # Args
    /// * `estimator` - The trained regressor.
    /// * `schema` - The ordered feature names the regressor was trained on.
    ///
    /// # Returns
    /// The store, or `FeatureCountMismatch` if both disagree on the feature count.
    pub fn new(estimator: Box<dyn Regressor>, schema: FeatureSchema) -> Result<Self, LoadError> {
        if estimator.n_features() != schema.len() {
            return Err(LoadError::FeatureCountMismatch {
                schema: schema.len(),
                estimator: estimator.n_features(),
            });
        }

        let index = schema.index();
        Ok(Self {
            estimator,
            schema,
            index,
        })
    }

    /// Loads both artifacts from disk. The estimator is memory-mapped.
    ///
    /// # Args
    /// * `model_path` - The safetensors estimator artifact.
    /// * `columns_path` - The JSON feature-name list.
    ///
    /// # Returns
    /// The store or the first load error encountered.
    pub fn load<P, Q>(model_path: P, columns_path: Q) -> Result<Self, LoadError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let estimator = Estimator::load(model_path.as_ref())?;
        let kind = estimator.kind();
        let schema = FeatureSchema::from_json_file(columns_path.as_ref())?;
        let store = Self::new(Box::new(estimator), schema)?;

        info!(
            "loaded {kind} estimator with {} features from {}",
            store.schema.len(),
            model_path.as_ref().display()
        );
        Ok(store)
    }

    pub fn estimator(&self) -> &dyn Regressor {
        self.estimator.as_ref()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn index(&self) -> &ColumnIndex {
        &self.index
    }
}

/// What the server holds after startup: either a usable store or the reason there is none.
pub enum ModelState {
    Ready(ModelStore),
    Unavailable(LoadError),
}

impl ModelState {
    /// Returns the store, or `Unavailable` carrying the startup failure.
    pub fn store(&self) -> Result<&ModelStore, PredictError> {
        match self {
            ModelState::Ready(store) => Ok(store),
            ModelState::Unavailable(e) => Err(PredictError::Unavailable(e.to_string())),
        }
    }

    /// Whether predictions can be served.
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }
}

impl From<Result<ModelStore, LoadError>> for ModelState {
    fn from(value: Result<ModelStore, LoadError>) -> Self {
        match value {
            Ok(store) => ModelState::Ready(store),
            Err(e) => ModelState::Unavailable(e),
        }
    }
}
