use ndarray::ArrayView1;

use crate::{
    EstimatorErr, Regressor, Result,
    artifact::{Column, MappedArtifact},
};

/// A linear regressor: `y = coef · x + intercept`.
pub struct Linear {
    artifact: MappedArtifact,
    coef: Column<f64>,
    intercept: f64,
}

impl Linear {
    pub(crate) fn from_artifact(artifact: MappedArtifact, n_features: usize) -> Result<Self> {
        let coef = artifact.column::<f64>("coef", Some(n_features))?;
        let intercept_col = artifact.column::<f64>("intercept", Some(1))?;
        let intercept = artifact
            .read(&intercept_col, 0)
            .ok_or_else(|| EstimatorErr::MissingTensor {
                name: "intercept".to_string(),
            })?;

        Ok(Self {
            artifact,
            coef,
            intercept,
        })
    }
}

impl Regressor for Linear {
    fn n_features(&self) -> usize {
        self.coef.len()
    }

    fn predict_row(&self, x: ArrayView1<f32>) -> Result<f64> {
        self.check_width(x.len())?;

        x.iter().enumerate().try_fold(self.intercept, |acc, (i, &xi)| {
            let w = self.artifact.read(&self.coef, i).ok_or(EstimatorErr::SizeMismatch {
                got: x.len(),
                expected: self.coef.len(),
            })?;
            Ok(acc + w * f64::from(xi))
        })
    }
}
