use std::{borrow::Cow, collections::HashMap, path::Path};

use safetensors::{Dtype, View};

use crate::{
    EstimatorErr, Result,
    artifact::Element,
    tree::{Aggregation, LEAF, Node},
};

struct OwnedTensor {
    dtype: Dtype,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl View for &OwnedTensor {
    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn data(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.data)
    }

    fn data_len(&self) -> usize {
        self.data.len()
    }
}

/// Builds estimator artifacts in the layout [`crate::Estimator::load`] reads.
///
/// Used by the demo generator and by tests, training pipelines are expected to produce the
/// same tensors and metadata keys.
#[derive(Default)]
pub struct ArtifactWriter {
    tensors: Vec<(String, OwnedTensor)>,
    metadata: HashMap<String, String>,
}

impl ArtifactWriter {
    /// Creates an empty writer, meant for hand-assembled artifacts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lays out a tree ensemble.
    ///
    /// # Arguments
    /// * `n_features` - Width of the feature vectors the ensemble accepts.
    /// * `trees` - The trees, each one with its root at index 0 and tree-local child indices.
    /// * `aggregation` - How tree outputs are combined.
    /// * `base_score` - Constant added after aggregation.
    ///
    /// # Returns
    /// A writer holding the ensemble's tensors and metadata, or `MalformedTree` when a child
    /// or feature index doesn't fit the artifact's `I32` columns.
    pub fn tree_ensemble(
        n_features: usize,
        trees: &[Vec<Node>],
        aggregation: Aggregation,
        base_score: f64,
    ) -> Result<Self> {
        let n_nodes: usize = trees.iter().map(Vec::len).sum();

        let mut offsets = Vec::with_capacity(trees.len() + 1);
        let mut children_left = Vec::with_capacity(n_nodes);
        let mut children_right = Vec::with_capacity(n_nodes);
        let mut feature = Vec::with_capacity(n_nodes);
        let mut threshold = Vec::with_capacity(n_nodes);
        let mut value = Vec::with_capacity(n_nodes);

        offsets.push(0_i64);
        for (t, tree) in trees.iter().enumerate() {
            for (n, node) in tree.iter().enumerate() {
                let narrow = |index: usize, reason: &'static str| {
                    i32::try_from(index).map_err(|_| EstimatorErr::MalformedTree {
                        tree: t,
                        node: n,
                        reason,
                    })
                };

                match *node {
                    Node::Split {
                        feature: f,
                        threshold: th,
                        left,
                        right,
                    } => {
                        children_left.push(narrow(left, "left child index overflows i32")?);
                        children_right.push(narrow(right, "right child index overflows i32")?);
                        feature.push(narrow(f, "feature index overflows i32")?);
                        threshold.push(th);
                        value.push(0.0);
                    }
                    Node::Leaf { value: v } => {
                        children_left.push(LEAF);
                        children_right.push(LEAF);
                        feature.push(-2);
                        threshold.push(-2.0);
                        value.push(v);
                    }
                }
            }
            let end = i64::try_from(children_left.len())
                .map_err(|_| EstimatorErr::InvalidTreeOffsets("node count overflows i64".into()))?;
            offsets.push(end);
        }

        let writer = Self::new()
            .with_metadata("estimator", "tree_ensemble")
            .with_metadata("n_features", n_features)
            .with_metadata("aggregation", aggregation.as_str())
            .with_metadata("base_score", base_score)
            .with_tensor("tree_offsets", &offsets)
            .with_tensor("children_left", &children_left)
            .with_tensor("children_right", &children_right)
            .with_tensor("feature", &feature)
            .with_tensor("threshold", &threshold)
            .with_tensor("value", &value);
        Ok(writer)
    }

    /// Lays out a linear model, its width is the length of `coef`.
    pub fn linear(coef: &[f64], intercept: f64) -> Self {
        Self::new()
            .with_metadata("estimator", "linear")
            .with_metadata("n_features", coef.len())
            .with_tensor("coef", coef)
            .with_tensor("intercept", &[intercept])
    }

    /// Sets a header metadata entry, replacing any previous value.
    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Adds a flat tensor, replacing any previous tensor with the same name.
    pub fn with_tensor<T: Element>(mut self, name: &str, data: &[T]) -> Self {
        self.tensors.retain(|(existing, _)| existing != name);
        self.tensors.push((
            name.to_string(),
            OwnedTensor {
                dtype: T::DTYPE,
                shape: vec![data.len()],
                data: bytemuck::cast_slice(data).to_vec(),
            },
        ));
        self
    }

    /// Serializes the artifact into safetensors bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let data = self.tensors.iter().map(|(name, t)| (name.as_str(), t));
        let bytes = safetensors::serialize(data, &Some(self.metadata.clone()))?;
        Ok(bytes)
    }

    /// Serializes the artifact and writes it to `path`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|source| EstimatorErr::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
