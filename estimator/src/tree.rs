use std::ops::Range;

use ndarray::ArrayView1;

use crate::{
    EstimatorErr, Regressor, Result,
    artifact::{Column, MappedArtifact},
};

/// Marker stored in `children_left` for leaf nodes.
pub const LEAF: i32 = -1;

/// How the outputs of the individual trees are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Averages the trees, as a random forest does.
    Mean,
    /// Adds the trees scaled by the learning rate, as gradient boosting does.
    Sum,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
        }
    }
}

impl std::str::FromStr for Aggregation {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Aggregation::Mean),
            "sum" => Ok(Aggregation::Sum),
            _ => Err(()),
        }
    }
}

/// A single node of a regression tree, used when building artifacts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    /// Goes to `left` when `x[feature] <= threshold`, to `right` otherwise.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl Node {
    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        Node::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    pub fn leaf(value: f64) -> Self {
        Node::Leaf { value }
    }
}

/// An ensemble of regression trees whose nodes live in a memory-mapped artifact.
///
/// Nodes of all trees are stored back to back in flat columns, tree `t` owns the nodes in
/// `tree_offsets[t]..tree_offsets[t + 1]` and child indices are local to their tree.
pub struct TreeEnsemble {
    artifact: MappedArtifact,
    n_features: usize,
    trees: Vec<Range<usize>>,
    aggregation: Aggregation,
    base_score: f64,
    learning_rate: f64,
    children_left: Column<i32>,
    children_right: Column<i32>,
    feature: Column<i32>,
    threshold: Column<f64>,
    value: Column<f64>,
}

impl TreeEnsemble {
    /// Resolves the ensemble's columns and tree layout from an already mapped artifact.
    ///
    /// Only the offsets are read eagerly, node payloads stay untouched until prediction.
    pub(crate) fn from_artifact(artifact: MappedArtifact, n_features: usize) -> Result<Self> {
        let aggregation = artifact.meta_or("aggregation", Aggregation::Mean)?;
        let base_score = artifact.meta_or("base_score", 0.0)?;
        let learning_rate = artifact.meta_or("learning_rate", 1.0)?;

        let children_left = artifact.column::<i32>("children_left", None)?;
        let n_nodes = children_left.len();
        let children_right = artifact.column::<i32>("children_right", Some(n_nodes))?;
        let feature = artifact.column::<i32>("feature", Some(n_nodes))?;
        let threshold = artifact.column::<f64>("threshold", Some(n_nodes))?;
        let value = artifact.column::<f64>("value", Some(n_nodes))?;

        let offsets = artifact.column::<i64>("tree_offsets", None)?;
        let trees = Self::tree_ranges(&artifact, &offsets, n_nodes)?;

        Ok(Self {
            artifact,
            n_features,
            trees,
            aggregation,
            base_score,
            learning_rate,
            children_left,
            children_right,
            feature,
            threshold,
            value,
        })
    }

    /// Turns the `tree_offsets` column into one node range per tree.
    fn tree_ranges(
        artifact: &MappedArtifact,
        offsets: &Column<i64>,
        n_nodes: usize,
    ) -> Result<Vec<Range<usize>>> {
        if offsets.len() < 2 {
            return Err(EstimatorErr::InvalidTreeOffsets(format!(
                "expected at least 2 offsets, got {}",
                offsets.len()
            )));
        }

        let bounds = (0..offsets.len())
            .map(|i| {
                artifact
                    .read(offsets, i)
                    .and_then(|offset| usize::try_from(offset).ok())
                    .ok_or_else(|| {
                        EstimatorErr::InvalidTreeOffsets(format!("offset {i} is not a valid index"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        if bounds[0] != 0 || bounds[bounds.len() - 1] != n_nodes {
            return Err(EstimatorErr::InvalidTreeOffsets(format!(
                "offsets must span 0..{n_nodes}, got {}..{}",
                bounds[0],
                bounds[bounds.len() - 1]
            )));
        }

        bounds
            .windows(2)
            .enumerate()
            .map(|(t, pair)| {
                if pair[0] < pair[1] {
                    Ok(pair[0]..pair[1])
                } else {
                    Err(EstimatorErr::InvalidTreeOffsets(format!("tree {t} is empty")))
                }
            })
            .collect()
    }

    /// Returns the amount of trees in the ensemble.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Walks a single tree from its root down to a leaf.
    ///
    /// # Arguments
    /// * `t` - The tree index, used for error reporting.
    /// * `nodes` - The global node range owned by the tree.
    /// * `x` - The feature vector.
    ///
    /// # Returns
    /// The leaf value or an error if the tree points outside of itself or the input.
    fn eval_tree(&self, t: usize, nodes: &Range<usize>, x: ArrayView1<f32>) -> Result<f64> {
        let malformed = |node: usize, reason: &'static str| EstimatorErr::MalformedTree {
            tree: t,
            node,
            reason,
        };

        let read_i32 = |column: &Column<i32>, node: usize| {
            self.artifact
                .read(column, nodes.start + node)
                .ok_or_else(|| malformed(node, "node is out of the artifact"))
        };

        let read_f64 = |column: &Column<f64>, node: usize| {
            self.artifact
                .read(column, nodes.start + node)
                .ok_or_else(|| malformed(node, "node is out of the artifact"))
        };

        let mut node = 0;

        // A path from the root to a leaf visits each node at most once.
        for _ in 0..nodes.len() {
            let left = read_i32(&self.children_left, node)?;
            if left == LEAF {
                return read_f64(&self.value, node);
            }

            let right = read_i32(&self.children_right, node)?;
            let threshold = read_f64(&self.threshold, node)?;
            let xi = usize::try_from(read_i32(&self.feature, node)?)
                .ok()
                .and_then(|f| x.get(f))
                .ok_or_else(|| malformed(node, "split feature is out of range"))?;

            let next = if f64::from(*xi) <= threshold {
                left
            } else {
                right
            };

            node = usize::try_from(next)
                .ok()
                .filter(|&child| child < nodes.len())
                .ok_or_else(|| malformed(node, "child index is out of the tree"))?;
        }

        Err(malformed(node, "traversal never reached a leaf"))
    }
}

impl Regressor for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, x: ArrayView1<f32>) -> Result<f64> {
        self.check_width(x.len())?;

        let mut total = 0.0;
        for (t, nodes) in self.trees.iter().enumerate() {
            total += self.eval_tree(t, nodes, x)?;
        }

        let raw = match self.aggregation {
            Aggregation::Mean => total / self.trees.len() as f64,
            Aggregation::Sum => total * self.learning_rate,
        };

        Ok(raw + self.base_score)
    }
}
