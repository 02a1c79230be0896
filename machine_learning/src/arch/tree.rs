use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{
    Model,
    model::{check_fit_input, check_restored, check_width},
};
use crate::{MlErr, Result};

/// The improvement a split must make over its parent to be worth taking.
const MIN_GAIN: f64 = 1e-9;

/// Growth limits of a `RegressionTree`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A CART regression tree that splits on the largest reduction of squared error.
///
/// Thresholds sit halfway between two consecutive distinct values, samples with a feature value
/// lower or equal than the threshold go to the left child.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    params: TreeParams,
    nodes: Vec<Node>,
    width: usize,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl RegressionTree {
    /// Creates a new unfitted `RegressionTree`.
    ///
    /// # Arguments
    /// * `params` - The growth limits of the tree.
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            width: 0,
        }
    }

    /// Returns the amount of nodes, leaves included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the amount of levels below the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut stack = vec![(0, 0)];

        while let Some((idx, level)) = stack.pop() {
            depth = depth.max(level);
            if let Some(Node::Split { left, right, .. }) = self.nodes.get(idx) {
                stack.push((*left, level + 1));
                stack.push((*right, level + 1));
            }
        }

        depth
    }

    /// Grows the tree over a subset of the rows of `x`, repeated indices are allowed.
    ///
    /// # Arguments
    /// * `x` - The design matrix.
    /// * `y` - The targets.
    /// * `samples` - The rows to train on.
    pub fn fit_samples(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        samples: Vec<usize>,
    ) -> Result<()> {
        check_fit_input(x, y)?;
        if samples.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        self.nodes.clear();
        self.nodes.push(Node::Leaf { value: 0.0 });
        self.width = x.ncols();

        let mut stack = vec![(0, samples, 0)];
        while let Some((idx, samples, depth)) = stack.pop() {
            let value = mean(y, &samples);

            let Some(split) = self.best_split(x, y, &samples, depth) else {
                self.nodes[idx] = Node::Leaf { value };
                continue;
            };

            let (left, right): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|&i| x[[i, split.feature]] <= split.threshold);

            let left_idx = self.nodes.len();
            let right_idx = left_idx + 1;
            self.nodes.push(Node::Leaf { value: 0.0 });
            self.nodes.push(Node::Leaf { value: 0.0 });
            self.nodes[idx] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: left_idx,
                right: right_idx,
            };

            stack.push((right_idx, right, depth + 1));
            stack.push((left_idx, left, depth + 1));
        }

        Ok(())
    }

    /// Predicts the target of a single row.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[feature] <= threshold { left } else { right },
            }
        }
    }

    /// Looks for the split that best reduces the squared error of `samples`.
    ///
    /// Minimizing the children's squared error is the same as maximizing
    /// `sum_l² / n_l + sum_r² / n_r`, which can be swept in a single pass per feature.
    fn best_split(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        samples: &[usize],
        depth: usize,
    ) -> Option<Candidate> {
        let n = samples.len();
        if n < self.params.min_samples_split.max(2) {
            return None;
        }

        if self.params.max_depth.is_some_and(|max| depth >= max) {
            return None;
        }

        let total: f64 = samples.iter().map(|&i| y[i]).sum();
        let parent = total * total / n as f64;
        let mut best: Option<Candidate> = None;
        let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in 0..x.ncols() {
            sorted.clear();
            sorted.extend(samples.iter().map(|&i| (x[[i, feature]], y[i])));
            sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += sorted[k].1;

                let (lo, hi) = (sorted[k].0, sorted[k + 1].0);
                if lo == hi {
                    continue;
                }

                let nl = (k + 1) as f64;
                let nr = (n - k - 1) as f64;
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / nl + right_sum * right_sum / nr;

                if best.as_ref().is_none_or(|b| score > b.score) {
                    let mid = lo + (hi - lo) / 2.0;
                    let threshold = if mid < hi { mid } else { lo };
                    best = Some(Candidate {
                        feature,
                        threshold,
                        score,
                    });
                }
            }
        }

        best.filter(|b| b.score - parent > MIN_GAIN * parent.abs().max(1.0))
    }
}

impl Model for RegressionTree {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<()> {
        self.fit_samples(x, y, (0..x.nrows()).collect())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(MlErr::NotFitted {
                what: "regression tree",
            });
        }

        check_width(x, self.width)?;
        Ok(x.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }

    fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Besides the width, children must come after their parent in the arena so that every
    /// descent reaches a leaf.
    fn validate(&self, width: usize) -> Result<()> {
        check_restored("regression tree", self.is_fitted(), self.width, width)?;

        let malformed = |reason: String| MlErr::Malformed {
            what: "regression tree",
            reason,
        };

        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(malformed(format!("leaf {idx} holds {value}")));
                }
                Node::Leaf { .. } => {}
                Node::Split { feature, .. } if feature >= width => {
                    return Err(malformed(format!("node {idx} splits on feature {feature}")));
                }
                Node::Split { left, right, .. } => {
                    let in_order = |child: usize| child > idx && child < self.nodes.len();
                    if !in_order(left) || !in_order(right) {
                        return Err(malformed(format!(
                            "node {idx} points to children {left} and {right}"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

fn mean(y: ArrayView1<f64>, samples: &[usize]) -> f64 {
    samples.iter().map(|&i| y[i]).sum::<f64>() / samples.len() as f64
}
