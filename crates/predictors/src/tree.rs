//! CART regression tree grown on squared error.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use sc_core::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct Pending {
    slot: usize,
    depth: usize,
    samples: Vec<usize>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grows a tree over `samples` (row indices into `x`, repeats allowed) and adds each
    /// split's squared-error reduction to `importances`.
    pub fn grow(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        samples: Vec<usize>,
        params: TreeParams,
        importances: &mut [f64],
    ) -> Self {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut stack = vec![Pending { slot: 0, depth: 0, samples }];

        while let Some(Pending { slot, depth, samples }) = stack.pop() {
            let (mean, sse) = mean_and_sse(y, &samples);
            let depth_reached = params.max_depth.is_some_and(|max| depth >= max);
            if samples.len() < params.min_samples_split || depth_reached || sse <= f64::EPSILON {
                nodes[slot] = Node::Leaf { value: mean };
                continue;
            }

            let Some(best) = best_split(x, y, &samples, sse, importances.len()) else {
                nodes[slot] = Node::Leaf { value: mean };
                continue;
            };
            importances[best.feature] += best.gain.max(0.0);

            let (left, right): (Vec<usize>, Vec<usize>) =
                samples.into_iter().partition(|&s| x[[s, best.feature]] <= best.threshold);

            let left_slot = nodes.len();
            nodes.push(Node::Leaf { value: 0.0 });
            let right_slot = nodes.len();
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[slot] = Node::Split {
                feature: best.feature,
                threshold: best.threshold,
                left: left_slot,
                right: right_slot,
            };
            stack.push(Pending { slot: right_slot, depth: depth + 1, samples: right });
            stack.push(Pending { slot: left_slot, depth: depth + 1, samples: left });
        }

        Self { nodes }
    }

    /// Follows the splits for one row. Children always sit after their parent, so a
    /// well-formed path visits at most `node_count` nodes.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<f64> {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(&Node::Leaf { value }) => return Ok(value),
                Some(&Node::Split { feature, threshold, left, right }) => {
                    let value = row.get(feature).ok_or_else(|| {
                        let width = row.len();
                        CoreError::Data(format!("split on feature {feature} of a {width}-wide row"))
                    })?;
                    idx = if *value <= threshold { left } else { right };
                }
                None => break,
            }
        }
        Err(CoreError::Data("tree path does not end in a leaf".into()))
    }

    /// Rejects trees that could not have been grown over `n_features` columns.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(CoreError::Data("tree has no nodes".into()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(CoreError::Data(format!("leaf {idx} holds a non-finite value")));
                }
                Node::Leaf { .. } => {}
                Node::Split { feature, threshold, left, right } => {
                    if feature >= n_features {
                        return Err(CoreError::Data(format!(
                            "node {idx} splits on feature {feature}, model has {n_features}"
                        )));
                    }
                    if !threshold.is_finite() {
                        let reason = format!("node {idx} has a non-finite threshold");
                        return Err(CoreError::Data(reason));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(CoreError::Data(format!(
                                "node {idx} points at child {child} of {}",
                                self.nodes.len()
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0, 0)];
        while let Some((idx, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Node::Split { left, right, .. } = self.nodes[idx] {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }
}

fn mean_and_sse(y: ArrayView1<'_, f64>, samples: &[usize]) -> (f64, f64) {
    let n = samples.len() as f64;
    let sum: f64 = samples.iter().map(|&s| y[s]).sum();
    let mean = sum / n;
    let sse = samples.iter().map(|&s| (y[s] - mean).powi(2)).sum();
    (mean, sse)
}

/// Exhaustive search over every feature and every boundary between distinct values.
/// Ties keep the earliest feature and the lowest threshold.
fn best_split(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    samples: &[usize],
    parent_sse: f64,
    n_features: usize,
) -> Option<BestSplit> {
    let n = samples.len();
    let mut order = samples.to_vec();
    let mut best: Option<BestSplit> = None;

    for feature in 0..n_features {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));
        let total_sum: f64 = order.iter().map(|&s| y[s]).sum();
        let total_sq: f64 = order.iter().map(|&s| y[s] * y[s]).sum();

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for i in 1..n {
            let prev = order[i - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            let lo = x[[prev, feature]];
            let hi = x[[order[i], feature]];
            if lo >= hi {
                continue;
            }

            let n_left = i as f64;
            let n_right = (n - i) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse_left = (left_sq - left_sum * left_sum / n_left).max(0.0);
            let sse_right = (right_sq - right_sum * right_sum / n_right).max(0.0);
            let gain = parent_sse - sse_left - sse_right;

            if best.as_ref().map_or(true, |b| gain > b.gain) {
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(BestSplit { feature, threshold, gain });
            }
        }
    }

    best
}
