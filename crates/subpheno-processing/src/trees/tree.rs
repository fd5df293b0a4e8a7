//! CART regression tree stored as a flat node arena.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// Relative gain below which a split is not worth making.
const MIN_RELATIVE_GAIN: f64 = 1e-12;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth; `None` grows until the leaf limits stop it.
    pub max_depth: Option<usize>,
    /// Minimum rows in a node for it to be split.
    pub min_samples_split: usize,
    /// Minimum rows in each leaf.
    pub min_samples_leaf: usize,
    /// Candidate features drawn at every node; `None` tries all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A fitted regression tree minimizing squared error.
///
/// Rows go left when `x[feature] <= threshold`. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    importance: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree on `rows` of `x` against targets `y`.
    ///
    /// `y` is indexed like the rows of `x`. `rows` may repeat indices, which
    /// is how bootstrap samples are passed in. Split gains (squared-error
    /// decrease) are accumulated per feature into the tree's importance.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[f64],
        rows: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = x.ncols();
        let mut builder = Builder {
            x,
            y,
            params,
            n_candidates: params.max_features.unwrap_or(n_features).clamp(1, n_features.max(1)),
            nodes: Vec::new(),
            importance: vec![0.0; n_features],
        };
        builder.grow(rows.to_vec(), 0, rng);

        Self {
            nodes: builder.nodes,
            importance: builder.importance,
        }
    }

    /// Walk `row` down to its leaf: `(leaf id, leaf value)`.
    fn descend(&self, row: ArrayView1<'_, f64>) -> (usize, f64) {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { value, .. } => return (id, value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => id = if row[feature] <= threshold { left } else { right },
            }
        }
    }

    /// Index of the leaf `row` falls into.
    pub fn leaf_index(&self, row: ArrayView1<'_, f64>) -> usize {
        self.descend(row).0
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.descend(row).1
    }

    /// Overwrite the value of leaf `id`. Non-leaf ids are ignored.
    pub fn set_leaf_value(&mut self, id: usize, new_value: f64) {
        if let Some(Node::Leaf { value, .. }) = self.nodes.get_mut(id) {
            *value = new_value;
        }
    }

    /// Unnormalized squared-error decrease per feature.
    pub fn importance(&self) -> &[f64] {
        &self.importance
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }
}

/// Growth state of one tree. The view keeps its own lifetime, separate from
/// the borrowed targets and limits.
struct Builder<'x, 'a> {
    x: ArrayView2<'x, f64>,
    y: &'a [f64],
    params: &'a TreeParams,
    n_candidates: usize,
    nodes: Vec<Node>,
    importance: Vec<f64>,
}

impl Builder<'_, '_> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let n = rows.len();
        let mean = if n == 0 {
            0.0
        } else {
            rows.iter().map(|&r| self.y[r]).sum::<f64>() / n as f64
        };

        let splittable = n >= self.params.min_samples_split.max(2)
            && n >= 2 * self.params.min_samples_leaf.max(1)
            && self.params.max_depth.is_none_or(|d| depth < d);

        if splittable && let Some(split) = self.best_split(&rows, mean, rng) {
            self.importance[split.feature] += split.gain;
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&r| self.x[[r, split.feature]] <= split.threshold);

            let id = self.nodes.len();
            self.nodes.push(Node::Leaf {
                value: mean,
                n_samples: n,
            });
            let left = self.grow(left_rows, depth + 1, rng);
            let right = self.grow(right_rows, depth + 1, rng);
            self.nodes[id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            return id;
        }

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: mean,
            n_samples: n,
        });
        id
    }

    /// Best squared-error split over a random subset of features.
    ///
    /// Targets are centered on the node mean before summing so large-valued
    /// columns do not lose the gain to rounding.
    fn best_split(&self, rows: &[usize], mean: f64, rng: &mut StdRng) -> Option<Split> {
        let n = rows.len();
        if self.x.ncols() == 0 {
            return None;
        }
        let node_sse: f64 = rows.iter().map(|&r| (self.y[r] - mean).powi(2)).sum();
        if node_sse <= f64::EPSILON * mean.abs().max(1.0) {
            return None;
        }
        let total: f64 = rows.iter().map(|&r| self.y[r] - mean).sum();
        let parent = total * total / n as f64;
        let min_leaf = self.params.min_samples_leaf.max(1);
        let min_gain = MIN_RELATIVE_GAIN * node_sse;

        let mut best: Option<Split> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in index::sample(rng, self.x.ncols(), self.n_candidates).iter() {
            pairs.clear();
            pairs.extend(rows.iter().map(|&r| (self.x[[r, feature]], self.y[r] - mean)));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for i in 1..n {
                left_sum += pairs[i - 1].1;
                if i < min_leaf || n - i < min_leaf {
                    continue;
                }
                let (lo, hi) = (pairs[i - 1].0, pairs[i].0);
                if lo >= hi {
                    continue;
                }
                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / i as f64
                    + right_sum * right_sum / (n - i) as f64
                    - parent;
                if gain > best.map_or(min_gain, |b| b.gain) {
                    let mid = lo + (hi - lo) / 2.0;
                    let threshold = if mid < hi { mid } else { lo };
                    best = Some(Split {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}
