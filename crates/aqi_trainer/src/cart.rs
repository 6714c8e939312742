//! CART regression tree builder
//!
//! Exact-greedy splits on the squared-error criterion. Candidate thresholds
//! are midpoints between consecutive distinct feature values, samples go
//! left when `value <= threshold`, and each node draws its own feature
//! subset from the caller's RNG.

use std::fmt;
use std::str::FromStr;

use aqi_core::forest::{Node, Tree};
use serde::{Deserialize, Serialize};

use crate::deterministic::{LcgRng, SplitTieBreaker};

/// Node impurity below which a node is treated as pure
const PURITY_EPSILON: f64 = 1e-12;

/// Number of features examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
}

impl MaxFeatures {
    /// Concrete subset size for `n` features, at least one
    pub fn resolve(self, n: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n as f64).log2().floor() as usize,
            MaxFeatures::All => n,
        };
        k.clamp(1, n.max(1))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MaxFeatures::Sqrt => "sqrt",
            MaxFeatures::Log2 => "log2",
            MaxFeatures::All => "all",
        }
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaxFeatures {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqrt" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            "all" => Ok(MaxFeatures::All),
            other => Err(format!("unknown max_features `{other}`")),
        }
    }
}

/// Growth limits for a single tree
#[derive(Clone, Debug, PartialEq)]
pub struct TreeConfig {
    /// `None` grows until the other limits stop it
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

/// A tree together with its unnormalized impurity decrease per feature
#[derive(Debug, Clone)]
pub struct FittedTree {
    pub tree: Tree,
    pub importances: Vec<f64>,
}

#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    /// `S_l²/n_l + S_r²/n_r`; larger means lower child SSE
    score: f64,
    tie_breaker: SplitTieBreaker,
}

struct Pending {
    slot: usize,
    indices: Vec<usize>,
    depth: usize,
}

/// Builds regression trees over a fixed training matrix
pub struct CartBuilder<'a> {
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    feature_count: usize,
    config: TreeConfig,
}

impl<'a> CartBuilder<'a> {
    pub fn new(features: &'a [Vec<f64>], targets: &'a [f64], config: TreeConfig) -> Self {
        debug_assert_eq!(features.len(), targets.len());
        let feature_count = features.first().map_or(0, Vec::len);

        Self {
            features,
            targets,
            feature_count,
            config,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Grow a tree over `indices` (duplicates allowed, e.g. a bootstrap).
    ///
    /// Nodes are laid out so that children always follow their parent.
    pub fn build(&self, indices: &[usize], rng: &mut LcgRng) -> FittedTree {
        let mut nodes = vec![Node::leaf(0, 0.0)];
        let mut importances = vec![0.0; self.feature_count];
        let mut stack = vec![Pending {
            slot: 0,
            indices: indices.to_vec(),
            depth: 0,
        }];

        while let Some(Pending {
            slot,
            indices,
            depth,
        }) = stack.pop()
        {
            let (sum, sse) = self.sum_and_sse(&indices);
            let n = indices.len();
            let leaf_value = if n == 0 { 0.0 } else { sum / n as f64 };

            let can_split = self.config.max_depth.map_or(true, |max| depth < max)
                && n >= self.config.min_samples_split
                && n >= 2 * self.config.min_samples_leaf
                && sse > PURITY_EPSILON;

            let split = if can_split {
                self.find_best_split(&indices, sum, rng)
            } else {
                None
            };

            let Some(split) = split else {
                nodes[slot] = Node::leaf(slot as i32, leaf_value);
                continue;
            };

            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| self.features[i][split.feature_idx] <= split.threshold);

            let decrease = split.score - sum * sum / n as f64;
            importances[split.feature_idx] += decrease.max(0.0);

            let left_slot = nodes.len();
            let right_slot = left_slot + 1;
            nodes.push(Node::leaf(left_slot as i32, 0.0));
            nodes.push(Node::leaf(right_slot as i32, 0.0));
            nodes[slot] = Node::internal(
                slot as i32,
                split.feature_idx as i32,
                split.threshold,
                left_slot as i32,
                right_slot as i32,
            );

            stack.push(Pending {
                slot: right_slot,
                indices: right,
                depth: depth + 1,
            });
            stack.push(Pending {
                slot: left_slot,
                indices: left,
                depth: depth + 1,
            });
        }

        FittedTree {
            tree: Tree::new(nodes),
            importances,
        }
    }

    fn find_best_split(
        &self,
        indices: &[usize],
        total: f64,
        rng: &mut LcgRng,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let k = self.config.max_features.resolve(self.feature_count);
        let drawn = rng.sample_indices(self.feature_count, k);

        let mut best: Option<SplitCandidate> = None;
        let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

        for (draw_order, &feature_idx) in drawn.iter().enumerate() {
            column.clear();
            column.extend(
                indices
                    .iter()
                    .map(|&i| (self.features[i][feature_idx], self.targets[i])),
            );
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for pos in 0..n.saturating_sub(1) {
                left_sum += column[pos].1;
                let (lo, hi) = (column[pos].0, column[pos + 1].0);
                if lo == hi {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let score = left_sum * left_sum / n_left as f64
                    + right_sum * right_sum / n_right as f64;
                let candidate = SplitCandidate {
                    feature_idx,
                    threshold: midpoint(lo, hi),
                    score,
                    tie_breaker: SplitTieBreaker::new(draw_order, pos),
                };

                best = match best {
                    None => Some(candidate),
                    Some(current) => {
                        if score > current.score
                            || (score == current.score
                                && candidate.tie_breaker < current.tie_breaker)
                        {
                            Some(candidate)
                        } else {
                            Some(current)
                        }
                    }
                };
            }
        }

        best
    }

    fn sum_and_sse(&self, indices: &[usize]) -> (f64, f64) {
        if indices.is_empty() {
            return (0.0, 0.0);
        }
        let sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let mean = sum / indices.len() as f64;
        let sse = indices
            .iter()
            .map(|&i| (self.targets[i] - mean).powi(2))
            .sum();
        (sum, sse)
    }
}

/// Threshold between two distinct sorted values that keeps `lo` on the left
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi || mid < lo {
        lo
    } else {
        mid
    }
}
