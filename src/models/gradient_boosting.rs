//! Градиентный бустинг над регрессионными деревьями (целевая функция
//! `reg:squarederror`). Деревья строятся точным жадным поиском разбиений,
//! листья считаются с L1/L2-регуляризацией. Вклады признаков считаются
//! точным TreeSHAP.

#![allow(non_snake_case)]

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Минимальное улучшение, при котором разбиение принимается
const MIN_SPLIT_GAIN: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterParams {
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2-регуляризация весов листьев
    pub lambda: f64,
    /// L1-регуляризация весов листьев
    pub alpha: f64,
    /// Минимальное снижение потерь для разбиения
    pub gamma: f64,
    pub min_child_weight: f64,
    pub num_boost_round: usize,
    pub early_stopping_rounds: Option<usize>,
    pub subsample: f64,
    pub seed: u64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.025,
            max_depth: 4,
            lambda: 2.0,
            alpha: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            num_boost_round: 350,
            early_stopping_rounds: Some(20),
            subsample: 1.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
        cover: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        gain: f64,
        cover: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn cover(&self) -> f64 {
        match self {
            Node::Leaf { cover, .. } | Node::Split { cover, .. } => *cover,
        }
    }

    fn predict(&self, sample: ArrayView1<'_, f64>) -> f64 {
        match self {
            Node::Leaf { value, .. } => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                if goes_left(sample[*feature], *threshold) {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    /// Среднее значение листьев, взвешенное покрытием
    fn expected_value(&self) -> f64 {
        match self {
            Node::Leaf { value, .. } => *value,
            Node::Split {
                cover, left, right, ..
            } => {
                if *cover <= 0.0 {
                    return 0.0;
                }
                (left.cover() * left.expected_value() + right.cover() * right.expected_value())
                    / cover
            }
        }
    }

    fn accumulate_gain(&self, gains: &mut [f64]) {
        if let Node::Split {
            feature,
            gain,
            left,
            right,
            ..
        } = self
        {
            gains[*feature] += gain;
            left.accumulate_gain(gains);
            right.accumulate_gain(gains);
        }
    }
}

fn goes_left(value: f64, threshold: f64) -> bool {
    value.is_nan() || value < threshold
}

/// Мягкий порог для L1-регуляризации
fn threshold_l1(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalRecord {
    pub round: usize,
    pub train_rmse: f64,
    pub eval_rmse: Option<f64>,
}

pub struct GradientBoostingRegressor {
    params: BoosterParams,
}

impl GradientBoostingRegressor {
    pub fn new(params: BoosterParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    /// Обучение; при наличии `eval` используется ранняя остановка по RMSE
    pub fn fit(
        &self,
        X: &Array2<f64>,
        y: &[f64],
        eval: Option<(&Array2<f64>, &[f64])>,
        feature_names: Vec<String>,
    ) -> Result<Booster> {
        let n = X.nrows();
        if n == 0 {
            return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
        }
        if y.len() != n {
            return Err(ForecastError::InvalidData(format!(
                "feature matrix has {} rows, labels have {}",
                n,
                y.len()
            )));
        }
        if feature_names.len() != X.ncols() {
            return Err(ForecastError::InvalidData(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                X.ncols()
            )));
        }
        if let Some((eval_x, eval_y)) = eval {
            if eval_x.ncols() != X.ncols() || eval_x.nrows() != eval_y.len() {
                return Err(ForecastError::InvalidData(
                    "evaluation set does not match the training set".to_string(),
                ));
            }
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidData(
                "labels contain missing values".to_string(),
            ));
        }

        let base_score = y.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut eval_predictions = eval.map(|(ex, _)| vec![base_score; ex.nrows()]);

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut trees: Vec<Node> = Vec::with_capacity(self.params.num_boost_round);
        let mut history = Vec::with_capacity(self.params.num_boost_round);
        let mut best_iteration = 0;
        let mut best_score = f64::INFINITY;

        for round in 0..self.params.num_boost_round {
            let gradients: Vec<f64> = predictions.iter().zip(y).map(|(p, t)| p - t).collect();
            let hessians = vec![1.0; n];

            let indices: Vec<usize> = if self.params.subsample < 1.0 {
                let sampled: Vec<usize> = (0..n)
                    .filter(|_| rng.gen::<f64>() < self.params.subsample)
                    .collect();
                if sampled.is_empty() {
                    vec![rng.gen_range(0..n)]
                } else {
                    sampled
                }
            } else {
                (0..n).collect()
            };

            let tree = self.build_node(X, &gradients, &hessians, &indices, 0);
            for (i, p) in predictions.iter_mut().enumerate() {
                *p += tree.predict(X.row(i));
            }

            let train_rmse = rmse(&predictions, y);
            let eval_rmse = match (eval, eval_predictions.as_mut()) {
                (Some((ex, ey)), Some(ep)) => {
                    for (i, p) in ep.iter_mut().enumerate() {
                        *p += tree.predict(ex.row(i));
                    }
                    Some(rmse(ep, ey))
                }
                _ => None,
            };
            trees.push(tree);
            history.push(EvalRecord {
                round,
                train_rmse,
                eval_rmse,
            });

            let score = eval_rmse.unwrap_or(train_rmse);
            if score < best_score {
                best_score = score;
                best_iteration = round;
            }

            if let (Some(patience), Some(_)) = (self.params.early_stopping_rounds, eval_rmse) {
                if round - best_iteration >= patience {
                    tracing::debug!(
                        "Early stopping at round {}, best iteration {}",
                        round,
                        best_iteration
                    );
                    break;
                }
            }
        }

        // Без валидационного набора сохраняются все деревья
        if eval.is_some() {
            trees.truncate(best_iteration + 1);
        } else {
            best_iteration = trees.len().saturating_sub(1);
        }

        Ok(Booster {
            base_score,
            trees,
            feature_names,
            best_iteration,
            history,
        })
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        -threshold_l1(g, self.params.alpha) / (h + self.params.lambda)
    }

    fn leaf_score(&self, g: f64, h: f64) -> f64 {
        let t = threshold_l1(g, self.params.alpha);
        t * t / (h + self.params.lambda)
    }

    fn build_node(
        &self,
        X: &Array2<f64>,
        g: &[f64],
        h: &[f64],
        indices: &[usize],
        depth: usize,
    ) -> Node {
        let g_sum: f64 = indices.iter().map(|&i| g[i]).sum();
        let h_sum: f64 = indices.iter().map(|&i| h[i]).sum();
        let leaf = Node::Leaf {
            value: self.params.learning_rate * self.leaf_weight(g_sum, h_sum),
            cover: h_sum,
        };

        if depth >= self.params.max_depth || indices.len() < 2 {
            return leaf;
        }

        let parent_score = self.leaf_score(g_sum, h_sum);
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in 0..X.ncols() {
            let mut present: Vec<usize> = Vec::with_capacity(indices.len());
            let (mut g_left, mut h_left) = (0.0, 0.0);
            for &i in indices {
                if X[[i, feature]].is_nan() {
                    // пропуски всегда уходят влево
                    g_left += g[i];
                    h_left += h[i];
                } else {
                    present.push(i);
                }
            }
            present.sort_by(|&a, &b| {
                X[[a, feature]]
                    .partial_cmp(&X[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            for pos in 0..present.len().saturating_sub(1) {
                let i = present[pos];
                g_left += g[i];
                h_left += h[i];

                let value = X[[i, feature]];
                let next = X[[present[pos + 1], feature]];
                if next <= value {
                    continue;
                }

                let g_right = g_sum - g_left;
                let h_right = h_sum - h_left;
                if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight
                {
                    continue;
                }

                let gain = self.leaf_score(g_left, h_left) + self.leaf_score(g_right, h_right)
                    - parent_score;
                if gain <= self.params.gamma.max(MIN_SPLIT_GAIN) {
                    continue;
                }
                if best.map_or(true, |(_, _, b)| gain > b) {
                    best = Some((feature, 0.5 * (value + next), gain));
                }
            }
        }

        let (feature, threshold, gain) = match best {
            Some(split) => split,
            None => return leaf,
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| goes_left(X[[i, feature]], threshold));

        Node::Split {
            feature,
            threshold,
            gain,
            cover: h_sum,
            left: Box::new(self.build_node(X, g, h, &left, depth + 1)),
            right: Box::new(self.build_node(X, g, h, &right, depth + 1)),
        }
    }
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(BoosterParams::default())
    }
}

/// Обученный ансамбль деревьев
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booster {
    base_score: f64,
    trees: Vec<Node>,
    feature_names: Vec<String>,
    best_iteration: usize,
    history: Vec<EvalRecord>,
}

impl Booster {
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn best_iteration(&self) -> usize {
        self.best_iteration
    }

    pub fn history(&self) -> &[EvalRecord] {
        &self.history
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn check_width(&self, X: &Array2<f64>) -> Result<()> {
        if X.ncols() != self.feature_names.len() {
            return Err(ForecastError::InvalidData(format!(
                "model expects {} features, got {}",
                self.feature_names.len(),
                X.ncols()
            )));
        }
        Ok(())
    }

    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(X)?;
        Ok(X
            .rows()
            .into_iter()
            .map(|row| self.predict_row(row))
            .collect())
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Ожидаемое значение модели (свободный член SHAP)
    pub fn expected_value(&self) -> f64 {
        self.base_score + self.trees.iter().map(Node::expected_value).sum::<f64>()
    }

    /// SHAP-вклады: `n x (features + 1)`, в последней колонке ожидаемое значение
    pub fn contributions(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(X)?;
        let m = self.feature_names.len();
        let bias = self.expected_value();
        let mut out = Array2::zeros((X.nrows(), m + 1));

        for (r, row) in X.rows().into_iter().enumerate() {
            let mut phi = vec![0.0; m];
            for tree in &self.trees {
                tree_shap(tree, row, &mut phi, Vec::new(), 1.0, 1.0, None);
            }
            for (c, value) in phi.into_iter().enumerate() {
                out[[r, c]] = value;
            }
            out[[r, m]] = bias;
        }
        Ok(out)
    }

    /// Суммарный gain по признакам, по убыванию
    pub fn feature_importance(&self) -> Vec<(String, f64)> {
        let mut gains = vec![0.0; self.feature_names.len()];
        for tree in &self.trees {
            tree.accumulate_gain(&mut gains);
        }
        let mut importance: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(gains)
            .collect();
        importance.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        importance
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

pub fn rmse(predicted: &[f64], actual: &[f64]) -> f64 {
    if predicted.is_empty() {
        return 0.0;
    }
    let mse = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum::<f64>()
        / predicted.len() as f64;
    mse.sqrt()
}

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

fn extend_path(path: &mut Vec<PathElement>, zero: f64, one: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction: zero,
        one_fraction: one,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });
    for i in (0..depth).rev() {
        path[i + 1].weight += one * path[i].weight * (i + 1) as f64 / (depth + 1) as f64;
        path[i].weight = zero * path[i].weight * (depth - i) as f64 / (depth + 1) as f64;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next = path[depth].weight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next * (depth + 1) as f64 / ((i + 1) as f64 * one);
            next = tmp - path[i].weight * zero * (depth - i) as f64 / (depth + 1) as f64;
        } else {
            path[i].weight = path[i].weight * (depth + 1) as f64 / (zero * (depth - i) as f64);
        }
    }
    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut next = path[depth].weight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next * (depth + 1) as f64 / ((i + 1) as f64 * one);
            total += tmp;
            next = path[i].weight - tmp * zero * (depth - i) as f64 / (depth + 1) as f64;
        } else {
            total += path[i].weight / zero / ((depth - i) as f64 / (depth + 1) as f64);
        }
    }
    total
}

fn tree_shap(
    node: &Node,
    x: ArrayView1<'_, f64>,
    phi: &mut [f64],
    mut path: Vec<PathElement>,
    zero: f64,
    one: f64,
    feature: Option<usize>,
) {
    extend_path(&mut path, zero, one, feature);

    match node {
        Node::Leaf { value, .. } => {
            for i in 1..path.len() {
                let w = unwound_path_sum(&path, i);
                let element = path[i];
                if let Some(f) = element.feature {
                    phi[f] += w * (element.one_fraction - element.zero_fraction) * value;
                }
            }
        }
        Node::Split {
            feature: split,
            threshold,
            cover,
            left,
            right,
            ..
        } => {
            let (hot, cold) = if goes_left(x[*split], *threshold) {
                (left, right)
            } else {
                (right, left)
            };
            let hot_zero = if *cover > 0.0 { hot.cover() / cover } else { 0.0 };
            let cold_zero = if *cover > 0.0 { cold.cover() / cover } else { 0.0 };

            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = path.iter().position(|e| e.feature == Some(*split)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            tree_shap(
                hot,
                x,
                phi,
                path.clone(),
                hot_zero * incoming_zero,
                incoming_one,
                Some(*split),
            );
            tree_shap(
                cold,
                x,
                phi,
                path,
                cold_zero * incoming_zero,
                0.0,
                Some(*split),
            );
        }
    }
}
