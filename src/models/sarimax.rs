//! SARIMAX: регрессия с ошибками сезонной ARIMA
//!
//! Модель `y_t = x_t'β + u_t`, где `u_t` следует мультипликативной
//! SARIMA(p,d,q)(P,D,Q,s). Свободного члена нет. Параметры оцениваются
//! методом условной суммы квадратов (CSS) на дифференцированном ряде,
//! минимизация выполняется симплекс-методом без ограничений на
//! стационарность и обратимость.

#![allow(non_snake_case)]

use std::fmt;

use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::models::linalg::least_squares;
use crate::models::optimizer::NelderMead;
use crate::preprocessing::DataNormalizer;

/// Квантиль нормального распределения для 95% интервала
const Z_95: f64 = 1.959_963_984_540_054;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarimaxOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_d: usize,
    pub seasonal_q: usize,
    pub period: usize,
}

impl SarimaxOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            seasonal_p: 0,
            seasonal_d: 0,
            seasonal_q: 0,
            period: 0,
        }
    }

    pub fn with_seasonal(mut self, p: usize, d: usize, q: usize, period: usize) -> Self {
        self.seasonal_p = p;
        self.seasonal_d = d;
        self.seasonal_q = q;
        self.period = period;
        self
    }

    pub fn is_seasonal(&self) -> bool {
        self.seasonal_p + self.seasonal_d + self.seasonal_q > 0
    }

    /// Число наблюдений, теряемых при дифференцировании
    pub fn differencing_loss(&self) -> usize {
        self.d + self.seasonal_d * self.period
    }

    fn arma_params(&self) -> usize {
        self.p + self.seasonal_p + self.q + self.seasonal_q
    }

    fn validate(&self) -> Result<()> {
        if self.is_seasonal() && self.period < 2 {
            return Err(ForecastError::InvalidData(format!(
                "{}: seasonal terms need a period of at least 2",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SarimaxOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SARIMAX({},{},{})", self.p, self.d, self.q)?;
        if self.is_seasonal() {
            write!(
                f,
                "({},{},{},{})",
                self.seasonal_p, self.seasonal_d, self.seasonal_q, self.period
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Sarimax {
    order: SarimaxOrder,
    optimizer: NelderMead,
}

impl Sarimax {
    pub fn new(order: SarimaxOrder) -> Self {
        Self {
            order,
            optimizer: NelderMead::default(),
        }
    }

    pub fn with_optimizer(mut self, optimizer: NelderMead) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn order(&self) -> SarimaxOrder {
        self.order
    }

    /// Оценка модели. `exog` может не иметь колонок.
    pub fn fit(&self, y: &[f64], exog: &Array2<f64>) -> Result<FittedSarimax> {
        let order = self.order;
        order.validate()?;

        let n = y.len();
        if exog.nrows() != n {
            return Err(ForecastError::InvalidData(format!(
                "endog has {} observations, exog has {} rows",
                n,
                exog.nrows()
            )));
        }
        if y.iter().chain(exog.iter()).any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidData(
                "SARIMAX input contains missing or non-finite values".to_string(),
            ));
        }

        let loss = order.differencing_loss();
        let (ar_len, _) = lag_lengths(&order);
        let needed = loss + ar_len + 2;
        if n < needed {
            return Err(ForecastError::InsufficientData { needed, got: n });
        }

        let diff_poly = differencing_polynomial(&order);
        let dy = apply_filter(y, &diff_poly);
        let dx = difference_columns(exog, &diff_poly);

        let k = exog.ncols();
        let mut normalizer = DataNormalizer::scale_only();
        let xs = if k > 0 {
            normalizer.fit_transform(&dx)?
        } else {
            dx.clone()
        };
        let dy_arr = Array1::from(dy.clone());
        let beta0 = least_squares(&xs, &dy_arr)?;

        let n_arma = order.arma_params();
        let mut start = vec![0.0; n_arma];
        start.extend(beta0.iter());

        let objective = |params: &[f64]| -> f64 {
            let (ar, ma) = polynomials(&order, &params[..n_arma]);
            let beta = &params[n_arma..];
            let w = regression_errors(&dy, &xs, beta);
            conditional_sum_of_squares(&w, &ar, &ma)
        };

        let minimum = self.optimizer.minimize(&start, objective);
        if !minimum.value.is_finite() {
            return Err(ForecastError::Fit(format!(
                "{}: conditional sum of squares did not converge to a finite value",
                order
            )));
        }
        if !minimum.converged {
            tracing::warn!(
                "{}: optimizer stopped after {} iterations without convergence",
                order,
                minimum.iterations
            );
        }

        let params = minimum.point;
        let beta_scaled = Array1::from(params[n_arma..].to_vec());
        let beta = if k > 0 {
            normalizer.unscale_coefficients(&beta_scaled)?
        } else {
            beta_scaled
        };

        let mut offset = 0;
        let mut take = |len: usize| {
            let slice = params[offset..offset + len].to_vec();
            offset += len;
            slice
        };
        let ar = take(order.p);
        let seasonal_ar = take(order.seasonal_p);
        let ma = take(order.q);
        let seasonal_ma = take(order.seasonal_q);

        let mut fitted = FittedSarimax {
            order,
            ar,
            seasonal_ar,
            ma,
            seasonal_ma,
            beta: beta.to_vec(),
            sigma2: 0.0,
            css: minimum.value,
            converged: minimum.converged,
            iterations: minimum.iterations,
            endog: y.to_vec(),
            exog: exog.clone(),
            innovations: Vec::new(),
        };

        let (ar_poly, ma_poly) = fitted.polynomials();
        let w = regression_errors(&dy, &dx, &fitted.beta);
        fitted.innovations = arma_residuals(&w, &ar_poly, &ma_poly);
        let effective = (w.len() - ar_poly.len().saturating_sub(1)).max(1);
        fitted.sigma2 = minimum.value / effective as f64;

        tracing::debug!(
            "{} fitted: css={:.4}, sigma2={:.4}, iterations={}",
            order,
            fitted.css,
            fitted.sigma2,
            fitted.iterations
        );
        Ok(fitted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarimaxForecast {
    pub mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl SarimaxForecast {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn average(&self) -> f64 {
        if self.mean.is_empty() {
            return 0.0;
        }
        self.mean.iter().sum::<f64>() / self.mean.len() as f64
    }

    pub fn mean_interval_width(&self) -> f64 {
        if self.mean.is_empty() {
            return 0.0;
        }
        self.upper
            .iter()
            .zip(&self.lower)
            .map(|(u, l)| u - l)
            .sum::<f64>()
            / self.mean.len() as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedSarimax {
    order: SarimaxOrder,
    ar: Vec<f64>,
    seasonal_ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ma: Vec<f64>,
    beta: Vec<f64>,
    sigma2: f64,
    css: f64,
    converged: bool,
    iterations: usize,
    endog: Vec<f64>,
    exog: Array2<f64>,
    /// Инновации на дифференцированной шкале
    innovations: Vec<f64>,
}

impl FittedSarimax {
    pub fn order(&self) -> SarimaxOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        &self.seasonal_ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        &self.seasonal_ma
    }

    pub fn exog_coefficients(&self) -> &[f64] {
        &self.beta
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn nobs(&self) -> usize {
        self.endog.len()
    }

    pub fn n_exog(&self) -> usize {
        self.exog.ncols()
    }

    /// AIC по CSS-правдоподобию
    pub fn aic(&self) -> f64 {
        let effective = self.innovations.len().max(1) as f64;
        let k = (self.order.arma_params() + self.beta.len() + 1) as f64;
        effective * (self.css / effective).max(1e-300).ln() + 2.0 * k
    }

    fn polynomials(&self) -> (Vec<f64>, Vec<f64>) {
        let mut params = Vec::with_capacity(self.order.arma_params());
        params.extend(&self.ar);
        params.extend(&self.seasonal_ar);
        params.extend(&self.ma);
        params.extend(&self.seasonal_ma);
        polynomials(&self.order, &params)
    }

    /// Одношаговые прогнозы внутри выборки на исходной шкале
    pub fn predict_in_sample(&self) -> Vec<f64> {
        let loss = self.order.differencing_loss();
        let y = &self.endog;
        (0..y.len())
            .map(|t| {
                if t >= loss {
                    y[t] - self.innovations[t - loss]
                } else if t > 0 {
                    y[t - 1]
                } else {
                    y[0]
                }
            })
            .collect()
    }

    /// Фактическое значение минус прогноз внутри выборки
    pub fn residuals(&self) -> Vec<f64> {
        self.endog
            .iter()
            .zip(self.predict_in_sample())
            .map(|(y, p)| y - p)
            .collect()
    }

    /// Прогноз на `steps` шагов от конца выборки
    pub fn forecast(&self, steps: usize, future_exog: &Array2<f64>) -> Result<SarimaxForecast> {
        let k = self.exog.ncols();
        if future_exog.nrows() != steps || future_exog.ncols() != k {
            return Err(ForecastError::InvalidData(format!(
                "future exog must be {}x{}, got {:?}",
                steps,
                k,
                future_exog.dim()
            )));
        }
        if future_exog.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidData(
                "future exog contains missing values".to_string(),
            ));
        }
        if steps == 0 {
            return Ok(SarimaxForecast {
                mean: Vec::new(),
                lower: Vec::new(),
                upper: Vec::new(),
            });
        }

        let diff_poly = differencing_polynomial(&self.order);
        let (ar_poly, ma_poly) = self.polynomials();

        let all_exog = concatenate(Axis(0), &[self.exog.view(), future_exog.view()])
            .map_err(|e| ForecastError::InvalidData(e.to_string()))?;
        let dx = difference_columns(&all_exog, &diff_poly);
        let beta = Array1::from(self.beta.clone());
        let regression: Array1<f64> = if k > 0 {
            dx.dot(&beta)
        } else {
            Array1::zeros(dx.nrows())
        };

        let dy = apply_filter(&self.endog, &diff_poly);
        let m = dy.len();
        let mut w: Vec<f64> = (0..m).map(|i| dy[i] - regression[i]).collect();
        let mut e = self.innovations.clone();
        let mut y = self.endog.clone();
        let n = y.len();

        let mut mean = Vec::with_capacity(steps);
        for h in 0..steps {
            let i = m + h;
            let mut wi = 0.0;
            for (lag, a) in ar_poly.iter().enumerate().skip(1) {
                if i >= lag {
                    wi -= a * w[i - lag];
                }
            }
            for (lag, b) in ma_poly.iter().enumerate().skip(1) {
                if i >= lag {
                    wi += b * e[i - lag];
                }
            }
            w.push(wi);
            e.push(0.0);

            let dy_next = regression[i] + wi;
            let t = n + h;
            let mut level = dy_next;
            for (lag, c) in diff_poly.iter().enumerate().skip(1) {
                if t >= lag {
                    level -= c * y[t - lag];
                }
            }
            y.push(level);
            mean.push(level);
        }

        // Psi-веса полной (интегрированной) модели
        let full_ar = poly_mul(&ar_poly, &diff_poly);
        let psi = psi_weights(&full_ar, &ma_poly, steps);
        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(steps);
        let mut upper = Vec::with_capacity(steps);
        for (h, value) in mean.iter().enumerate() {
            cumulative += psi[h] * psi[h];
            let half = Z_95 * (self.sigma2 * cumulative).sqrt();
            lower.push(value - half);
            upper.push(value + half);
        }

        Ok(SarimaxForecast { mean, lower, upper })
    }
}

fn lag_lengths(order: &SarimaxOrder) -> (usize, usize) {
    (
        order.p + order.seasonal_p * order.period,
        order.q + order.seasonal_q * order.period,
    )
}

pub(crate) fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// (1 - B)^d (1 - B^s)^D
fn differencing_polynomial(order: &SarimaxOrder) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..order.d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    if order.period > 0 {
        let mut seasonal = vec![0.0; order.period + 1];
        seasonal[0] = 1.0;
        seasonal[order.period] = -1.0;
        for _ in 0..order.seasonal_d {
            poly = poly_mul(&poly, &seasonal);
        }
    }
    poly
}

/// Полиномы AR `[1, -φ...]` и MA `[1, θ...]` с учётом сезонных множителей
fn polynomials(order: &SarimaxOrder, params: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let (p, sp, q, sq) = (order.p, order.seasonal_p, order.q, order.seasonal_q);
    let s = order.period;

    let mut ar = vec![1.0];
    ar.extend(params[..p].iter().map(|v| -v));
    let mut sar = vec![0.0; sp * s + 1];
    sar[0] = 1.0;
    for (j, v) in params[p..p + sp].iter().enumerate() {
        sar[(j + 1) * s] = -v;
    }

    let mut ma = vec![1.0];
    ma.extend(params[p + sp..p + sp + q].iter().copied());
    let mut sma = vec![0.0; sq * s + 1];
    sma[0] = 1.0;
    for (j, v) in params[p + sp + q..p + sp + q + sq].iter().enumerate() {
        sma[(j + 1) * s] = *v;
    }

    (poly_mul(&ar, &sar), poly_mul(&ma, &sma))
}

/// Свёртка ряда с фильтром дифференцирования; длина уменьшается на степень фильтра
fn apply_filter(y: &[f64], filter: &[f64]) -> Vec<f64> {
    let loss = filter.len().saturating_sub(1);
    (loss..y.len())
        .map(|t| {
            filter
                .iter()
                .enumerate()
                .map(|(k, c)| c * y[t - k])
                .sum()
        })
        .collect()
}

fn difference_columns(x: &Array2<f64>, filter: &[f64]) -> Array2<f64> {
    let loss = filter.len().saturating_sub(1);
    let rows = x.nrows().saturating_sub(loss);
    let mut out = Array2::zeros((rows, x.ncols()));
    for (j, column) in x.columns().into_iter().enumerate() {
        let values = column.to_vec();
        for (i, v) in apply_filter(&values, filter).into_iter().enumerate() {
            out[[i, j]] = v;
        }
    }
    out
}

fn regression_errors(dy: &[f64], X: &Array2<f64>, beta: &[f64]) -> Vec<f64> {
    dy.iter()
        .enumerate()
        .map(|(i, v)| {
            let fitted: f64 = X
                .row(i)
                .iter()
                .zip(beta)
                .map(|(x, b)| x * b)
                .sum();
            v - fitted
        })
        .collect()
}

/// Инновации ARMA при нулевых довыборочных значениях
fn arma_residuals(w: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut e = vec![0.0; w.len()];
    for t in 0..w.len() {
        let mut value = 0.0;
        for (lag, a) in ar.iter().enumerate() {
            if t >= lag {
                value += a * w[t - lag];
            }
        }
        for (lag, b) in ma.iter().enumerate().skip(1) {
            if t >= lag {
                value -= b * e[t - lag];
            }
        }
        e[t] = value;
    }
    e
}

fn conditional_sum_of_squares(w: &[f64], ar: &[f64], ma: &[f64]) -> f64 {
    let start = ar.len().saturating_sub(1);
    let e = arma_residuals(w, ar, ma);
    let css: f64 = e[start.min(e.len())..].iter().map(|v| v * v).sum();
    if css.is_finite() {
        css
    } else {
        f64::INFINITY
    }
}

fn psi_weights(ar: &[f64], ma: &[f64], count: usize) -> Vec<f64> {
    let mut psi = vec![0.0; count];
    for j in 0..count {
        let mut value = if j == 0 {
            1.0
        } else {
            ma.get(j).copied().unwrap_or(0.0)
        };
        for k in 1..=j {
            if let Some(a) = ar.get(k) {
                value -= a * psi[j - k];
            }
        }
        psi[j] = value;
    }
    psi
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    fn no_exog(n: usize) -> Array2<f64> {
        Array2::zeros((n, 0))
    }

    #[test]
    fn differencing_polynomial_combines_seasonal_factor() {
        let order = SarimaxOrder::new(0, 1, 0).with_seasonal(0, 1, 0, 4);
        assert_eq!(
            differencing_polynomial(&order),
            vec![1.0, -1.0, 0.0, 0.0, -1.0, 1.0]
        );
        assert_eq!(order.differencing_loss(), 5);
        assert_eq!(order.to_string(), "SARIMAX(0,1,0)(0,1,0,4)");
    }

    #[test]
    fn recovers_ar1_coefficient() {
        let e = noise(400, 7);
        let mut y = vec![0.0; 400];
        for t in 1..400 {
            y[t] = 0.6 * y[t - 1] + e[t];
        }
        let fitted = Sarimax::new(SarimaxOrder::new(1, 0, 0))
            .fit(&y, &no_exog(400))
            .unwrap();
        let phi = fitted.ar_coefficients()[0];
        assert!((phi - 0.6).abs() < 0.15, "phi = {}", phi);
        assert!(fitted.sigma2() > 0.0);
    }

    #[test]
    fn recovers_exogenous_coefficient_after_differencing() {
        let shocks = noise(200, 11);
        let jitter = noise(200, 3);
        let mut x = vec![0.0; 200];
        for t in 1..200 {
            x[t] = x[t - 1] + shocks[t];
        }
        let y: Vec<f64> = (0..200).map(|t| 3.0 + 2.0 * x[t] + 0.05 * jitter[t]).collect();
        let exog = Array2::from_shape_vec((200, 1), x).unwrap();

        let fitted = Sarimax::new(SarimaxOrder::new(0, 1, 0)).fit(&y, &exog).unwrap();
        assert!((fitted.exog_coefficients()[0] - 2.0).abs() < 0.05);
    }

    #[test]
    fn seasonal_pattern_is_continued_exactly() {
        let season = [1.0, -2.0, 0.5, 3.0];
        let y: Vec<f64> = (0..24).map(|t| t as f64 + season[t % 4]).collect();
        let order = SarimaxOrder::new(0, 1, 0).with_seasonal(0, 1, 0, 4);
        let fitted = Sarimax::new(order).fit(&y, &no_exog(24)).unwrap();

        let forecast = fitted.forecast(4, &no_exog(4)).unwrap();
        for (h, value) in forecast.mean.iter().enumerate() {
            let t = 24 + h;
            assert!((value - (t as f64 + season[t % 4])).abs() < 1e-9);
        }
    }

    #[test]
    fn random_walk_intervals_widen() {
        let steps = noise(120, 5);
        let mut y = vec![10.0; 120];
        for t in 1..120 {
            y[t] = y[t - 1] + steps[t];
        }
        let fitted = Sarimax::new(SarimaxOrder::new(0, 1, 0))
            .fit(&y, &no_exog(120))
            .unwrap();
        let forecast = fitted.forecast(5, &no_exog(5)).unwrap();

        for value in &forecast.mean {
            assert!((value - y[119]).abs() < 1e-9);
        }
        let widths: Vec<f64> = forecast
            .upper
            .iter()
            .zip(&forecast.lower)
            .map(|(u, l)| u - l)
            .collect();
        assert!(widths.windows(2).all(|w| w[1] > w[0]));
        assert!((widths[3] / widths[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn in_sample_predictions_cover_every_observation() {
        let y: Vec<f64> = (0..30).map(|t| (t as f64 * 0.7).sin() * 3.0 + 5.0).collect();
        let fitted = Sarimax::new(SarimaxOrder::new(1, 1, 1))
            .fit(&y, &no_exog(30))
            .unwrap();
        let predictions = fitted.predict_in_sample();
        assert_eq!(predictions.len(), 30);
        assert_eq!(predictions[0], y[0]);
        let residuals = fitted.residuals();
        assert_eq!(residuals[0], 0.0);
        assert!(residuals.iter().all(|r| r.is_finite()));
    }

    #[test]
    fn rejects_short_or_mismatched_input() {
        let model = Sarimax::new(SarimaxOrder::new(1, 1, 1));
        assert!(matches!(
            model.fit(&[1.0, 2.0], &no_exog(2)),
            Err(ForecastError::InsufficientData { .. })
        ));
        assert!(model.fit(&[1.0; 10], &no_exog(9)).is_err());
        assert!(model.fit(&[1.0, f64::NAN, 2.0, 3.0, 4.0], &no_exog(5)).is_err());
    }

    #[test]
    fn forecast_validates_exog_shape() {
        let y: Vec<f64> = (0..20).map(|t| t as f64).collect();
        let exog = Array2::from_shape_fn((20, 1), |(i, _)| (i as f64).cos());
        let fitted = Sarimax::new(SarimaxOrder::new(0, 1, 0)).fit(&y, &exog).unwrap();
        assert!(fitted.forecast(3, &Array2::zeros((2, 1))).is_err());
        assert_eq!(fitted.forecast(3, &Array2::zeros((3, 1))).unwrap().len(), 3);
    }
}
