//! Линейная регрессия для начальных коэффициентов экзогенных регрессоров

#![allow(non_snake_case)]

use linfa::traits::Fit;
use linfa::Dataset;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};

use crate::error::{ForecastError, Result};

/// МНК без свободного члена через linfa; при вырожденной матрице используется Ridge
pub fn least_squares(X: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
    if X.nrows() != y.len() {
        return Err(ForecastError::InvalidData(format!(
            "design has {} rows, target has {}",
            X.nrows(),
            y.len()
        )));
    }
    if X.ncols() == 0 {
        return Ok(Array1::zeros(0));
    }

    if X.nrows() > X.ncols() {
        let dataset = Dataset::new(X.clone(), y.clone());
        match LinearRegression::new().with_intercept(false).fit(&dataset) {
            Ok(fitted) if fitted.params().iter().all(|p| p.is_finite()) => {
                return Ok(fitted.params().clone());
            }
            Ok(_) => tracing::warn!("OLS produced non-finite coefficients, using ridge"),
            Err(e) => tracing::warn!("OLS failed ({}), using ridge", e),
        }
    }

    ridge(X, y, 1e-3)
}

/// Ridge Regression: (X^T X + αI)^(-1) X^T y
pub fn ridge(X: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Array1<f64>> {
    let n_features = X.ncols();
    let mut xtx = X.t().dot(X);
    for i in 0..n_features {
        xtx[[i, i]] += alpha;
    }
    let xty = X.t().dot(y);
    solve_linear_system(&xtx, &xty)
}

/// Метод Гаусса с выбором главного элемента
pub fn solve_linear_system(A: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = A.nrows();
    if A.ncols() != n || b.len() != n {
        return Err(ForecastError::InvalidData(
            "linear system must be square".to_string(),
        ));
    }

    let mut augmented = Array2::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            augmented[[i, j]] = A[[i, j]];
        }
        augmented[[i, n]] = b[i];
    }

    // Прямой ход
    for i in 0..n {
        let mut max_row = i;
        let mut max_val = augmented[[i, i]].abs();
        for k in (i + 1)..n {
            if augmented[[k, i]].abs() > max_val {
                max_val = augmented[[k, i]].abs();
                max_row = k;
            }
        }

        if max_row != i {
            for j in 0..=n {
                augmented.swap([i, j], [max_row, j]);
            }
        }

        let pivot = augmented[[i, i]];
        if pivot.abs() < 1e-12 {
            return Err(ForecastError::Fit("singular matrix".to_string()));
        }

        for k in (i + 1)..n {
            let factor = augmented[[k, i]] / pivot;
            for j in i..=n {
                augmented[[k, j]] -= factor * augmented[[i, j]];
            }
        }
    }

    // Обратный ход
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = augmented[[i, n]];
        for j in (i + 1)..n {
            sum -= augmented[[i, j]] * x[j];
        }
        x[i] = sum / augmented[[i, i]];
    }

    Ok(x)
}
