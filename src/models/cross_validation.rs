//! Разбиение временного ряда на последовательные фолды

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Обучение всегда на прошлом, проверка на следующем отрезке
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesSplit {
    n_splits: usize,
}

impl TimeSeriesSplit {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>> {
        if self.n_splits == 0 {
            return Err(ForecastError::InvalidData(
                "number of splits must be positive".to_string(),
            ));
        }
        let n_folds = self.n_splits + 1;
        if n_folds > n_samples {
            return Err(ForecastError::InsufficientData {
                needed: n_folds,
                got: n_samples,
            });
        }

        let test_size = n_samples / n_folds;
        let first_start = n_samples - self.n_splits * test_size;

        Ok((0..self.n_splits)
            .map(|i| {
                let start = first_start + i * test_size;
                Fold {
                    train: 0..start,
                    test: start..start + test_size,
                }
            })
            .collect())
    }
}

impl Default for TimeSeriesSplit {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_match_expanding_window() {
        let folds = TimeSeriesSplit::new(3).split(10).unwrap();
        assert_eq!(
            folds,
            vec![
                Fold { train: 0..4, test: 4..6 },
                Fold { train: 0..6, test: 6..8 },
                Fold { train: 0..8, test: 8..10 },
            ]
        );
    }

    #[test]
    fn remainder_goes_to_first_training_window() {
        let folds = TimeSeriesSplit::new(3).split(45).unwrap();
        assert_eq!(folds[0].train, 0..12);
        assert_eq!(folds[2].test, 34..45);
        assert!(folds.iter().all(|f| f.test.len() == 11));
    }

    #[test]
    fn too_few_samples_is_an_error() {
        assert!(TimeSeriesSplit::new(3).split(3).is_err());
        assert!(TimeSeriesSplit::new(0).split(10).is_err());
    }
}
