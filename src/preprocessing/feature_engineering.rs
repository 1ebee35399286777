//! Feature engineering для модели ВВП

use crate::data::columns::{
    lag1, lag2, ma3, CRISIS_2020, GDP_CHANGE_YOY, GDP_GROWTH, GDP_TREND_ROLLMEAN5,
    MACRO_COLUMNS, POLICY_PUSH_2023, RECOVERY_2021_2022, REFORM_POLICY_BOOST,
};
use crate::data::Frame;
use crate::error::Result;

/// Годы, отмеченные флагом политического импульса
const REFORM_YEARS: [i32; 2] = [2025, 2026];

pub const EVENT_FLAG_COLUMNS: [&str; 3] = [CRISIS_2020, RECOVERY_2021_2022, POLICY_PUSH_2023];

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Лаги, скользящие средние и индикаторы ВВП поверх очищенных данных
    pub fn build_features(cleaned: &Frame) -> Result<Frame> {
        let mut frame = cleaned.clone();
        frame.sort_by_year();

        for column in MACRO_COLUMNS {
            if !frame.has_column(column) {
                continue;
            }
            let values = frame.column_vec(column)?;
            frame.set_column(&lag1(column), shift(&values, 1))?;
            frame.set_column(&lag2(column), shift(&values, 2))?;
            frame.set_column(&ma3(column), rolling_mean(&values, 3))?;
        }

        let gdp = frame.column_vec(GDP_GROWTH)?;
        frame.set_column(GDP_TREND_ROLLMEAN5, rolling_mean(&gdp, 5))?;
        frame.set_column(GDP_CHANGE_YOY, diff(&gdp))?;

        let boost: Vec<f64> = frame
            .years()
            .iter()
            .map(|y| if REFORM_YEARS.contains(y) { 1.0 } else { 0.0 })
            .collect();
        frame.set_column(REFORM_POLICY_BOOST, boost)?;

        // Сначала назад, потом вперёд
        let columns: Vec<String> = frame.columns().to_vec();
        for column in &columns {
            let mut values = frame.column_vec(column)?;
            backward_fill(&mut values);
            forward_fill(&mut values);
            frame.set_column(column, values)?;
        }

        tracing::info!(
            "Feature engineering complete: {} rows, {} columns",
            frame.len(),
            frame.columns().len()
        );
        Ok(frame)
    }

    /// Флаги событий для года: кризис 2020, восстановление 2021-2022, реформы 2023
    pub fn event_flags(year: i32) -> [(&'static str, f64); 3] {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        [
            (CRISIS_2020, flag(year == 2020)),
            (RECOVERY_2021_2022, flag(year == 2021 || year == 2022)),
            (POLICY_PUSH_2023, flag(year == 2023)),
        ]
    }

    pub fn add_event_flags(frame: &mut Frame) -> Result<()> {
        let flags: Vec<[(&'static str, f64); 3]> =
            frame.years().iter().map(|&y| Self::event_flags(y)).collect();
        for (k, name) in EVENT_FLAG_COLUMNS.iter().enumerate() {
            let values = flags.iter().map(|f| f[k].1).collect();
            frame.set_column(name, values)?;
        }
        Ok(())
    }
}

pub fn shift(values: &[f64], periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i >= periods { values[i - periods] } else { f64::NAN })
        .collect()
}

/// Скользящее среднее по окну; NaN, пока окно неполное или содержит пропуск
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return f64::NAN;
            }
            let slice = &values[i + 1 - window..=i];
            if slice.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                slice.iter().sum::<f64>() / window as f64
            }
        })
        .collect()
}

pub fn diff(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i > 0 { values[i] - values[i - 1] } else { f64::NAN })
        .collect()
}

pub fn backward_fill(values: &mut [f64]) {
    let mut next = f64::NAN;
    for value in values.iter_mut().rev() {
        if value.is_nan() {
            *value = next;
        } else {
            next = *value;
        }
    }
}

pub fn forward_fill(values: &mut [f64]) {
    let mut prev = f64::NAN;
    for value in values.iter_mut() {
        if value.is_nan() {
            *value = prev;
        } else {
            prev = *value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn gdp_frame(values: &[f64]) -> Frame {
        let years: Vec<i32> = (0..values.len() as i32).map(|i| 2020 + i).collect();
        let data = Array2::from_shape_vec((values.len(), 1), values.to_vec()).unwrap();
        Frame::new(years, vec![GDP_GROWTH.to_string()], data).unwrap()
    }

    #[test]
    fn lags_and_rolling_means_are_backfilled() {
        let frame = gdp_frame(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let features = FeatureEngineer::build_features(&frame).unwrap();

        assert_eq!(
            features.column_vec(&lag1(GDP_GROWTH)).unwrap(),
            vec![1.0, 1.0, 2.0, 3.0, 4.0, 5.0]
        );
        assert_eq!(
            features.column_vec(&lag2(GDP_GROWTH)).unwrap(),
            vec![1.0, 1.0, 1.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(
            features.column_vec(&ma3(GDP_GROWTH)).unwrap(),
            vec![2.0, 2.0, 2.0, 3.0, 4.0, 5.0]
        );
        assert_eq!(
            features.column_vec(GDP_TREND_ROLLMEAN5).unwrap(),
            vec![3.0, 3.0, 3.0, 3.0, 3.0, 4.0]
        );
        assert_eq!(
            features.column_vec(GDP_CHANGE_YOY).unwrap(),
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn reform_boost_marks_2025_and_2026() {
        let frame = gdp_frame(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let features = FeatureEngineer::build_features(&frame).unwrap();
        let boost = features.column_vec(REFORM_POLICY_BOOST).unwrap();
        assert_eq!(boost, vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn event_flags_follow_the_year() {
        let flags = FeatureEngineer::event_flags(2021);
        assert_eq!(flags[0], (CRISIS_2020, 0.0));
        assert_eq!(flags[1], (RECOVERY_2021_2022, 1.0));
        assert_eq!(flags[2], (POLICY_PUSH_2023, 0.0));

        let mut frame = gdp_frame(&[1.0, 2.0, 3.0, 4.0]);
        FeatureEngineer::add_event_flags(&mut frame).unwrap();
        assert_eq!(
            frame.column_vec(POLICY_PUSH_2023).unwrap(),
            vec![0.0, 0.0, 0.0, 1.0]
        );
    }
}
