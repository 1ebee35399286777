/// Отраслевой анализ по штатам

pub mod agriculture;
pub mod it_sector;

pub use agriculture::{AgricultureAnalyzer, AgricultureReport, CropAssessment};
pub use it_sector::{ItSectorAnalyzer, ItSectorReport, StateProjection};

use std::collections::HashMap;

/// Среднее без учёта пропусков; `NaN`, если значений нет
pub fn nan_mean(values: &[f64]) -> f64 {
    let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return f64::NAN;
    }
    valid.iter().sum::<f64>() / valid.len() as f64
}

/// Стандартное отклонение без учёта пропусков (`ddof` = 1 выборочное, 0 генеральное)
pub fn nan_std(values: &[f64], ddof: usize) -> f64 {
    let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.len() <= ddof {
        return f64::NAN;
    }
    let mean = valid.iter().sum::<f64>() / valid.len() as f64;
    let ss: f64 = valid.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (valid.len() - ddof) as f64).sqrt()
}

/// Ранги по убыванию, одинаковым значениям достаётся средний ранг
pub fn rank_descending(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // позиции start..end получают среднее из рангов start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// Наиболее частое значение; при равенстве выбирается меньшее лексикографически
pub fn mode<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, _)| value.to_string())
}

/// Уникальные значения в порядке первого появления
pub fn unique_in_order<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = Vec::new();
    for value in values {
        if !seen.iter().any(|s: &String| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
