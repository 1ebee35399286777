//! Симплекс-метод Нелдера-Мида для подбора параметров SARIMAX

#[derive(Debug, Clone)]
pub struct NelderMead {
    max_iterations: usize,
    tolerance: f64,
    initial_step: f64,
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl NelderMead {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            initial_step: 0.1,
        }
    }

    pub fn with_initial_step(mut self, step: f64) -> Self {
        self.initial_step = step;
        self
    }

    /// Минимизация `objective` из точки `start`. Нечисловые значения считаются +inf.
    pub fn minimize<F>(&self, start: &[f64], mut objective: F) -> Minimum
    where
        F: FnMut(&[f64]) -> f64,
    {
        let n = start.len();
        let mut eval = |x: &[f64]| {
            let v = objective(x);
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        if n == 0 {
            let value = eval(start);
            return Minimum {
                point: Vec::new(),
                value,
                iterations: 0,
                converged: true,
            };
        }

        // Начальный симплекс
        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(start.to_vec());
        for i in 0..n {
            let mut vertex = start.to_vec();
            let step = if vertex[i].abs() > 1e-8 {
                self.initial_step * vertex[i].abs().max(1.0)
            } else {
                self.initial_step
            };
            vertex[i] += step;
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

        let (alpha, gamma, rho, sigma) = (1.0, 2.0, 0.5, 0.5);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;

            let mut order: Vec<usize> = (0..=n).collect();
            order.sort_by(|&a, &b| {
                values[a]
                    .partial_cmp(&values[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            simplex = order.iter().map(|&i| simplex[i].clone()).collect();
            values = order.iter().map(|&i| values[i]).collect();

            let best = values[0];
            let worst = values[n];
            if worst.is_finite() && (worst - best).abs() <= self.tolerance * (1.0 + best.abs()) {
                converged = true;
                break;
            }

            // Центр тяжести без худшей вершины
            let mut centroid = vec![0.0; n];
            for vertex in simplex.iter().take(n) {
                for (c, v) in centroid.iter_mut().zip(vertex) {
                    *c += v / n as f64;
                }
            }

            let towards = |coef: f64, target: &[f64]| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(target)
                    .map(|(c, t)| c + coef * (t - c))
                    .collect()
            };

            let reflected = towards(-alpha, &simplex[n]);
            let f_reflected = eval(&reflected);

            if f_reflected < values[0] {
                let expanded = towards(-gamma, &simplex[n]);
                let f_expanded = eval(&expanded);
                if f_expanded < f_reflected {
                    simplex[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    simplex[n] = reflected;
                    values[n] = f_reflected;
                }
                continue;
            }

            if f_reflected < values[n - 1] {
                simplex[n] = reflected;
                values[n] = f_reflected;
                continue;
            }

            let contracted = if f_reflected < values[n] {
                towards(-rho, &simplex[n])
            } else {
                towards(rho, &simplex[n])
            };
            let f_contracted = eval(&contracted);
            if f_contracted < values[n].min(f_reflected) {
                simplex[n] = contracted;
                values[n] = f_contracted;
                continue;
            }

            // Сжатие к лучшей вершине
            let best_vertex = simplex[0].clone();
            for i in 1..=n {
                for (x, b) in simplex[i].iter_mut().zip(&best_vertex) {
                    *x = b + sigma * (*x - b);
                }
                values[i] = eval(&simplex[i]);
            }
        }

        let best = (0..=n)
            .min_by(|&a, &b| {
                values[a]
                    .partial_cmp(&values[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0);

        Minimum {
            point: simplex[best].clone(),
            value: values[best],
            iterations,
            converged,
        }
    }
}

impl Default for NelderMead {
    fn default() -> Self {
        Self::new(5000, 1e-10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_quadratic_minimum() {
        let result = NelderMead::default().minimize(&[0.0, 0.0], |x| {
            (x[0] - 1.5).powi(2) + 2.0 * (x[1] + 0.5).powi(2)
        });
        assert!(result.converged);
        assert!((result.point[0] - 1.5).abs() < 1e-3);
        assert!((result.point[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn rosenbrock_is_solved() {
        let result = NelderMead::new(20_000, 1e-14).minimize(&[-1.2, 1.0], |x| {
            100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2)
        });
        assert!((result.point[0] - 1.0).abs() < 1e-2);
        assert!((result.point[1] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn non_finite_values_are_avoided() {
        let result = NelderMead::default().minimize(&[0.5], |x| {
            if x[0] < 0.0 {
                f64::NAN
            } else {
                (x[0] - 0.2).powi(2)
            }
        });
        assert!((result.point[0] - 0.2).abs() < 1e-3);
    }
}
