//! Derivative-free minimisation used to estimate model coefficients.

use std::cmp::Ordering;

/// Outcome of a Nelder-Mead run.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best point found.
    pub optimal_point: Vec<f64>,
    /// Objective value at `optimal_point`.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether a stopping tolerance was reached before `max_iter`.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Stop once the spread of objective values (or of the vertices) drops below this.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrink coefficient.
    pub sigma: f64,
    /// Relative size of the initial simplex.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

/// Box constraints, one `(min, max)` pair per dimension.
type Bounds<'a> = Option<&'a [(f64, f64)]>;

struct Simplex<'a, F> {
    objective: F,
    bounds: Bounds<'a>,
    vertices: Vec<Vec<f64>>,
    values: Vec<f64>,
}

impl<'a, F> Simplex<'a, F>
where
    F: Fn(&[f64]) -> f64,
{
    fn new(objective: F, initial: &[f64], bounds: Bounds<'a>, step: f64) -> Self {
        let start = clamp(initial.to_vec(), bounds);
        let mut vertices = vec![start.clone()];
        for i in 0..start.len() {
            let mut vertex = start.clone();
            vertex[i] += if start[i].abs() > 1e-10 {
                step * start[i].abs()
            } else {
                step
            };
            vertices.push(clamp(vertex, bounds));
        }
        let values = vertices.iter().map(|v| objective(v)).collect();
        Self {
            objective,
            bounds,
            vertices,
            values,
        }
    }

    fn eval(&self, point: Vec<f64>) -> (Vec<f64>, f64) {
        let point = clamp(point, self.bounds);
        let value = (self.objective)(&point);
        (point, value)
    }

    fn replace(&mut self, idx: usize, (point, value): (Vec<f64>, f64)) {
        self.vertices[idx] = point;
        self.values[idx] = value;
    }

    /// Vertex indices from best to worst.
    fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| cmp_f64(self.values[a], self.values[b]));
        order
    }

    fn centroid_without(&self, skip: usize) -> Vec<f64> {
        let dim = self.vertices[0].len();
        let mut centroid = vec![0.0; dim];
        for (_, vertex) in self.vertices.iter().enumerate().filter(|(i, _)| *i != skip) {
            for (c, x) in centroid.iter_mut().zip(vertex) {
                *c += x;
            }
        }
        let count = (self.vertices.len() - 1) as f64;
        centroid.iter_mut().for_each(|c| *c /= count);
        centroid
    }

    fn shrink_towards(&mut self, best: usize, sigma: f64) {
        let anchor = self.vertices[best].clone();
        for idx in 0..self.vertices.len() {
            if idx == best {
                continue;
            }
            let moved = lerp(&anchor, &self.vertices[idx], sigma);
            let evaluated = self.eval(moved);
            self.replace(idx, evaluated);
        }
    }

    fn best(self) -> (Vec<f64>, f64) {
        let idx = self
            .values
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| cmp_f64(**a, **b))
            .map(|(i, _)| i)
            .unwrap_or(0);
        (self.vertices[idx].clone(), self.values[idx])
    }
}

/// Minimise `objective` starting from `initial`.
///
/// # Example
/// ```
/// use seasonality_index::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// assert!((result.optimal_point[1] + 1.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    if initial.is_empty() {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let mut simplex = Simplex::new(objective, initial, bounds, config.initial_step);
    let last = initial.len();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let order = simplex.ranking();
        let (best, second_worst, worst) = (order[0], order[last - 1], order[last]);

        if simplex.values[worst] - simplex.values[best] < config.tolerance {
            converged = true;
            break;
        }

        let centroid = simplex.centroid_without(worst);
        let spread = simplex
            .vertices
            .iter()
            .map(|v| distance(v, &centroid))
            .fold(0.0, f64::max);
        if spread < config.tolerance {
            converged = true;
            break;
        }

        let reflected = simplex.eval(lerp(&centroid, &simplex.vertices[worst], -config.alpha));

        if reflected.1 < simplex.values[best] {
            let expanded = simplex.eval(lerp(&centroid, &reflected.0, config.gamma));
            if expanded.1 < reflected.1 {
                simplex.replace(worst, expanded);
            } else {
                simplex.replace(worst, reflected);
            }
            continue;
        }

        if reflected.1 < simplex.values[second_worst] {
            simplex.replace(worst, reflected);
            continue;
        }

        let contracted = if reflected.1 < simplex.values[worst] {
            let outside = simplex.eval(lerp(&centroid, &reflected.0, config.rho));
            (outside.1 <= reflected.1).then_some(outside)
        } else {
            let inside = simplex.eval(lerp(&centroid, &simplex.vertices[worst], config.rho));
            (inside.1 < simplex.values[worst]).then_some(inside)
        };

        match contracted {
            Some(point) => simplex.replace(worst, point),
            None => simplex.shrink_towards(best, config.sigma),
        }
    }

    let (optimal_point, optimal_value) = simplex.best();
    NelderMeadResult {
        optimal_point,
        optimal_value,
        iterations,
        converged,
    }
}

/// `from + t * (to - from)`; negative `t` reflects `to` through `from`.
fn lerp(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + t * (b - a)).collect()
}

fn clamp(mut point: Vec<f64>, bounds: Bounds<'_>) -> Vec<f64> {
    if let Some(bounds) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(bounds) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
