//! Linear projection of realized spend for future quarters.
//!
//! Historical records are summed per (year, quarter, category) and an
//! ordinary least-squares model maps
//! `(year, quarter, category_key, budget, remaining)` to realized spend.
//! Each category then gets one synthetic row per target quarter, built from
//! that category's mean historical budget and remaining budget.
//!
//! The reported R² is computed on the training groups themselves. There is
//! no holdout, so it overstates how well the model generalizes.

use crate::aggregate::group_by;
use crate::encoder::CategoryEncoder;
use crate::error::{DashboardError, Result};
use crate::schema::{DashboardConfig, Dataset, Quarter, Record, DEFAULT_ADEQUACY_THRESHOLD};
use log::{debug, info};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FEATURE_NAMES: [&str; 5] = ["year", "quarter", "category_key", "budget", "remaining"];

const PIVOT_TOLERANCE: f64 = 1e-10;

/// Fitted OLS model with intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Fits `y ~ intercept + x * coefficients`.
    ///
    /// Columns are centered and scaled to unit length before solving the
    /// normal equations, so the singularity check works on a unit-diagonal
    /// matrix regardless of the magnitude of the amounts.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let (n_samples, n_features) = x.dim();

        if n_samples != y.len() {
            return Err(DashboardError::ModelFit(format!(
                "{} feature rows but {} targets",
                n_samples,
                y.len()
            )));
        }

        if n_samples < n_features + 1 {
            return Err(DashboardError::ModelFit(format!(
                "need at least {} training groups for {} features, got {}",
                n_features + 1,
                n_features,
                n_samples
            )));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| DashboardError::ModelFit("empty design matrix".to_string()))?;
        let y_mean = y
            .mean()
            .ok_or_else(|| DashboardError::ModelFit("empty target vector".to_string()))?;

        let centered = x - &x_mean;
        let target = y - y_mean;

        let scales = centered.map_axis(Axis(0), |column| column.dot(&column).sqrt());
        for (idx, scale) in scales.iter().enumerate() {
            if *scale <= 1e-12 * (1.0 + x_mean[idx].abs()) {
                return Err(DashboardError::ModelFit(format!(
                    "feature '{}' is constant across all training groups",
                    feature_name(idx)
                )));
            }
        }

        let standardized = &centered / &scales;
        let gram = standardized.t().dot(&standardized);
        let rhs = standardized.t().dot(&target);

        let solution = solve(gram, rhs)?;
        let coefficients = &solution / &scales;
        let intercept = y_mean - x_mean.dot(&coefficients);

        Ok(Self {
            intercept,
            coefficients: coefficients.to_vec(),
        })
    }

    pub fn predict_row(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.outer_iter()
            .map(|row| self.predict_row(&row.to_vec()))
            .collect()
    }

    /// Coefficient of determination on the given data.
    pub fn r_squared(&self, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        let predicted = self.predict(x);
        let y_mean = y.mean().unwrap_or(0.0);

        let ss_res: f64 = y
            .iter()
            .zip(predicted.iter())
            .map(|(actual, fitted)| (actual - fitted).powi(2))
            .sum();
        let ss_tot: f64 = y.iter().map(|actual| (actual - y_mean).powi(2)).sum();

        if ss_tot == 0.0 {
            return if ss_res == 0.0 { 1.0 } else { 0.0 };
        }
        1.0 - ss_res / ss_tot
    }
}

fn feature_name(idx: usize) -> &'static str {
    FEATURE_NAMES.get(idx).copied().unwrap_or("unknown")
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);

        if a[[pivot_row, col]].abs() < PIVOT_TOLERANCE {
            return Err(DashboardError::ModelFit(format!(
                "design matrix is singular: feature '{}' is a linear combination of the others",
                feature_name(col)
            )));
        }

        if pivot_row != col {
            for k in 0..n {
                a.swap([col, k], [pivot_row, k]);
            }
            b.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[[row, k]] * x[k];
        }
        x[row] = acc / a[[row, row]];
    }

    Ok(x)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelAssessment {
    Adequate,
    NeedsImprovement,
}

impl ModelAssessment {
    /// `Adequate` when R² is strictly above the threshold.
    pub fn from_r_squared(r_squared: f64, threshold: f64) -> Self {
        if r_squared > threshold {
            ModelAssessment::Adequate
        } else {
            ModelAssessment::NeedsImprovement
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModelAssessment::Adequate => "Model cukup baik",
            ModelAssessment::NeedsImprovement => "Model perlu ditingkatkan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub year: i32,
    pub quarter: Quarter,
    pub category_key: usize,
    pub category: String,
    pub mean_budget: f64,
    pub mean_remaining: f64,
    pub predicted_realized: f64,
}

impl PredictionRow {
    /// `2025-TW3`
    pub fn label(&self) -> String {
        format!("{}-TW{}", self.year, self.quarter.ordinal())
    }

    fn features(&self) -> [f64; 5] {
        [
            self.year as f64,
            self.quarter.ordinal() as f64,
            self.category_key as f64,
            self.mean_budget,
            self.mean_remaining,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub rows: Vec<PredictionRow>,
    pub model: LinearModel,
    /// In-sample R² over the training groups.
    pub r_squared: f64,
    pub assessment: ModelAssessment,
    pub training_groups: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TrainingKey {
    year: i32,
    quarter: Quarter,
    category_key: usize,
}

#[derive(Debug, Clone)]
pub struct Forecaster {
    year: i32,
    quarters: Vec<Quarter>,
    adequacy_threshold: f64,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::from_config(&DashboardConfig::default())
    }
}

impl Forecaster {
    pub fn new(year: i32, quarters: Vec<Quarter>) -> Self {
        Self {
            year,
            quarters,
            adequacy_threshold: DEFAULT_ADEQUACY_THRESHOLD,
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            year: config.forecast_year,
            quarters: config.forecast_quarters.clone(),
            adequacy_threshold: config.adequacy_threshold,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.adequacy_threshold = threshold;
        self
    }

    pub fn run(&self, dataset: &Dataset) -> Result<Forecast> {
        self.run_with(dataset.records(), dataset.encoder())
    }

    /// `encoder` must be the one that assigned the records' category keys.
    pub fn run_with(&self, records: &[Record], encoder: &CategoryEncoder) -> Result<Forecast> {
        let training = group_by(records, |r| TrainingKey {
            year: r.year,
            quarter: r.quarter,
            category_key: r.category_key,
        });

        let n = training.len();
        let mut x = Array2::<f64>::zeros((n, FEATURE_NAMES.len()));
        let mut y = Array1::<f64>::zeros(n);

        // per category: (budget sum, remaining sum, group count)
        let mut category_stats: BTreeMap<usize, (f64, f64, usize)> = BTreeMap::new();

        for (idx, row) in training.rows().iter().enumerate() {
            x[[idx, 0]] = row.key.year as f64;
            x[[idx, 1]] = row.key.quarter.ordinal() as f64;
            x[[idx, 2]] = row.key.category_key as f64;
            x[[idx, 3]] = row.budget;
            x[[idx, 4]] = row.remaining;
            y[idx] = row.realized;

            let stats = category_stats
                .entry(row.key.category_key)
                .or_insert((0.0, 0.0, 0));
            stats.0 += row.budget;
            stats.1 += row.remaining;
            stats.2 += 1;
        }

        let model = LinearModel::fit(&x, &y)?;
        let r_squared = model.r_squared(&x, &y);
        let assessment = ModelAssessment::from_r_squared(r_squared, self.adequacy_threshold);

        info!(
            "Fitted spend model on {} groups: R² = {:.4} ({:?})",
            n, r_squared, assessment
        );
        debug!(
            "Model intercept {:.4}, coefficients {:?}",
            model.intercept, model.coefficients
        );

        let mut rows = Vec::with_capacity(self.quarters.len() * category_stats.len());
        for &quarter in &self.quarters {
            for (&category_key, &(budget_sum, remaining_sum, groups)) in &category_stats {
                let category = encoder.decode(category_key).ok_or_else(|| {
                    DashboardError::ModelFit(format!(
                        "category key {} is unknown to the session encoder",
                        category_key
                    ))
                })?;

                let mut row = PredictionRow {
                    year: self.year,
                    quarter,
                    category_key,
                    category: category.to_string(),
                    mean_budget: budget_sum / groups as f64,
                    mean_remaining: remaining_sum / groups as f64,
                    predicted_realized: 0.0,
                };
                row.predicted_realized = model.predict_row(&row.features());
                rows.push(row);
            }
        }

        Ok(Forecast {
            rows,
            model,
            r_squared,
            assessment,
            training_groups: n,
        })
    }
}
