//! Baseline citation-growth model.
//!
//! Average citation counts fall with submission year simply because younger
//! papers have had less time to be cited. Fitting a saturating exponential to
//! the year-level averages gives a time-aware baseline, so a record's count can
//! be normalized against papers of the same age instead of the flat batch mean.
//!
//! The fit is nonlinear least squares (Levenberg-Marquardt over the 3x3 normal
//! equations). It is not globally convergent, so the initial guess is a
//! required parameter of [`fit`], never a hidden default.

use crate::error::{Result, TimingError};
use crate::records::EnrichedRecord;
use chrono::NaiveDate;
use nalgebra::{Matrix3, Vector3};
use tracing::debug;

/// Timestamps are scaled to gigaseconds before fitting so the three parameters
/// are of comparable magnitude; `rate` and `shift` are expressed in that unit.
const TIME_SCALE: f64 = 1e9;

/// Iteration budget for the optimizer
const MAX_ITERATIONS: usize = 200;

/// Relative cost-improvement threshold below which the fit counts as converged
const COST_TOLERANCE: f64 = 1e-10;

/// Damping ceiling; past this the optimizer is making no progress at all
const MAX_DAMPING: f64 = 1e12;

/// Fitted curve `f(t) = amplitude * (1 - exp(rate * (t/1e9 - shift)))`
/// with `t` a unix timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthCurve {
    pub amplitude: f64,
    pub rate: f64,
    pub shift: f64,
}

impl GrowthCurve {
    /// Expected citation count for a paper submitted at `timestamp_secs`.
    pub fn eval(&self, timestamp_secs: f64) -> f64 {
        let x = timestamp_secs / TIME_SCALE;
        self.amplitude * (1.0 - (self.rate * (x - self.shift)).exp())
    }

    /// Citation boost against this curve instead of the flat batch mean.
    pub fn boost(&self, timestamp_secs: f64, citation_count: u32) -> f64 {
        100.0 * (f64::from(citation_count) / self.eval(timestamp_secs) - 1.0)
    }
}

/// Fit the curve to `(timestamp_secs, mean_citation_count)` points.
///
/// Returns [`TimingError::NonConvergence`] if the residuals cannot be reduced
/// within the iteration budget. Callers must supply a reasonable `initial`
/// guess; a bad one is allowed to fail loudly rather than fall back to some
/// default curve.
pub fn fit(points: &[(f64, f64)], initial: GrowthCurve) -> Result<GrowthCurve> {
    if points.len() < 3 {
        return Err(TimingError::Config(format!(
            "curve fit needs at least 3 points, got {}",
            points.len()
        )));
    }

    let mut params = Vector3::new(initial.amplitude, initial.rate, initial.shift);
    let mut cost = residual_cost(points, &params);
    let mut damping = 1e-3;

    for iteration in 0..MAX_ITERATIONS {
        let (jtj, jtr) = normal_equations(points, &params);

        let mut damped = jtj;
        for i in 0..3 {
            damped[(i, i)] += damping * jtj[(i, i)].abs().max(1e-12);
        }

        let step = match damped.lu().solve(&(-jtr)) {
            Some(step) => step,
            None => {
                damping *= 10.0;
                if damping > MAX_DAMPING {
                    return Err(TimingError::NonConvergence { iterations: iteration + 1, cost });
                }
                continue;
            }
        };

        let candidate = params + step;
        let new_cost = residual_cost(points, &candidate);

        if new_cost < cost {
            let improvement = cost - new_cost;
            params = candidate;
            cost = new_cost;
            damping = (damping * 0.3).max(1e-12);
            debug!(iteration, cost, "fit step accepted");
            if improvement <= COST_TOLERANCE * (1.0 + cost) {
                return Ok(GrowthCurve {
                    amplitude: params[0],
                    rate: params[1],
                    shift: params[2],
                });
            }
        } else {
            damping *= 10.0;
            if damping > MAX_DAMPING {
                return Err(TimingError::NonConvergence { iterations: iteration + 1, cost });
            }
        }
    }

    Err(TimingError::NonConvergence { iterations: MAX_ITERATIONS, cost })
}

/// One `(timestamp, mean citation count)` point per batch year, anchored at the
/// year's June 30 like the yearly averages it summarizes. Empty batches are
/// skipped.
pub fn yearly_points(batches: &[(i32, Vec<EnrichedRecord>)]) -> Result<Vec<(f64, f64)>> {
    let mut points = Vec::with_capacity(batches.len());
    for (year, records) in batches {
        if records.is_empty() {
            continue;
        }
        let mid_year = NaiveDate::from_ymd_opt(*year, 6, 30)
            .ok_or_else(|| TimingError::Config(format!("invalid year {year}")))?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TimingError::Config("invalid mid-year time".to_string()))?
            .and_utc()
            .timestamp() as f64;
        let mean = records.iter().map(|r| f64::from(r.citation_count)).sum::<f64>()
            / records.len() as f64;
        points.push((mid_year, mean));
    }
    Ok(points)
}

fn model(params: &Vector3<f64>, timestamp_secs: f64) -> f64 {
    let x = timestamp_secs / TIME_SCALE;
    params[0] * (1.0 - (params[1] * (x - params[2])).exp())
}

fn residual_cost(points: &[(f64, f64)], params: &Vector3<f64>) -> f64 {
    points
        .iter()
        .map(|&(t, y)| {
            let r = model(params, t) - y;
            r * r
        })
        .sum()
}

/// Accumulate `J^T J` and `J^T r` for the current parameters.
fn normal_equations(points: &[(f64, f64)], params: &Vector3<f64>) -> (Matrix3<f64>, Vector3<f64>) {
    let mut jtj = Matrix3::zeros();
    let mut jtr = Vector3::zeros();
    for &(t, y) in points {
        let x = t / TIME_SCALE;
        let e = (params[1] * (x - params[2])).exp();
        let residual = params[0] * (1.0 - e) - y;
        let jacobian_row = Vector3::new(
            1.0 - e,                          // d/d amplitude
            -params[0] * (x - params[2]) * e, // d/d rate
            params[0] * params[1] * e,        // d/d shift
        );
        jtj += jacobian_row * jacobian_row.transpose();
        jtr += jacobian_row * residual;
    }
    (jtj, jtr)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mid-year timestamps for 2015..2020 are around 1.43e9..1.59e9 seconds
    fn synthetic_points(curve: &GrowthCurve) -> Vec<(f64, f64)> {
        (0..6)
            .map(|i| {
                let t = 1.43e9 + 0.031e9 * f64::from(i);
                (t, curve.eval(t))
            })
            .collect()
    }

    #[test]
    fn test_eval_matches_closed_form() {
        let curve = GrowthCurve { amplitude: 30.0, rate: 8.0, shift: 1.65 };
        let t = 1.5e9;
        let expected = 30.0 * (1.0 - (8.0_f64 * (1.5 - 1.65)).exp());
        assert!((curve.eval(t) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_curve_decreases_with_time() {
        // Younger papers have fewer citations, so f must fall as t grows
        let curve = GrowthCurve { amplitude: 30.0, rate: 8.0, shift: 1.65 };
        assert!(curve.eval(1.43e9) > curve.eval(1.59e9));
    }

    #[test]
    fn test_fit_recovers_known_parameters() {
        let truth = GrowthCurve { amplitude: 29.6, rate: 10.0, shift: 1.62 };
        let points = synthetic_points(&truth);
        let guess = GrowthCurve { amplitude: 25.0, rate: 8.0, shift: 1.7 };
        let fitted = fit(&points, guess).expect("fit converges");
        assert!((fitted.amplitude - truth.amplitude).abs() < 1e-3, "amplitude {fitted:?}");
        assert!((fitted.rate - truth.rate).abs() < 1e-2, "rate {fitted:?}");
        assert!((fitted.shift - truth.shift).abs() < 1e-3, "shift {fitted:?}");
    }

    #[test]
    fn test_fit_requires_three_points() {
        let guess = GrowthCurve { amplitude: 1.0, rate: 1.0, shift: 1.0 };
        let result = fit(&[(1.0, 1.0), (2.0, 2.0)], guess);
        assert!(matches!(result, Err(TimingError::Config(_))));
    }

    #[test]
    fn test_hopeless_guess_fails_loudly() {
        // An absurd rate overflows the exponential; the optimizer must report
        // non-convergence instead of silently returning a default curve.
        let truth = GrowthCurve { amplitude: 29.6, rate: 10.0, shift: 1.62 };
        let points = synthetic_points(&truth);
        let guess = GrowthCurve { amplitude: 1.0, rate: 1e6, shift: -1e6 };
        let result = fit(&points, guess);
        assert!(matches!(result, Err(TimingError::NonConvergence { .. })));
    }

    #[test]
    fn test_flat_and_curve_boosts_agree() {
        // The study assumes both normalizations lead to the same conclusions;
        // on data generated around the curve they must correlate strongly.
        use crate::config::AnalysisConfig;
        use crate::enrich::enrich_batch;
        use crate::records::{CitationRecord, SubmissionRecord};
        use crate::stats::pearson_correlation;
        use chrono::{Datelike, TimeZone, Utc};

        let truth = GrowthCurve { amplitude: 29.6, rate: 10.0, shift: 1.62 };
        let config = AnalysisConfig::default();
        let mut batches = Vec::new();
        for year in 2015..=2020 {
            let mut submissions = Vec::new();
            let mut citations = Vec::new();
            for (i, factor) in [0.7, 1.0, 1.3].into_iter().enumerate() {
                let instant = Utc
                    .with_ymd_and_hms(year, 6, 28 + i as u32, 12, 0, 0)
                    .single()
                    .expect("test timestamp");
                let expected = truth.eval(instant.timestamp() as f64);
                let id = format!("{year}.{i}");
                submissions.push(SubmissionRecord {
                    id: id.clone(),
                    submitter: "A. Author".to_string(),
                    weekday: instant.with_timezone(&config.timezone).weekday(),
                    submitted_on: instant,
                    num_authors: 1,
                });
                citations.push(CitationRecord {
                    id,
                    citation_count: Some((expected * factor).round() as u32),
                });
            }
            let enriched = enrich_batch(&submissions, &citations, &config).expect("enrich");
            batches.push((year, enriched));
        }

        let points = yearly_points(&batches).expect("points");
        let guess = GrowthCurve { amplitude: 25.0, rate: 8.0, shift: 1.7 };
        let curve = fit(&points, guess).expect("fit");

        let records: Vec<_> = batches.iter().flat_map(|(_, r)| r.iter()).collect();
        let flat: Vec<f64> = records.iter().map(|r| r.citation_boost).collect();
        let accurate: Vec<f64> = records
            .iter()
            .map(|r| curve.boost(r.submitted_on.timestamp() as f64, r.citation_count))
            .collect();
        let correlation = pearson_correlation(&flat, &accurate);
        assert!(correlation > 0.95, "correlation {correlation}");
    }

    #[test]
    fn test_boost_at_curve_value_is_zero() {
        let curve = GrowthCurve { amplitude: 30.0, rate: 8.0, shift: 1.65 };
        let t = 1.5e9;
        let on_curve = curve.eval(t).round() as u32;
        let boost = curve.boost(t, on_curve);
        assert!(boost.abs() < 5.0); // rounding to an integer count keeps it near zero
    }
}
