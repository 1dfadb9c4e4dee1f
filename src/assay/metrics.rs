//! Standard curve and replicate metrics
//!
//! The first `curve_points` readings are paired index-for-index with the
//! reference concentrations to score the curve. Replicate precision is taken
//! over consecutive, non-overlapping groups of `replicate_size` readings.

use std::fmt;

use crate::assay::parse::parse_values;
use crate::config::AssayLayout;
use crate::error::MetricsError;

/// Result of an assay metrics calculation
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsResult {
    /// Coefficient of determination of the standard curve
    pub r_squared: f64,

    /// Mean CV% over all complete replicate groups (0 when there are none)
    pub average_cv_percent: f64,

    /// CV% of each complete replicate group, in plate order
    pub replicate_cvs: Vec<f64>,

    /// Number of (concentration, absorbance) pairs in the curve
    pub curve_points: usize,
}

impl fmt::Display for MetricsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R²: {:.4}, Average CV: {:.2}%",
            self.r_squared, self.average_cv_percent
        )
    }
}

/// Parse both lists and calculate the metrics
pub fn compute(
    absorbance_values: &str,
    concentrations: &str,
    layout: &AssayLayout,
) -> std::result::Result<MetricsResult, MetricsError> {
    let absorbances = parse_values("absorbance", absorbance_values)?;
    let concentrations = parse_values("concentration", concentrations)?;
    calculate_metrics(&absorbances, &concentrations, layout)
}

/// Calculate R² and average CV% from parsed readings
pub fn calculate_metrics(
    absorbances: &[f64],
    concentrations: &[f64],
    layout: &AssayLayout,
) -> std::result::Result<MetricsResult, MetricsError> {
    if layout.replicate_size < 2 {
        return Err(MetricsError::InvalidLayout {
            replicate_size: layout.replicate_size,
        });
    }

    let points = layout.curve_points;
    require_len("absorbance", absorbances, points)?;
    require_len("concentration", concentrations, points)?;

    let r_squared = r_squared(&concentrations[..points], &absorbances[..points]);

    let window = &absorbances[..absorbances.len().min(layout.max_replicate_readings)];
    let replicate_cvs = window
        .chunks_exact(layout.replicate_size)
        .enumerate()
        .map(|(index, group)| {
            let group_number = index + 1;
            let cv = coefficient_of_variation(group).ok_or(MetricsError::ZeroMeanReplicate {
                group: group_number,
            })?;
            require_finite(format!("replicate group {} CV", group_number), cv)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let average_cv_percent = if replicate_cvs.is_empty() {
        0.0
    } else {
        require_finite("average CV".to_string(), mean(&replicate_cvs))?
    };

    Ok(MetricsResult {
        r_squared,
        average_cv_percent,
        replicate_cvs,
        curve_points: points,
    })
}

/// Squared Pearson correlation of two equally long series.
///
/// Returns 0 when either series has no variance. The result is in [0, 1]
/// for any finite input.
pub fn r_squared(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let (x, y) = (normalized(&x[..n]), normalized(&y[..n]));
    let (mean_x, mean_y) = (mean(&x), mean(&y));

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(&y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x > 0.0 && var_y > 0.0 {
        let r = covariance / (var_x.sqrt() * var_y.sqrt());
        (r * r).min(1.0)
    } else {
        0.0
    }
}

/// Sample standard deviation over mean, as a percentage.
///
/// `None` when the mean is zero or the group has fewer than two readings.
pub fn coefficient_of_variation(group: &[f64]) -> Option<f64> {
    if group.len() < 2 {
        return None;
    }
    let group = normalized(group);
    let m = mean(&group);
    if m == 0.0 {
        return None;
    }
    Some(sample_stdev(&group, m) / m * 100.0)
}

/// Values divided by their largest magnitude, so squares cannot overflow.
/// Both R² and CV are unchanged by this scaling.
fn normalized(values: &[f64]) -> Vec<f64> {
    let peak = values.iter().fold(0.0_f64, |peak, v| peak.max(v.abs()));
    if peak == 0.0 {
        return values.to_vec();
    }
    values.iter().map(|v| v / peak).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_stdev(values: &[f64], mean: f64) -> f64 {
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

fn require_finite(quantity: String, value: f64) -> std::result::Result<f64, MetricsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MetricsError::NumericOverflow { quantity })
    }
}

fn require_len(
    series: &str,
    values: &[f64],
    required: usize,
) -> std::result::Result<(), MetricsError> {
    if values.len() < required {
        return Err(MetricsError::TooFewValues {
            series: series.to_string(),
            required,
            actual: values.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STANDARDS: &str = "0,10,20,50,100,200";

    fn layout() -> AssayLayout {
        AssayLayout::default()
    }

    #[test]
    fn test_linear_curve_scores_one() {
        let conc = [0.0, 10.0, 20.0, 50.0, 100.0, 200.0];
        let abs: Vec<f64> = conc.iter().map(|c| 0.0045 * c + 0.04).collect();
        let result = calculate_metrics(&abs, &conc, &layout()).unwrap();
        assert!((result.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_decreasing_linear_curve_scores_one() {
        let conc = [0.0, 10.0, 20.0, 50.0, 100.0, 200.0];
        let abs: Vec<f64> = conc.iter().map(|c| 2.0 - 0.005 * c).collect();
        assert!((r_squared(&conc, &abs) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_uneven_spacing_scenario() {
        let result = compute("0.1,0.2,0.3,0.4,0.5,0.6", STANDARDS, &layout()).unwrap();
        assert!(result.r_squared < 1.0);
        assert!((result.r_squared - 0.834_430_546).abs() < 1e-6);
        // Two complete triplicates: CV 50% and 20%
        assert_eq!(result.replicate_cvs.len(), 2);
        assert!((result.average_cv_percent - 35.0).abs() < 1e-9);
        assert_eq!(result.to_string(), "R²: 0.8344, Average CV: 35.00%");
    }

    #[test]
    fn test_identical_triplicates_have_zero_cv() {
        let result = compute("0.1,0.1,0.1,0.2,0.2,0.2,0.3,0.3,0.3", STANDARDS, &layout()).unwrap();
        assert_eq!(result.replicate_cvs.len(), 3);
        assert!(result.average_cv_percent.abs() < 1e-9);
        assert!(result.to_string().ends_with("Average CV: 0.00%"));
    }

    #[test]
    fn test_constant_series_scores_zero() {
        let flat_abs = compute("0.5,0.5,0.5,0.5,0.5,0.5", STANDARDS, &layout()).unwrap();
        assert_eq!(flat_abs.r_squared, 0.0);

        let flat_conc = compute("0.1,0.2,0.3,0.4,0.5,0.6", "5,5,5,5,5,5", &layout()).unwrap();
        assert_eq!(flat_conc.r_squared, 0.0);
    }

    #[test]
    fn test_r_squared_is_bounded() {
        let conc = [0.0, 10.0, 20.0, 50.0, 100.0, 200.0];
        let samples = [
            [0.3, 0.1, 0.9, 0.2, 0.8, 0.05],
            [1.0, 0.9, 0.85, 0.5, 0.2, 0.1],
            [0.04, 0.09, 0.13, 0.29, 0.51, 0.97],
        ];
        for abs in samples {
            let r2 = r_squared(&conc, &abs);
            assert!((0.0..=1.0).contains(&r2), "r2 out of range: {}", r2);
        }
    }

    #[test]
    fn test_huge_readings_stay_in_range() {
        let huge = compute("1e200,2e200,3e200,4e200,5e200,6e200", STANDARDS, &layout()).unwrap();
        let plain = compute("1,2,3,4,5,6", STANDARDS, &layout()).unwrap();
        assert!((0.0..=1.0).contains(&huge.r_squared));
        assert!((huge.r_squared - plain.r_squared).abs() < 1e-12);
        assert!((huge.average_cv_percent - plain.average_cv_percent).abs() < 1e-9);
        assert_eq!(huge.to_string(), "R²: 0.8344, Average CV: 35.00%");
    }

    #[test]
    fn test_cv_beyond_float_range_is_reported() {
        // Group mean is subnormal, so stdev / mean exceeds f64::MAX
        let err = compute("1,-1,1e-320,0.4,0.5,0.6", STANDARDS, &layout()).unwrap_err();
        assert_eq!(
            err,
            MetricsError::NumericOverflow {
                quantity: "replicate group 1 CV".to_string(),
            }
        );
    }

    #[test]
    fn test_cv_is_scale_invariant() {
        let group = [0.101, 0.112, 0.095];
        let scaled: Vec<f64> = group.iter().map(|v| v * 7.5).collect();
        let a = coefficient_of_variation(&group).unwrap();
        let b = coefficient_of_variation(&scaled).unwrap();
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_trailing_partial_group_is_discarded() {
        let result = compute("0.1,0.2,0.3,0.4,0.5,0.6,0.7,0.8", STANDARDS, &layout()).unwrap();
        assert_eq!(result.replicate_cvs.len(), 2);
    }

    #[test]
    fn test_replicates_stop_after_window() {
        let readings = vec!["1.0"; 21].join(",") + ",1.0,2.0,3.0";
        let result = compute(&readings, STANDARDS, &layout()).unwrap();
        assert_eq!(result.replicate_cvs.len(), 6);
        assert_eq!(result.average_cv_percent, 0.0);
    }

    #[test]
    fn test_extra_concentrations_are_ignored() {
        let a = compute("0.1,0.2,0.3,0.4,0.5,0.6", STANDARDS, &layout()).unwrap();
        let b = compute("0.1,0.2,0.3,0.4,0.5,0.6", "0,10,20,50,100,200,400", &layout()).unwrap();
        assert_eq!(a.r_squared, b.r_squared);
    }

    #[test]
    fn test_malformed_readings_are_reported() {
        let err = compute("a,b,c", STANDARDS, &layout()).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidNumber { position: 1, .. }));
    }

    #[test]
    fn test_short_concentration_list_is_reported() {
        let err = compute("0.1,0.2,0.3,0.4,0.5,0.6", "0,10,20", &layout()).unwrap_err();
        assert_eq!(
            err,
            MetricsError::TooFewValues {
                series: "concentration".to_string(),
                required: 6,
                actual: 3,
            }
        );
    }

    #[test]
    fn test_short_absorbance_list_is_reported() {
        let err = compute("0.1,0.2", STANDARDS, &layout()).unwrap_err();
        assert!(matches!(err, MetricsError::TooFewValues { actual: 2, .. }));
    }

    #[test]
    fn test_zero_mean_group_is_reported() {
        let err = compute("0,0,0,0.4,0.5,0.6", STANDARDS, &layout()).unwrap_err();
        assert_eq!(err, MetricsError::ZeroMeanReplicate { group: 1 });
    }

    #[test]
    fn test_single_reading_groups_are_rejected() {
        let singles = AssayLayout {
            replicate_size: 1,
            ..AssayLayout::default()
        };
        let err = compute("0.1,0.2,0.3,0.4,0.5,0.6", STANDARDS, &singles).unwrap_err();
        assert_eq!(err, MetricsError::InvalidLayout { replicate_size: 1 });
    }

    #[test]
    fn test_custom_layout() {
        let duplicates = AssayLayout {
            curve_points: 4,
            replicate_size: 2,
            max_replicate_readings: 4,
        };
        let result = compute("0.1,0.1,0.4,0.4,0.9,0.9", "0,10,40,100", &duplicates).unwrap();
        assert_eq!(result.curve_points, 4);
        assert_eq!(result.replicate_cvs, vec![0.0, 0.0]);
    }
}
