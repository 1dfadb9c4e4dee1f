//! Parsing of comma-separated numeric lists

use crate::error::MetricsError;

/// Parse a comma-separated list of decimal numbers.
///
/// Whitespace around each token is ignored. `series` names the list in
/// error messages ("absorbance", "concentration").
pub fn parse_values(series: &str, input: &str) -> std::result::Result<Vec<f64>, MetricsError> {
    if input.trim().is_empty() {
        return Err(MetricsError::EmptyInput {
            series: series.to_string(),
        });
    }

    input
        .split(',')
        .enumerate()
        .map(|(index, raw)| {
            let token = raw.trim();
            let value: f64 = token.parse().map_err(|_| MetricsError::InvalidNumber {
                series: series.to_string(),
                position: index + 1,
                token: token.to_string(),
            })?;

            if !value.is_finite() {
                return Err(MetricsError::NonFinite {
                    series: series.to_string(),
                    position: index + 1,
                    token: token.to_string(),
                });
            }

            Ok(value)
        })
        .collect()
}

/// Format readings the way `parse_values` accepts them
pub fn format_values(values: &[f64], decimals: usize) -> String {
    values
        .iter()
        .map(|v| format!("{:.*}", decimals, v))
        .collect::<Vec<_>>()
        .join(", ")
}
