// Deviscope - GPL-3.0-or-later
// This file is part of Deviscope.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// Deviscope is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Deviscope is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Deviscope.  If not, see <https://www.gnu.org/licenses/>.

//! Descriptive statistics for the root-cause charts.

use serde::Serialize;

/// Default number of histogram bins for dimension distributions
pub const DEFAULT_BINS: usize = 12;

/// One bar of a histogram, labelled with its lower bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramBin {
    pub label: String,
    pub count: usize,
}

/// Equal-width histogram over `[min(values), max(values)]`.
///
/// The maximum lands in the last bin. Identical values collapse into a single bin.
#[must_use]
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return vec![HistogramBin {
            label: format_number(min, 2),
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            label: format_number(min + i as f64 * width, 1),
            count: 0,
        })
        .collect();

    for &value in values {
        let index = (((value - min) / width).floor() as usize).min(bins - 1);
        result[index].count += 1;
    }

    result
}

#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Pearson product-moment correlation of paired samples.
///
/// Pairs up to the shorter input. `None` with fewer than two pairs or when either
/// side has zero variance.
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let xs = &xs[..n];
    let ys = &ys[..n];

    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let (covariance, var_x, var_y) = xs.iter().zip(ys).fold(
        (0.0, 0.0, 0.0),
        |(cov, vx, vy), (&x, &y)| {
            let dx = x - mean_x;
            let dy = y - mean_y;
            (cov + dx * dy, vx + dx * dx, vy + dy * dy)
        },
    );

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        None
    } else {
        Some(covariance / denominator)
    }
}

/// Format like `1,234.5`: grouped thousands, at most `max_decimals` decimals,
/// trailing zeros dropped.
#[must_use]
pub fn format_number(value: f64, max_decimals: usize) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "NaN".to_string()
        } else if value > 0.0 {
            "∞".to_string()
        } else {
            "-∞".to_string()
        };
    }

    let fixed = format!("{:.*}", max_decimals, value.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let is_zero = grouped.chars().all(|c| c == '0' || c == ',') && fraction.is_empty();
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    if fraction.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_conserves_counts() {
        let values = [0.0, 1.0, 2.5, 7.0, 9.99, 10.0, 3.3, 3.3];
        for bins in [1, 3, 12, 40] {
            let total: usize = histogram(&values, bins).iter().map(|b| b.count).sum();
            assert_eq!(total, values.len(), "bins = {bins}");
        }
    }

    #[test]
    fn test_histogram_max_in_last_bin() {
        let bins = histogram(&[0.0, 5.0, 10.0], 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[1].count, 2);
        assert_eq!(bins[0].label, "0");
        assert_eq!(bins[1].label, "5");
    }

    #[test]
    fn test_histogram_degenerate_inputs() {
        assert!(histogram(&[], 12).is_empty());
        assert!(histogram(&[1.0], 0).is_empty());
        let flat = histogram(&[4.25, 4.25, 4.25], 12);
        assert_eq!(
            flat,
            vec![HistogramBin {
                label: "4.25".to_string(),
                count: 3
            }]
        );
    }

    #[test]
    fn test_pearson_perfect_and_symmetric() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        let r = pearson(&xs, &ys).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let zs = [3.0, 1.0, 4.0, 1.5];
        assert_eq!(pearson(&xs, &zs), pearson(&zs, &xs));

        let inverse = pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap();
        assert!((inverse + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_undefined_cases() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(pearson(&[], &[]), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234.5, 2), "1,234.5");
        assert_eq!(format_number(-1_234_567.0, 1), "-1,234,567");
        assert_eq!(format_number(0.004, 2), "0");
        assert_eq!(format_number(-0.004, 2), "0");
        assert_eq!(format_number(999.999, 2), "1,000");
        assert_eq!(format_number(12.0, 0), "12");
        assert_eq!(format_number(f64::NEG_INFINITY, 2), "-∞");
    }
}
