// Copyright (c) the vidstab project authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Small robust-statistics helpers shared by the fit, the transform algebra
//! and the path smoothers.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn stddev(values: &[f64], mean_value: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Trimmed mean over the inner `(1 - 2*trim_frac)` fraction of the sorted
/// values. `trim_frac = 0.2` reproduces the original's "trim len/5 off each
/// end" (inner 60%) convention used for translation in the simple fit path.
pub fn trimmed_mean(values: &[f64], trim_frac: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let trim = ((sorted.len() as f64) * trim_frac) as usize;
    let inner = &sorted[trim..sorted.len() - trim.min(sorted.len() - 1).min(trim)];
    // Guard against trimming everything away on tiny inputs.
    let inner = if inner.is_empty() { &sorted[..] } else { inner };
    mean(inner)
}

/// Trimmed extremes: after sorting, drop `trim_frac` of the values off each
/// end and return `(min, max)` of what remains. Used by optimal-zoom mode 1.
pub fn trimmed_min_max(values: &[f64], trim_frac: f64) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let trim = (((sorted.len() as f64) * trim_frac) as usize).min(sorted.len() / 2);
    let inner = &sorted[trim..sorted.len() - trim];
    (inner[0], inner[inner.len() - 1])
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_stddev_of_constant_is_zero_spread() {
        let values = [3.0, 3.0, 3.0];
        assert_eq!(mean(&values), 3.0);
        assert_eq!(stddev(&values, mean(&values)), 0.0);
    }

    #[test]
    fn trimmed_mean_drops_outliers() {
        let values = [1.0, 2.0, 3.0, 4.0, 100.0];
        let trimmed = trimmed_mean(&values, 0.2);
        assert!(trimmed < 10.0);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }
}
