//! Statistical estimators over batches of raw samples.
//!
//! Strain bridges show occasional single-sample spikes from switching
//! transients. The trimmed mean drops one minimum and one maximum per batch;
//! the median is the more robust and more expensive fallback.

use core::ops::RangeInclusive;

/// Sample-count bounds for [`mean`]
pub const AVERAGE_SAMPLES: RangeInclusive<u8> = 1..=50;
/// Sample-count bounds for [`median`]
pub const MEDIAN_SAMPLES: RangeInclusive<u8> = 3..=25;
/// Sample-count bounds for [`trimmed_mean`]
pub const FILTERED_SAMPLES: RangeInclusive<u8> = 5..=50;

/// Largest batch any estimator collects
pub const MAX_SAMPLES: usize = 50;

/// Clamp a requested sample count into `bounds`
pub fn clamp_samples(requested: u8, bounds: &RangeInclusive<u8>) -> usize {
    requested.clamp(*bounds.start(), *bounds.end()) as usize
}

/// Arithmetic mean with 64-bit accumulation, truncated toward zero
pub fn mean(samples: &[i32]) -> i32 {
    if samples.is_empty() {
        return 0;
    }
    let sum: i64 = samples.iter().map(|&s| i64::from(s)).sum();
    (sum / samples.len() as i64) as i32
}

/// Element at index `len / 2` after sorting in place
pub fn median(samples: &mut [i32]) -> i32 {
    if samples.is_empty() {
        return 0;
    }
    samples.sort_unstable();
    samples[samples.len() / 2]
}

/// Mean after discarding exactly one minimum and one maximum observation
///
/// Needs at least three samples; shorter batches fall back to [`mean`].
pub fn trimmed_mean(samples: &[i32]) -> i32 {
    if samples.len() < 3 {
        return mean(samples);
    }
    let mut sum = 0i64;
    let mut min = i32::MAX;
    let mut max = i32::MIN;
    for &sample in samples {
        sum += i64::from(sample);
        min = min.min(sample);
        max = max.max(sample);
    }
    sum -= i64::from(min) + i64::from(max);
    (sum / (samples.len() as i64 - 2)) as i32
}
