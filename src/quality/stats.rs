//! Small numeric helpers shared by the analyzers.

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// A share of a whole: like [`ratio`] but always within `[0, 1]`.
pub fn rate(part: usize, whole: usize) -> f64 {
    ratio(part as f64, whole as f64).clamp(0.0, 1.0)
}

/// Floor-division indices into an ascending sequence; no interpolation.
pub fn median_index(len: usize) -> usize {
    len / 2
}

pub fn p25_index(len: usize) -> usize {
    len / 4
}

pub fn p75_index(len: usize) -> usize {
    (3 * len) / 4
}

/// Order statistics of a set of text lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthSummary {
    pub count: usize,
    pub total: usize,
    pub min: usize,
    pub max: usize,
    pub median: usize,
    pub p25: usize,
    pub p75: usize,
    pub mean: f64,
}

impl LengthSummary {
    /// `None` for an empty input.
    pub fn from_lengths(mut lengths: Vec<usize>) -> Option<Self> {
        if lengths.is_empty() {
            return None;
        }
        lengths.sort_unstable();

        let count = lengths.len();
        let total: usize = lengths.iter().sum();
        Some(Self {
            count,
            total,
            min: lengths[0],
            max: lengths[count - 1],
            median: lengths[median_index(count)],
            p25: lengths[p25_index(count)],
            p75: lengths[p75_index(count)],
            mean: ratio(total as f64, count as f64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_indices_use_floor_division() {
        let summary = LengthSummary::from_lengths(vec![40, 10, 30, 20]).unwrap();
        assert_eq!(summary.median, 30);
        assert_eq!(summary.p25, 20);
        assert_eq!(summary.p75, 40);
        assert_eq!(summary.min, 10);
        assert_eq!(summary.max, 40);
        assert_eq!(summary.total, 100);
        assert_eq!(summary.mean, 25.0);
    }

    #[test]
    fn single_length_is_every_statistic() {
        let summary = LengthSummary::from_lengths(vec![7]).unwrap();
        assert_eq!(
            (summary.min, summary.p25, summary.median, summary.p75, summary.max),
            (7, 7, 7, 7, 7)
        );
    }

    #[test]
    fn empty_lengths_have_no_summary() {
        assert!(LengthSummary::from_lengths(Vec::new()).is_none());
    }

    #[test]
    fn zero_denominators_are_zero() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(3, 0), 0.0);
    }

    #[test]
    fn rates_are_clamped() {
        assert_eq!(rate(1, 3), 1.0 / 3.0);
        assert_eq!(rate(5, 2), 1.0);
    }
}
