use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputStats {
    pub count: usize,
    pub min: i64,
    pub max: i64,
    pub median: i64,
}

/// Summarize a result sequence (count, min, max, median). `None` when empty.
pub fn summarize(values: &[i64]) -> Option<OutputStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    Some(OutputStats {
        count: n,
        min: sorted[0],
        max: sorted[n - 1],
        median: sorted[n / 2],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_summary() {
        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn summarizes_unsorted_values() {
        assert_eq!(
            summarize(&[8, 2, 6, 4]),
            Some(OutputStats {
                count: 4,
                min: 2,
                max: 8,
                median: 6,
            })
        );
    }
}
