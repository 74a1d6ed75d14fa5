//! Histogram companion series
//!
//! Prometheus histograms are exported as a `_count`, `_sum` and `_bucket`
//! trio. A query that mentions one of them is treated as depending on all
//! three.

/// Each histogram suffix with the two suffixes that accompany it
pub const HISTOGRAM_SUFFIXES: [(&str, [&str; 2]); 3] = [
    ("_count", ["_sum", "_bucket"]),
    ("_sum", ["_count", "_bucket"]),
    ("_bucket", ["_count", "_sum"]),
];

/// Names of the companion series for a histogram metric
///
/// Returns `None` when `metric` does not end in a histogram suffix.
pub fn histogram_companions(metric: &str) -> Option<[String; 2]> {
    HISTOGRAM_SUFFIXES.iter().find_map(|&(suffix, companions)| {
        metric
            .strip_suffix(suffix)
            .map(|base| companions.map(|companion| format!("{base}{companion}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_companions() {
        assert_eq!(
            histogram_companions("req_count"),
            Some(["req_sum".to_string(), "req_bucket".to_string()])
        );
        assert_eq!(
            histogram_companions("req_sum"),
            Some(["req_count".to_string(), "req_bucket".to_string()])
        );
        assert_eq!(
            histogram_companions("req_bucket"),
            Some(["req_count".to_string(), "req_sum".to_string()])
        );
    }

    #[test]
    fn test_non_histogram_metric() {
        assert_eq!(histogram_companions("http_requests_total"), None);
        assert_eq!(histogram_companions("bucket_size"), None);
    }
}
