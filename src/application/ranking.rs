use std::cmp::Ordering;

/// Top and bottom extracts of a ranked table.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedExtract<T> {
    /// Highest metric first.
    pub top: Vec<T>,
    /// Lowest metric first.
    pub bottom: Vec<T>,
}

/// Sorts rows by a numeric metric to produce top-N / bottom-N extracts.
///
/// Sorting is stable, so rows with equal metrics keep their input order.
/// Asking for more rows than exist returns all of them.
pub struct RankingReporter;

impl RankingReporter {
    pub fn top_n<T, F>(rows: &[T], n: usize, metric: F) -> Vec<T>
    where
        T: Clone,
        F: Fn(&T) -> f64,
    {
        Self::sorted(rows, n, |a, b| metric(b).total_cmp(&metric(a)))
    }

    pub fn bottom_n<T, F>(rows: &[T], n: usize, metric: F) -> Vec<T>
    where
        T: Clone,
        F: Fn(&T) -> f64,
    {
        Self::sorted(rows, n, |a, b| metric(a).total_cmp(&metric(b)))
    }

    pub fn extract<T, F>(rows: &[T], n: usize, metric: F) -> RankedExtract<T>
    where
        T: Clone,
        F: Fn(&T) -> f64,
    {
        RankedExtract {
            top: Self::top_n(rows, n, &metric),
            bottom: Self::bottom_n(rows, n, &metric),
        }
    }

    fn sorted<T, C>(rows: &[T], n: usize, compare: C) -> Vec<T>
    where
        T: Clone,
        C: Fn(&T, &T) -> Ordering,
    {
        let mut ranked: Vec<&T> = rows.iter().collect();
        ranked.sort_by(|a, b| compare(a, b));
        ranked.into_iter().take(n).cloned().collect()
    }
}
