pub struct StatsHelper;

impl StatsHelper {
    /// Mean of pixel coordinates, truncated to a whole pixel.
    pub fn mean_floor(values: &[usize]) -> Option<usize> {
        if values.is_empty() {
            return None;
        }
        let sum: usize = values.iter().sum();
        Some(sum / values.len())
    }

    /// Distance between the largest and smallest value.
    pub fn extent<I>(values: I) -> Option<usize>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut bounds: Option<(usize, usize)> = None;
        for value in values {
            bounds = Some(match bounds {
                Some((low, high)) => (low.min(value), high.max(value)),
                None => (value, value),
            });
        }
        bounds.map(|(low, high)| high - low)
    }
}
