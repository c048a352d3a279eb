//! The dense per-grid-point cache every selectivity is evaluated through
//! once, rather than re-evaluating its functional form on every partition
//! lookup.

#[derive(Clone, Debug, PartialEq)]
pub struct SelectivityCache {
    values: Vec<f64>,
}

impl SelectivityCache {
    pub fn build(grid_len: u32, value_at: impl Fn(u32) -> f64) -> Self {
        SelectivityCache {
            values: (0..grid_len).map(value_at).collect(),
        }
    }

    pub fn get(&self, index: u32) -> f64 {
        self.values[index as usize]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_evaluates_once_per_index() {
        let cache = SelectivityCache::build(5, |i| (i * i) as f64);
        assert_eq!(cache.values(), &[0.0, 1.0, 4.0, 9.0, 16.0]);
        assert_eq!(cache.get(3), 9.0);
    }
}
