//! The partition: the mutable population state of the simulation. A
//! `Category` is a dotted-label cohort with a dense abundance vector over
//! its age (or length) grid; a `Partition` is the ordered set of all
//! categories sharing the model's global grid.
//!
//! Categories are stored in an [`Arena`] and addressed both by integer
//! handle (fast path, used by the hot annual-cycle loop) and by label
//! (used by estimable/time-varying addressables), generalizing an
//! arena of anonymous integer handles into label-addressed components.

use crate::domain::{Arena, ArenaKey};
use fsc_error::{FscError, FscResult, fsc_err};
use std::collections::HashMap;

/// Tolerance within which a non-negativity clamp is allowed to shrink the
/// total abundance of a category without raising a penalty.
pub const CLAMP_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Debug)]
pub struct Category {
    pub label: String,
    pub min_age: u32,
    pub max_age: u32,
    data: Vec<f64>,
}

impl Category {
    pub fn new(label: impl Into<String>, min_age: u32, max_age: u32) -> Self {
        let bins = (max_age - min_age + 1) as usize;
        Category {
            label: label.into(),
            min_age,
            max_age,
            data: vec![0.0; bins],
        }
    }

    pub fn bins(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn age_at(&self, index: usize) -> u32 {
        self.min_age + index as u32
    }

    pub fn index_for_age(&self, age: u32) -> Option<usize> {
        if age < self.min_age || age > self.max_age {
            None
        } else {
            Some((age - self.min_age) as usize)
        }
    }

    /// Clamps every negative entry to zero, returning the total amount
    /// removed. Callers compare this against [`CLAMP_TOLERANCE`] relative
    /// to the pre-clamp total to decide whether to raise a penalty.
    pub fn clamp_non_negative(&mut self) -> f64 {
        let mut removed = 0.0;
        for v in self.data.iter_mut() {
            if *v < 0.0 {
                removed -= *v;
                *v = 0.0;
            }
        }
        removed
    }
}

pub struct Partition {
    categories: Arena<Category>,
    index: HashMap<String, ArenaKey>,
}

impl Partition {
    pub fn new() -> Self {
        Partition {
            categories: Arena::new(),
            index: HashMap::new(),
        }
    }

    /// Allocates dense, zero-initialised abundance vectors per category.
    pub fn build(labels: impl IntoIterator<Item = (String, u32, u32)>) -> FscResult<Self> {
        let mut partition = Partition::new();
        for (label, min_age, max_age) in labels {
            partition.add_category(label, min_age, max_age)?;
        }
        Ok(partition)
    }

    pub fn add_category(
        &mut self,
        label: impl Into<String>,
        min_age: u32,
        max_age: u32,
    ) -> FscResult<ArenaKey> {
        let label = label.into();
        if self.index.contains_key(&label) {
            return Err(fsc_err!(Verify: "duplicate category label '{}'", label));
        }
        if max_age < min_age {
            return Err(fsc_err!(
                Verify: "category '{}' has max_age {} < min_age {}",
                label,
                max_age,
                min_age
            ));
        }
        let key = self.categories.insert(Category::new(&label, min_age, max_age));
        self.index.insert(label, key);
        Ok(key)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category(&self, key: ArenaKey) -> &Category {
        self.categories
            .get(key)
            .expect("ArenaKey from this Partition is always valid")
    }

    pub fn category_mut(&mut self, key: ArenaKey) -> &mut Category {
        self.categories
            .get_mut(key)
            .expect("ArenaKey from this Partition is always valid")
    }

    pub fn find(&self, label: &str) -> Option<ArenaKey> {
        self.index.get(label).copied()
    }

    pub fn get(&self, label: &str) -> Option<&Category> {
        self.find(label).map(|k| self.category(k))
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut Category> {
        self.find(label).map(|k| self.category_mut(k))
    }

    pub fn keys(&self) -> Vec<ArenaKey> {
        (0..self.categories.len()).map(ArenaKey::from_index).collect()
    }

    /// Index of `key` in insertion order; categories are never removed, so
    /// this always succeeds for a key obtained from this partition.
    pub fn position(&self, key: ArenaKey) -> usize {
        key.index()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Category> {
        self.categories.iter_mut()
    }

    pub fn total(&self) -> f64 {
        self.iter().map(Category::total).sum()
    }

    /// Resets every category's abundances to zero ahead of a fresh run.
    pub fn reset(&mut self) {
        for category in self.iter_mut() {
            for v in category.data_mut() {
                *v = 0.0;
            }
        }
    }

    pub fn validate(&self) -> FscResult<()> {
        if self.categories.is_empty() {
            return Err(fsc_err!(Verify: "partition has no categories"));
        }
        Ok(())
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_allocates_zeroed_categories() {
        let partition =
            Partition::build([("stage.male".to_string(), 1, 10), ("stage.female".to_string(), 1, 10)])
                .unwrap();
        assert_eq!(partition.len(), 2);
        assert_eq!(partition.get("stage.male").unwrap().bins(), 10);
        assert_eq!(partition.total(), 0.0);
    }

    #[test]
    fn duplicate_label_fails_validate() {
        let mut partition = Partition::new();
        partition.add_category("a", 1, 5).unwrap();
        let err = partition.add_category("a", 1, 5).unwrap_err();
        assert!(matches!(err, FscError::Verify { .. }));
    }

    #[test]
    fn clamp_reports_removed_mass() {
        let mut category = Category::new("a", 1, 3);
        category.data_mut().copy_from_slice(&[1.0, -2.0, 3.0]);
        let removed = category.clamp_non_negative();
        assert_eq!(removed, 2.0);
        assert_eq!(category.data(), &[1.0, 0.0, 3.0]);
    }

    #[test]
    fn reset_zeros_all_categories() {
        let mut partition = Partition::build([("a".to_string(), 1, 3)]).unwrap();
        partition.get_mut("a").unwrap().data_mut()[0] = 42.0;
        partition.reset();
        assert_eq!(partition.total(), 0.0);
    }
}
