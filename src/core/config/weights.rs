//! Declarative weighted-variant tables.
//!
//! Every randomized choice the augmentation pipeline makes (text mode,
//! distortion, background, blur, ...) is described by a [`WeightedTable`]
//! mapping a variant tag to a relative weight. Tables are sampled once per
//! sample into the augmentation recipe.

use super::errors::ConfigError;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

/// One `(variant, weight)` row of a [`WeightedTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedEntry<T> {
    /// The variant selected by this row.
    pub variant: T,
    /// Relative weight; rows need not sum to one.
    pub weight: f64,
}

/// A table of variants with relative selection weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedTable<T> {
    entries: Vec<WeightedEntry<T>>,
}

impl<T: Copy + PartialEq> WeightedTable<T> {
    /// Builds a table from `(variant, weight)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (T, f64)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(variant, weight)| WeightedEntry { variant, weight })
                .collect(),
        }
    }

    /// A table that always yields `variant`.
    pub fn always(variant: T) -> Self {
        Self::new([(variant, 1.0)])
    }

    /// Replaces (or appends) the weight of `variant`.
    pub fn with_weight(mut self, variant: T, weight: f64) -> Self {
        match self.entries.iter_mut().find(|e| e.variant == variant) {
            Some(entry) => entry.weight = weight,
            None => self.entries.push(WeightedEntry { variant, weight }),
        }
        self
    }

    /// Returns the weight registered for `variant` (zero when absent).
    pub fn weight_of(&self, variant: T) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.variant == variant)
            .map(|e| e.weight)
            .sum()
    }

    /// Iterates over the table rows.
    pub fn entries(&self) -> &[WeightedEntry<T>] {
        &self.entries
    }

    /// Checks that the table can be sampled.
    ///
    /// # Errors
    ///
    /// Fails when the table is empty, a weight is negative or not finite,
    /// or all weights are zero.
    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidWeights {
            field: field.to_string(),
            message: message.to_string(),
        };
        if self.entries.is_empty() {
            return Err(invalid("table is empty"));
        }
        if self
            .entries
            .iter()
            .any(|e| !e.weight.is_finite() || e.weight < 0.0)
        {
            return Err(invalid("weights must be finite and non-negative"));
        }
        if self.entries.iter().map(|e| e.weight).sum::<f64>() <= 0.0 {
            return Err(invalid("weights sum to zero"));
        }
        Ok(())
    }

    /// Draws one variant.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::InvalidWeights`] if the table is not samplable.
    pub fn sample<R: Rng + ?Sized>(&self, field: &str, rng: &mut R) -> Result<T, ConfigError> {
        let index = WeightedIndex::new(self.entries.iter().map(|e| e.weight)).map_err(|e| {
            ConfigError::InvalidWeights {
                field: field.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(self.entries[index.sample(rng)].variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_always_yields_single_variant() {
        let table = WeightedTable::always(7u32);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(table.sample("t", &mut rng).unwrap(), 7);
        }
    }

    #[test]
    fn test_zero_weight_never_selected() {
        let table = WeightedTable::new([(1u32, 0.0), (2, 1.0), (3, 0.0)]);
        let mut rng = StdRng::seed_from_u64(9);
        assert!((0..200).all(|_| table.sample("t", &mut rng).unwrap() == 2));
    }

    #[test]
    fn test_validate_rejects_bad_tables() {
        assert!(WeightedTable::<u32>::new([]).validate("t").is_err());
        assert!(WeightedTable::new([(1u32, -1.0)]).validate("t").is_err());
        assert!(WeightedTable::new([(1u32, 0.0)]).validate("t").is_err());
        assert!(WeightedTable::new([(1u32, f64::NAN)]).validate("t").is_err());
        assert!(WeightedTable::new([(1u32, 0.5), (2, 0.5)]).validate("t").is_ok());
    }

    #[test]
    fn test_with_weight_replaces_existing_row() {
        let table = WeightedTable::new([(1u32, 0.2), (2, 0.8)]).with_weight(1, 0.6);
        assert_eq!(table.weight_of(1), 0.6);
        assert_eq!(table.entries().len(), 2);
    }

    #[test]
    fn test_serde_roundtrip_is_list_of_rows() {
        let table = WeightedTable::new([(1u32, 0.25), (2, 0.75)]);
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.starts_with('['));
        let back: WeightedTable<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
