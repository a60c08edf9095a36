//! Design matrix keyed by feature identity.

use crate::error::{ForecastError, Result};
use crate::features::Feature;
use std::collections::BTreeMap;

/// An ordered mapping from `Feature` to a per-timestamp value column.
///
/// Column order follows `Feature`'s ordering (growth, changepoints,
/// seasonality, events), so the regression sees a deterministic design
/// matrix. All columns share the row count fixed at construction.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    rows: usize,
    columns: BTreeMap<Feature, Vec<f64>>,
}

impl FeatureMatrix {
    /// Create an empty matrix for the given number of rows.
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            columns: BTreeMap::new(),
        }
    }

    /// Number of rows (timestamps).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of feature columns.
    pub fn num_features(&self) -> usize {
        self.columns.len()
    }

    /// Whether the matrix holds no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Insert a column, replacing any existing column for the same feature.
    pub fn insert(&mut self, feature: Feature, column: Vec<f64>) -> Result<()> {
        if column.len() != self.rows {
            return Err(ForecastError::DimensionMismatch {
                expected: self.rows,
                got: column.len(),
            });
        }
        self.columns.insert(feature, column);
        Ok(())
    }

    /// Look up a column by feature.
    pub fn column(&self, feature: &Feature) -> Option<&[f64]> {
        self.columns.get(feature).map(|c| c.as_slice())
    }

    /// Whether a feature is present.
    pub fn contains(&self, feature: &Feature) -> bool {
        self.columns.contains_key(feature)
    }

    /// Iterate columns in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&Feature, &[f64])> {
        self.columns.iter().map(|(f, c)| (f, c.as_slice()))
    }

    /// Features in canonical order.
    pub fn features(&self) -> Vec<Feature> {
        self.columns.keys().cloned().collect()
    }

    /// Keep only columns whose feature satisfies the predicate.
    pub fn retain<P: FnMut(&Feature) -> bool>(&mut self, mut predicate: P) {
        self.columns.retain(|f, _| predicate(f));
    }

    /// Drop all-zero and constant columns, keeping the intercept.
    ///
    /// A constant non-intercept column is collinear with the intercept and
    /// would make the design singular.
    pub fn drop_degenerate(&mut self) {
        self.columns.retain(|feature, column| {
            if feature.is_intercept() {
                return true;
            }
            let Some(&first) = column.first() else {
                return false;
            };
            column.iter().any(|&v| v != first)
        });
    }

    /// The columns in canonical order, paired with their features, ready for
    /// a regression engine.
    pub fn to_design(&self) -> (Vec<Feature>, Vec<Vec<f64>>) {
        let features = self.features();
        let columns = self.columns.values().cloned().collect();
        (features, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FourierComponent, GrowthTerm};

    fn intercept() -> Feature {
        Feature::Growth(GrowthTerm::Intercept)
    }

    fn season(order: usize) -> Feature {
        Feature::Seasonality {
            name: "daily".to_string(),
            order,
            component: FourierComponent::Sin,
        }
    }

    #[test]
    fn insert_validates_row_count() {
        let mut matrix = FeatureMatrix::new(3);
        assert!(matrix.insert(intercept(), vec![1.0, 1.0]).is_err());
        assert!(matrix.insert(intercept(), vec![1.0, 1.0, 1.0]).is_ok());
        assert_eq!(matrix.num_features(), 1);
    }

    #[test]
    fn drop_degenerate_removes_constant_and_zero_columns() {
        let mut matrix = FeatureMatrix::new(3);
        matrix.insert(intercept(), vec![1.0, 1.0, 1.0]).unwrap();
        matrix.insert(season(1), vec![0.0, 0.0, 0.0]).unwrap();
        matrix.insert(season(2), vec![2.5, 2.5, 2.5]).unwrap();
        matrix.insert(season(3), vec![0.0, 1.0, 0.0]).unwrap();

        matrix.drop_degenerate();

        assert!(matrix.contains(&intercept()));
        assert!(!matrix.contains(&season(1)));
        assert!(!matrix.contains(&season(2)));
        assert!(matrix.contains(&season(3)));
    }

    #[test]
    fn iteration_is_ordered() {
        let mut matrix = FeatureMatrix::new(1);
        matrix
            .insert(
                Feature::Event {
                    name: "promo".to_string(),
                },
                vec![1.0],
            )
            .unwrap();
        matrix.insert(intercept(), vec![1.0]).unwrap();
        matrix.insert(season(1), vec![0.5]).unwrap();

        let features = matrix.features();
        assert!(features[0].is_intercept());
        assert!(matches!(features[1], Feature::Seasonality { .. }));
        assert!(matches!(features[2], Feature::Event { .. }));
    }

    #[test]
    fn retain_filters_features() {
        let mut matrix = FeatureMatrix::new(1);
        matrix.insert(intercept(), vec![1.0]).unwrap();
        matrix.insert(season(1), vec![0.5]).unwrap();

        let keep = intercept();
        matrix.retain(|f| *f == keep);

        assert_eq!(matrix.num_features(), 1);
        assert!(matrix.contains(&intercept()));
    }
}
