//! Sample splitter
//!
//! Tags catalog rows with named boolean selection criteria and returns
//! filtered subsamples. Criteria are evaluated eagerly when tagged and
//! cached as masks; referencing a criterion that was never tagged is an
//! error rather than an empty result.

use std::collections::BTreeMap;

use crate::{CatalogError, Result};

/// A row set with named, pre-evaluated selection masks.
///
/// `subsample` takes the intersection of the named criteria; a `~` prefix
/// negates a criterion. The empty criterion list selects every row.
pub struct SampleSplitter<R> {
    rows: Vec<R>,
    criteria: BTreeMap<String, Vec<bool>>,
}

impl<R: Clone> SampleSplitter<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows,
            criteria: BTreeMap::new(),
        }
    }

    /// Number of rows in the underlying sample.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows, unfiltered.
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Evaluate a predicate over every row and cache the mask under `name`.
    /// Re-tagging a name replaces the previous mask.
    pub fn tag<F>(&mut self, name: &str, predicate: F)
    where
        F: Fn(&R) -> bool,
    {
        let mask: Vec<bool> = self.rows.iter().map(&predicate).collect();
        self.criteria.insert(name.to_string(), mask);
    }

    /// Digitize a numeric column into the regions delimited by `edges` and
    /// register one criterion per region name. `names` must have exactly
    /// `edges.len() + 1` entries, covering below the first edge through above
    /// the last. Rows whose column is `None` fall in no region.
    pub fn split_bins<F>(&mut self, column: F, edges: &[f64], names: &[&str])
    where
        F: Fn(&R) -> Option<f64>,
    {
        assert_eq!(
            names.len(),
            edges.len() + 1,
            "split_bins needs one name per region"
        );
        let values: Vec<Option<f64>> = self.rows.iter().map(&column).collect();
        for (region, name) in names.iter().enumerate() {
            let mask: Vec<bool> = values
                .iter()
                .map(|v| match v {
                    Some(x) => region_of(*x, edges) == region,
                    None => false,
                })
                .collect();
            self.criteria.insert(name.to_string(), mask);
        }
    }

    /// Names of every tagged criterion, in sorted order.
    pub fn criterion_names(&self) -> impl Iterator<Item = &str> {
        self.criteria.keys().map(|s| s.as_str())
    }

    /// The cached mask for one criterion, honoring a `~` negation prefix.
    pub fn mask_for(&self, name: &str) -> Result<Vec<bool>> {
        let (negate, key) = match name.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, name),
        };
        let mask = self
            .criteria
            .get(key)
            .ok_or_else(|| CatalogError::UnknownCriterion(key.to_string()))?;
        Ok(if negate {
            mask.iter().map(|&m| !m).collect()
        } else {
            mask.clone()
        })
    }

    /// The combined mask for the intersection of several criteria.
    pub fn combined_mask(&self, names: &[&str]) -> Result<Vec<bool>> {
        let mut combined = vec![true; self.rows.len()];
        for name in names {
            let mask = self.mask_for(name)?;
            for (slot, m) in combined.iter_mut().zip(mask) {
                *slot &= m;
            }
        }
        Ok(combined)
    }

    /// Rows passing the intersection of the named criteria.
    pub fn subsample(&self, names: &[&str]) -> Result<Vec<R>> {
        let mask = self.combined_mask(names)?;
        Ok(self
            .rows
            .iter()
            .zip(mask)
            .filter_map(|(row, keep)| keep.then(|| row.clone()))
            .collect())
    }

    /// Count of rows passing the intersection, without cloning.
    pub fn subsample_count(&self, names: &[&str]) -> Result<usize> {
        Ok(self.combined_mask(names)?.iter().filter(|&&m| m).count())
    }
}

/// Index of the region `x` falls in: 0 below the first edge, `edges.len()`
/// at or above the last. Edges are half-open on the left, matching the
/// digitize convention `edges[i-1] <= x < edges[i]` for ascending edges.
fn region_of(x: f64, edges: &[f64]) -> usize {
    let ascending = edges.len() < 2 || edges[0] <= edges[edges.len() - 1];
    if ascending {
        edges.iter().take_while(|&&e| x >= e).count()
    } else {
        edges.iter().take_while(|&&e| x < e).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        teff: f64,
        prot: Option<f64>,
    }

    fn sample() -> SampleSplitter<Row> {
        let rows = vec![
            Row {
                teff: 4100.0,
                prot: Some(2.0),
            },
            Row {
                teff: 4800.0,
                prot: Some(12.0),
            },
            Row {
                teff: 5600.0,
                prot: None,
            },
            Row {
                teff: 6300.0,
                prot: Some(8.0),
            },
        ];
        SampleSplitter::new(rows)
    }

    #[test]
    fn test_tag_and_subsample() {
        let mut split = sample();
        split.tag("Cool", |r| r.teff < 5250.0);
        split.tag("Rapid", |r| r.prot.is_some_and(|p| p < 7.0));

        let cool = split.subsample(&["Cool"]).unwrap();
        assert_eq!(cool.len(), 2);

        let cool_rapid = split.subsample(&["Cool", "Rapid"]).unwrap();
        assert_eq!(cool_rapid.len(), 1);
        assert!((cool_rapid[0].teff - 4100.0).abs() < 1e-12);
    }

    #[test]
    fn test_negation() {
        let mut split = sample();
        split.tag("Cool", |r| r.teff < 5250.0);
        let hot = split.subsample(&["~Cool"]).unwrap();
        assert_eq!(hot.len(), 2);
    }

    #[test]
    fn test_empty_criteria_selects_everything() {
        let split = sample();
        assert_eq!(split.subsample(&[]).unwrap().len(), 4);
    }

    #[test]
    fn test_unknown_criterion_is_an_error() {
        let split = sample();
        let result = split.subsample(&["Dwarfs"]);
        assert!(matches!(
            result,
            Err(CatalogError::UnknownCriterion(name)) if name == "Dwarfs"
        ));
    }

    #[test]
    fn test_retag_replaces_mask() {
        let mut split = sample();
        split.tag("Cool", |r| r.teff < 5250.0);
        split.tag("Cool", |r| r.teff < 4500.0);
        assert_eq!(split.subsample_count(&["Cool"]).unwrap(), 1);
    }

    #[test]
    fn test_split_bins_regions() {
        let mut split = sample();
        split.split_bins(|r| r.prot, &[7.0, 10.0], &["Fast", "Transition", "Slow"]);
        assert_eq!(split.subsample_count(&["Fast"]).unwrap(), 1);
        assert_eq!(split.subsample_count(&["Transition"]).unwrap(), 1);
        assert_eq!(split.subsample_count(&["Slow"]).unwrap(), 1);
        // The row without a period lands in no region.
        let total: usize = ["Fast", "Transition", "Slow"]
            .iter()
            .map(|name| split.subsample_count(&[name]).unwrap())
            .sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_region_of_descending_edges() {
        // Period bins listed high-to-low, as the rotation figures use them.
        let edges = [10.0, 7.0, 1.5];
        assert_eq!(region_of(12.0, &edges), 0);
        assert_eq!(region_of(8.0, &edges), 1);
        assert_eq!(region_of(3.0, &edges), 2);
        assert_eq!(region_of(1.0, &edges), 3);
    }
}
