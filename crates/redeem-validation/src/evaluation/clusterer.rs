use std::collections::BTreeMap;
use std::ops::RangeBounds;

use serde::Serialize;

use crate::data_handling::{InstanceStore, Schema};
use crate::error::Result;
use crate::models::Model;

/// Cluster assignment of one instance; `cluster` is -1 when the model failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterRecord {
    pub fold: usize,
    pub cluster: i64,
}

/// Records cluster membership per test instance.
///
/// Cluster ids are kept sparse, so a model is free to hand out arbitrary
/// non-negative ids when the expected cluster count is unknown.
#[derive(Debug, Clone)]
pub struct ClustererEvaluator {
    /// Expected cluster count from the schema, 0 when unknown.
    expected: usize,
    records: Vec<Option<ClusterRecord>>,
    completed: Vec<usize>,
}

impl ClustererEvaluator {
    /// With a known `schema.num_classes`, ids outside `0..num_classes` are
    /// recorded as failures.
    pub fn new(schema: &Schema, len: usize) -> Self {
        Self {
            expected: schema.num_classes,
            records: vec![None; len],
            completed: Vec::new(),
        }
    }

    /// The expected cluster count, or the number of distinct ids seen so far
    /// when it is unknown.
    pub fn num_clusters(&self) -> usize {
        if self.expected > 0 {
            self.expected
        } else {
            self.counts(..).len()
        }
    }

    pub fn records(&self) -> &[Option<ClusterRecord>] {
        &self.records
    }

    pub fn completed_folds(&self) -> &[usize] {
        &self.completed
    }

    pub fn test_fold(
        &mut self,
        model: &dyn Model,
        test: &InstanceStore,
        positions: &[usize],
        fold: usize,
    ) -> Result<()> {
        let expected = self.expected as u64;
        let accepted = |id: i64| id >= 0 && (expected == 0 || (id as u64) < expected);
        for (j, &pos) in positions.iter().enumerate() {
            let value = test.instance(j)?;
            let label = model.classify(&value).map(|c| c.label);
            let cluster = match label {
                Some(id) if accepted(id) => id,
                other => {
                    log::trace!(
                        "Instance {} could not be assigned a cluster (model returned {:?})",
                        pos,
                        other
                    );
                    -1
                }
            };
            self.records[pos] = Some(ClusterRecord { fold, cluster });
        }
        self.completed.push(fold);
        Ok(())
    }

    pub fn finish(&mut self) {
        log::info!(
            "Clustering finished: {} clusters, membership {:?}, {} failures",
            self.num_clusters(),
            self.histogram(..),
            self.failure_count(..)
        );
    }

    /// Absolute membership counts per cluster id. Every expected cluster is
    /// present, empty ones with a count of 0.
    pub fn counts<R: RangeBounds<usize>>(&self, folds: R) -> BTreeMap<usize, usize> {
        let mut counts: BTreeMap<usize, usize> = (0..self.expected).map(|c| (c, 0)).collect();
        for r in self.records.iter().flatten() {
            if r.cluster >= 0 && folds.contains(&r.fold) {
                *counts.entry(r.cluster as usize).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Relative membership per cluster id over assigned instances; all zeros
    /// when nothing was assigned.
    pub fn histogram<R: RangeBounds<usize>>(&self, folds: R) -> BTreeMap<usize, f64> {
        let counts = self.counts(folds);
        let total: usize = counts.values().sum();
        counts
            .into_iter()
            .map(|(id, c)| {
                let share = if total == 0 { 0.0 } else { c as f64 / total as f64 };
                (id, share)
            })
            .collect()
    }

    pub fn fold_histogram(&self, fold: usize) -> BTreeMap<usize, f64> {
        self.histogram(fold..=fold)
    }

    pub fn failure_count<R: RangeBounds<usize>>(&self, folds: R) -> usize {
        self.records
            .iter()
            .flatten()
            .filter(|r| r.cluster < 0 && folds.contains(&r.fold))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::InstanceValue;
    use crate::models::{Capabilities, Classification};

    /// Returns the first feature as the cluster id.
    struct Passthrough;

    impl Model for Passthrough {
        fn capabilities(&self) -> Capabilities {
            Capabilities::CLASSIFIER
        }

        fn is_supervised(&self) -> bool {
            false
        }

        fn train(&mut self, _store: &InstanceStore) -> anyhow::Result<()> {
            Ok(())
        }

        fn classify(&self, value: &InstanceValue) -> Option<Classification> {
            let id = value.get(0)?;
            let label = if id.is_finite() { id as i64 } else { i64::MAX };
            Some(Classification::new(label, Vec::new()))
        }
    }

    fn ids(values: &[f64]) -> InstanceStore {
        InstanceStore::from_unlabeled(values.iter().map(|&v| vec![v]).collect())
    }

    #[test]
    fn ids_beyond_expected_count_are_failures() {
        let store = ids(&[0.0, 1.0, 1.0, 7.0, f64::INFINITY]);
        let mut eval = ClustererEvaluator::new(&Schema::unsupervised(1, 2), 5);
        eval.test_fold(&Passthrough, &store, &[0, 1, 2, 3, 4], 1).unwrap();

        assert_eq!(eval.failure_count(..), 2);
        assert_eq!(eval.num_clusters(), 2);
        assert_eq!(eval.counts(..), BTreeMap::from([(0, 1), (1, 2)]));
        eval.finish();
    }

    #[test]
    fn huge_ids_are_kept_sparse_when_count_is_unknown() {
        // infinity maps to i64::MAX
        let store = ids(&[3.0, f64::INFINITY, 3.0, -1.0]);
        let mut eval = ClustererEvaluator::new(&Schema::unsupervised(1, 0), 4);
        eval.test_fold(&Passthrough, &store, &[0, 1, 2, 3], 1).unwrap();
        eval.finish();

        assert_eq!(eval.num_clusters(), 2);
        assert_eq!(eval.failure_count(..), 1);
        let big = i64::MAX as usize;
        assert_eq!(eval.counts(..), BTreeMap::from([(3, 2), (big, 1)]));
        let hist = eval.histogram(..);
        assert!((hist[&3] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn fold_histograms_split_by_fold() {
        let store = ids(&[0.0, 1.0, 1.0, 1.0]);
        let mut view = store.clone();
        let mut eval = ClustererEvaluator::new(&Schema::unsupervised(1, 2), 4);

        view.reorder(&[0, 1]).unwrap();
        eval.test_fold(&Passthrough, &view, &[0, 1], 1).unwrap();
        let mut view = store.clone();
        view.reorder(&[2, 3]).unwrap();
        eval.test_fold(&Passthrough, &view, &[2, 3], 2).unwrap();

        assert_eq!(eval.fold_histogram(1), BTreeMap::from([(0, 0.5), (1, 0.5)]));
        assert_eq!(eval.fold_histogram(2), BTreeMap::from([(0, 0.0), (1, 1.0)]));
        assert_eq!(eval.histogram(..), BTreeMap::from([(0, 0.25), (1, 0.75)]));
    }
}
