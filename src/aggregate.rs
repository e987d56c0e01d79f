//! Merging of per-test hit records into per-file hit sets.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{SourceHits, TestRecord};

/// Union of every test's hits, keyed by source file id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedHits {
    hits: BTreeMap<usize, SourceHits>,
    touching_tests: BTreeMap<usize, BTreeSet<usize>>,
}

impl AggregatedHits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one test's record in. `test_index` is the test's position in
    /// the report.
    pub fn add(&mut self, test_index: usize, record: &TestRecord) {
        for (&source_id, source_hits) in record {
            self.hits.entry(source_id).or_default().merge(source_hits);
            self.touching_tests
                .entry(source_id)
                .or_default()
                .insert(test_index);
        }
    }

    /// Union of hit functions and lines for a source file, if any test
    /// touched it.
    #[must_use]
    pub fn hits(&self, source_id: usize) -> Option<&SourceHits> {
        self.hits.get(&source_id)
    }

    /// Indices of the tests whose record mentions `source_id`, whether or
    /// not anything in it was hit.
    #[must_use]
    pub fn touching_tests(&self, source_id: usize) -> BTreeSet<usize> {
        self.touching_tests
            .get(&source_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Merge all test records. Pure function of its input.
#[must_use]
pub fn aggregate(tests: &[TestRecord]) -> AggregatedHits {
    tests
        .iter()
        .enumerate()
        .fold(AggregatedHits::new(), |mut acc, (index, record)| {
            acc.add(index, record);
            acc
        })
}
