//! Property-based tests for the aggregation and framing invariants.

use std::collections::BTreeSet;

use covtree::aggregate::AggregatedHits;
use covtree::frame::{BinaryFrameReader, Endianness, FrameWriter};
use covtree::model::{percent, Metric, SourceHits, TestRecord};
use covtree::tree::{DirCoverage, FileCoverage, LineHit};
use proptest::prelude::*;

fn arb_record() -> impl Strategy<Value = TestRecord> {
    prop::collection::btree_map(
        0usize..4,
        (
            prop::collection::btree_set(0u32..50, 0..8),
            prop::collection::btree_set(0u32..200, 0..16),
        )
            .prop_map(|(functions, lines)| SourceHits { functions, lines }),
        0..4,
    )
}

fn arb_file() -> impl Strategy<Value = FileCoverage> {
    (
        prop::collection::vec(any::<bool>(), 0..30),
        prop::collection::btree_set(0usize..10, 0..5),
    )
        .prop_map(|(hits, touching_tests)| FileCoverage {
            path: "d/f.cpp".to_string(),
            prefix: String::new(),
            lines: hits
                .into_iter()
                .enumerate()
                .map(|(i, hit)| LineHit { line: i as u32 + 1, hit })
                .collect(),
            functions: vec![],
            touching_tests,
            tests_total: 10,
        })
}

proptest! {
    #[test]
    fn prop_percent_zero_total(hit in 0u64..1_000_000) {
        prop_assert_eq!(percent(hit, 0), 0);
    }

    #[test]
    fn prop_percent_floors(total in 1u64..100_000, frac in 0.0f64..=1.0) {
        let hit = ((total as f64) * frac) as u64;
        let hit = hit.min(total);
        prop_assert_eq!(percent(hit, total), hit * 100 / total);
        prop_assert!(percent(hit, total) <= 100);
    }

    /// Adding records only ever grows the per-source hit sets.
    #[test]
    fn prop_aggregation_is_monotonic(records in prop::collection::vec(arb_record(), 0..10)) {
        let mut agg = AggregatedHits::new();
        for (i, record) in records.iter().enumerate() {
            let before: Vec<_> = (0..4).map(|id| agg.hits(id).cloned().unwrap_or_default()).collect();
            agg.add(i, record);
            for (id, old) in before.iter().enumerate() {
                let new = agg.hits(id).cloned().unwrap_or_default();
                prop_assert!(old.functions.is_subset(&new.functions));
                prop_assert!(old.lines.is_subset(&new.lines));
            }
            for (id, hits) in record {
                let merged = agg.hits(*id).unwrap();
                prop_assert!(hits.lines.is_subset(&merged.lines));
                prop_assert!(agg.touching_tests(*id).contains(&i));
            }
        }
    }

    #[test]
    fn prop_directory_totals_are_sums(files in prop::collection::vec(arb_file(), 0..8)) {
        let expected = files.iter().fold(Metric::default(), |acc, f| {
            let hit = f.lines.iter().filter(|l| l.hit).count() as u64;
            acc + Metric::new(hit, f.lines.len() as u64)
        });
        let union: BTreeSet<usize> = files.iter().flat_map(|f| f.touching_tests.iter().copied()).collect();
        let max = files.iter().map(|f| f.touching_tests.len() as u64).max().unwrap_or(0);

        let dir = files.into_iter().fold(DirCoverage::new("d", 10), DirCoverage::fold);

        prop_assert_eq!(dir.lines, expected);
        prop_assert!(dir.lines.hit <= dir.lines.total);
        prop_assert_eq!(dir.touching_tests, union);
        prop_assert_eq!(dir.tests.count, max);
    }

    #[test]
    fn prop_frame_roundtrip(s in "\\PC{0,40}", little in any::<bool>()) {
        // Trailing NULs are padding and cannot round-trip.
        prop_assume!(!s.ends_with('\0'));
        let endian = if little { Endianness::Little } else { Endianness::Big };
        let mut writer = FrameWriter::new(Vec::new(), endian);
        writer.write_str(&s).unwrap();
        let bytes = writer.into_inner();
        let decoded = BinaryFrameReader::new(&bytes[..], endian).read_str().unwrap();
        prop_assert_eq!(decoded, s);
    }
}
