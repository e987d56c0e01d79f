//! In-memory representation of a parsed per-test coverage report. The
//! parser produces a `ReportModel`, which is then aggregated and folded
//! into a coverage tree.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Integer coverage percentage, returning 0 when the total is zero.
#[must_use]
pub fn percent(hit: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        hit * 100 / total
    }
}

/// A function known to the instrumentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub start_line: u32,
}

/// One instrumented source file as declared in the report header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    /// `(edge index, function)` pairs in report order. Edge indices are
    /// unique; see `insert_function`.
    pub functions: Vec<(u32, FunctionInfo)>,
    /// Instrumented line numbers, in file order.
    pub instrumented_lines: Vec<u32>,
}

impl SourceFile {
    pub fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    /// Record a function. A repeated edge index replaces the earlier entry
    /// in place, keeping its position.
    pub fn insert_function(&mut self, edge_index: u32, info: FunctionInfo) {
        match self.functions.iter_mut().find(|(edge, _)| *edge == edge_index) {
            Some((_, existing)) => *existing = info,
            None => self.functions.push((edge_index, info)),
        }
    }

    #[must_use]
    pub fn function(&self, edge_index: u32) -> Option<&FunctionInfo> {
        self.functions
            .iter()
            .find(|(edge, _)| *edge == edge_index)
            .map(|(_, info)| info)
    }
}

/// Function edge indices and line numbers hit within one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceHits {
    pub functions: BTreeSet<u32>,
    pub lines: BTreeSet<u32>,
}

impl SourceHits {
    /// Union `other` into `self`.
    pub fn merge(&mut self, other: &SourceHits) {
        self.functions.extend(other.functions.iter().copied());
        self.lines.extend(other.lines.iter().copied());
    }
}

/// Hits recorded by a single test, keyed by source file id (the position
/// of the file in the report header).
pub type TestRecord = BTreeMap<usize, SourceHits>;

/// The complete result of parsing one report.
#[derive(Debug, Clone, Default)]
pub struct ReportModel {
    pub files: Vec<SourceFile>,
    pub tests: Vec<TestRecord>,
    pub test_names: Vec<String>,
}

impl ReportModel {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tests_total(&self) -> u64 {
        self.tests.len() as u64
    }

    /// Name of the test at `index`. Reports don't guarantee one name per
    /// test block, so this may be `None`.
    #[must_use]
    pub fn test_name(&self, index: usize) -> Option<&str> {
        self.test_names.get(index).map(String::as_str)
    }

    /// True when the number of trailing name lines differs from the number
    /// of recorded tests.
    #[must_use]
    pub fn has_name_mismatch(&self) -> bool {
        self.test_names.len() != self.tests.len()
    }
}

/// A hit/total pair for lines or functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub hit: u64,
    pub total: u64,
}

impl Metric {
    #[must_use]
    pub fn new(hit: u64, total: u64) -> Self {
        debug_assert!(hit <= total);
        Self { hit, total }
    }

    #[must_use]
    pub fn percent(&self) -> u64 {
        percent(self.hit, self.total)
    }
}

impl std::ops::Add for Metric {
    type Output = Metric;

    fn add(self, rhs: Metric) -> Metric {
        Metric {
            hit: self.hit + rhs.hit,
            total: self.total + rhs.total,
        }
    }
}

/// Number of tests touching a node, relative to all tests in the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TestMetric {
    pub count: u64,
    pub tests_total: u64,
}

impl TestMetric {
    #[must_use]
    pub fn percent(&self) -> u64 {
        percent(self.count, self.tests_total)
    }
}
