//! Folding of per-file hit sets into a directory → file coverage tree.
//!
//! Every node carries line and function hit/total pairs that are plain sums
//! over its children, the union of the test indices touching any child, and
//! a test count. The test count is the running maximum of the children's
//! counts, not the size of the union: a directory whose files are touched
//! by 3 and 1 distinct tests reports 3 even though 4 tests touch it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::aggregate::AggregatedHits;
use crate::config::Config;
use crate::model::{Metric, ReportModel, SourceFile, TestMetric};

/// Directory name used for files with no directory component.
pub const TOP_LEVEL_DIR: &str = "(top-level)";

/// Anything that can be folded into a `DirectoryCoverage`.
pub trait Rollup {
    fn name(&self) -> &str;
    fn line_metric(&self) -> Metric;
    fn function_metric(&self) -> Metric;
    fn test_metric(&self) -> TestMetric;
    fn touching_tests(&self) -> &BTreeSet<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineHit {
    pub line: u32,
    pub hit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionHit {
    pub name: String,
    pub start_line: u32,
    pub hit: bool,
}

/// Coverage of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCoverage {
    /// Path with the source-root prefix stripped.
    pub path: String,
    /// Source-root prefix, used only to find the file on disk.
    pub prefix: String,
    /// Every instrumented line, in file order.
    pub lines: Vec<LineHit>,
    /// Every known function, in report order.
    pub functions: Vec<FunctionHit>,
    pub touching_tests: BTreeSet<usize>,
    pub tests_total: u64,
}

impl FileCoverage {
    /// Derive a file's coverage from its declaration and the aggregated hits.
    pub fn derive(
        source_id: usize,
        file: &SourceFile,
        hits: &AggregatedHits,
        prefix: &str,
        path: &str,
        tests_total: u64,
    ) -> Self {
        let source_hits = hits.hits(source_id);
        let line_hit = |line: &u32| source_hits.is_some_and(|h| h.lines.contains(line));
        let function_hit = |edge: &u32| source_hits.is_some_and(|h| h.functions.contains(edge));

        Self {
            path: path.to_string(),
            prefix: prefix.to_string(),
            lines: file
                .instrumented_lines
                .iter()
                .map(|line| LineHit {
                    line: *line,
                    hit: line_hit(line),
                })
                .collect(),
            functions: file
                .functions
                .iter()
                .map(|(edge, info)| FunctionHit {
                    name: info.name.clone(),
                    start_line: info.start_line,
                    hit: function_hit(edge),
                })
                .collect(),
            touching_tests: hits.touching_tests(source_id),
            tests_total,
        }
    }

    /// Final path component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Directory component, or `TOP_LEVEL_DIR` for a bare file name.
    #[must_use]
    pub fn dir_name(&self) -> &str {
        match self.path.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => dir,
            _ => TOP_LEVEL_DIR,
        }
    }
}

impl Rollup for FileCoverage {
    fn name(&self) -> &str {
        self.file_name()
    }

    fn line_metric(&self) -> Metric {
        let hit = self.lines.iter().filter(|l| l.hit).count();
        Metric::new(hit as u64, self.lines.len() as u64)
    }

    fn function_metric(&self) -> Metric {
        let hit = self.functions.iter().filter(|f| f.hit).count();
        Metric::new(hit as u64, self.functions.len() as u64)
    }

    fn test_metric(&self) -> TestMetric {
        TestMetric {
            count: self.touching_tests.len() as u64,
            tests_total: self.tests_total,
        }
    }

    fn touching_tests(&self) -> &BTreeSet<usize> {
        &self.touching_tests
    }
}

/// A rolled-up node. Directories hold files; the root holds directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCoverage<C> {
    pub name: String,
    pub children: Vec<C>,
    pub lines: Metric,
    pub functions: Metric,
    pub tests: TestMetric,
    pub touching_tests: BTreeSet<usize>,
}

pub type DirCoverage = DirectoryCoverage<FileCoverage>;
pub type RootCoverage = DirectoryCoverage<DirCoverage>;

impl<C: Rollup> DirectoryCoverage<C> {
    pub fn new(name: impl Into<String>, tests_total: u64) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            lines: Metric::default(),
            functions: Metric::default(),
            tests: TestMetric {
                count: 0,
                tests_total,
            },
            touching_tests: BTreeSet::new(),
        }
    }

    /// Fold one child in. Sums are order-independent; the test count is the
    /// maximum over children folded so far.
    #[must_use]
    pub fn fold(mut self, child: C) -> Self {
        self.lines = self.lines + child.line_metric();
        self.functions = self.functions + child.function_metric();
        self.tests.count = self.tests.count.max(child.test_metric().count);
        self.touching_tests
            .extend(child.touching_tests().iter().copied());
        self.children.push(child);
        self
    }
}

impl<C> Rollup for DirectoryCoverage<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn line_metric(&self) -> Metric {
        self.lines
    }

    fn function_metric(&self) -> Metric {
        self.functions
    }

    fn test_metric(&self) -> TestMetric {
        self.tests
    }

    fn touching_tests(&self) -> &BTreeSet<usize> {
        &self.touching_tests
    }
}

/// The finished tree: a synthetic root over every directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageTree {
    pub root: RootCoverage,
}

impl CoverageTree {
    /// Directories in name order.
    pub fn directories(&self) -> impl Iterator<Item = &DirCoverage> {
        self.root.children.iter()
    }

    pub fn directory(&self, name: &str) -> Option<&DirCoverage> {
        self.root.children.iter().find(|d| d.name == name)
    }

    /// Every file, grouped by directory, each group in path order.
    pub fn files(&self) -> impl Iterator<Item = &FileCoverage> {
        self.directories().flat_map(|d| d.children.iter())
    }

    #[must_use]
    pub fn tests_total(&self) -> u64 {
        self.root.tests.tests_total
    }
}

/// Builds a `CoverageTree` from a parsed report.
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder<'a> {
    config: &'a Config,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn build(&self, model: &ReportModel, hits: &AggregatedHits) -> CoverageTree {
        let tests_total = model.tests_total();
        let mut groups: BTreeMap<String, Vec<FileCoverage>> = BTreeMap::new();

        for (source_id, file) in model.files.iter().enumerate() {
            if self.config.is_excluded(&file.path) {
                debug!(path = %file.path, "Excluding file");
                continue;
            }

            let (prefix, path) = self.config.split_root(&file.path);
            let coverage = FileCoverage::derive(source_id, file, hits, prefix, path, tests_total);
            groups
                .entry(coverage.dir_name().to_string())
                .or_default()
                .push(coverage);
        }

        let root = groups
            .into_iter()
            .map(|(dir, mut files)| {
                files.sort_by(|a, b| a.path.cmp(&b.path));
                files
                    .into_iter()
                    .fold(DirCoverage::new(dir, tests_total), DirCoverage::fold)
            })
            .fold(RootCoverage::new("", tests_total), RootCoverage::fold);

        CoverageTree { root }
    }
}
