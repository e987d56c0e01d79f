//! Page models handed to renderers, plus a JSON renderer and a plain-text
//! summary.
//!
//! Two page shapes exist. A directory page lists the directory's files and
//! has a `../` entry back to the root. The root ("upper level") page lists
//! the top-level directories, each linked by its own name.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Bounds, Config, CoverageLevel, Threshold};
use crate::error::Result;
use crate::model::{Metric, ReportModel, TestMetric};
use crate::tree::{CoverageTree, DirCoverage, FileCoverage, FunctionHit, LineHit, RootCoverage, Rollup};

/// Hit/total pair with its derived percentage and level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricView {
    pub hit: u64,
    pub total: u64,
    pub percent: u64,
    pub level: CoverageLevel,
}

impl MetricView {
    fn new(metric: Metric, threshold: &Threshold) -> Self {
        Self {
            hit: metric.hit,
            total: metric.total,
            percent: metric.percent(),
            level: threshold.classify(metric.percent()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestView {
    pub count: u64,
    pub percent: u64,
    pub level: CoverageLevel,
}

impl TestView {
    fn new(metric: TestMetric, threshold: &Threshold) -> Self {
        Self {
            count: metric.count,
            percent: metric.percent(),
            level: threshold.classify(metric.percent()),
        }
    }
}

/// One row of a directory page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageEntry {
    pub name: String,
    pub url: String,
    pub lines: MetricView,
    pub functions: MetricView,
    pub tests: TestView,
}

impl PageEntry {
    fn from_node(node: &impl Rollup, url: String, bounds: &Bounds) -> Self {
        Self {
            name: node.name().to_string(),
            url,
            lines: MetricView::new(node.line_metric(), &bounds.lines),
            functions: MetricView::new(node.function_metric(), &bounds.functions),
            tests: TestView::new(node.test_metric(), &bounds.tests),
        }
    }

    fn parent(tests_total: u64, bounds: &Bounds) -> Self {
        Self {
            name: "../".to_string(),
            url: "../".to_string(),
            lines: MetricView::new(Metric::default(), &bounds.lines),
            functions: MetricView::new(Metric::default(), &bounds.functions),
            tests: TestView::new(
                TestMetric {
                    count: 0,
                    tests_total,
                },
                &bounds.tests,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryPage {
    /// Output directory relative to the report root; empty for the root.
    pub location: String,
    pub special_entries: Vec<PageEntry>,
    pub entries: Vec<PageEntry>,
    pub tests_total: u64,
}

impl DirectoryPage {
    /// Page for one directory; entries are its files, in name order.
    pub fn directory(dir: &DirCoverage, bounds: &Bounds, extension: &str) -> Self {
        let tests_total = dir.tests.tests_total;
        let mut files: Vec<&FileCoverage> = dir.children.iter().collect();
        files.sort_by(|a, b| a.file_name().cmp(b.file_name()));

        Self {
            location: dir.name.clone(),
            special_entries: vec![
                PageEntry::parent(tests_total, bounds),
                PageEntry::from_node(dir, String::new(), bounds),
            ],
            entries: files
                .into_iter()
                .map(|f| PageEntry::from_node(f, format!("{}.{extension}", f.file_name()), bounds))
                .collect(),
            tests_total,
        }
    }

    /// Upper-level page; entries are the top-level directories, each
    /// addressed by its own name.
    pub fn root(root: &RootCoverage, bounds: &Bounds) -> Self {
        let mut dirs: Vec<&DirCoverage> = root.children.iter().collect();
        dirs.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            location: String::new(),
            special_entries: vec![PageEntry::from_node(root, String::new(), bounds)],
            entries: dirs
                .into_iter()
                .map(|d| PageEntry::from_node(d, d.name.clone(), bounds))
                .collect(),
            tests_total: root.tests.tests_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePage {
    /// Directory the page is written under.
    pub dir: String,
    pub name: String,
    pub path: String,
    pub source_path: PathBuf,
    pub source: String,
    pub lines: Vec<LineHit>,
    pub functions: Vec<FunctionHit>,
    pub summary: PageEntry,
    /// Names of the tests touching this file.
    pub tests: Vec<String>,
    pub tests_total: u64,
}

/// Where a file's source lives on disk.
#[must_use]
pub fn source_path(file: &FileCoverage, config: &Config) -> PathBuf {
    match &config.source_root {
        Some(root) => root.join(&file.path),
        None => PathBuf::from(format!("{}{}", file.prefix, file.path)),
    }
}

/// Output sink for rendered pages.
pub trait Renderer {
    /// File extension used in links between pages.
    fn extension(&self) -> &str;

    fn render_directory(&mut self, page: &DirectoryPage) -> Result<()>;

    fn render_file(&mut self, page: &FilePage) -> Result<()>;
}

/// Counts from a `render_tree` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub directories: usize,
    pub files: usize,
    /// Files whose source was missing on disk.
    pub skipped: usize,
}

/// Render every directory page and its file pages, then the root page.
/// A missing source file skips only that file's page.
pub fn render_tree(
    tree: &CoverageTree,
    model: &ReportModel,
    config: &Config,
    renderer: &mut dyn Renderer,
) -> Result<RenderStats> {
    let bounds = &config.bounds;
    let mut stats = RenderStats::default();

    for dir in tree.directories() {
        let page = DirectoryPage::directory(dir, bounds, renderer.extension());
        renderer.render_directory(&page)?;
        stats.directories += 1;

        for file in &dir.children {
            let path = source_path(file, config);
            if !path.exists() {
                warn!(path = %path.display(), "No source file, skipping page");
                stats.skipped += 1;
                continue;
            }

            let source = std::fs::read_to_string(&path)?;
            let page = FilePage {
                dir: dir.name.clone(),
                name: file.file_name().to_string(),
                path: file.path.clone(),
                source_path: path,
                source,
                lines: file.lines.clone(),
                functions: file.functions.clone(),
                summary: PageEntry::from_node(file, String::new(), bounds),
                tests: file
                    .touching_tests
                    .iter()
                    .map(|&i| {
                        model
                            .test_name(i)
                            .map_or_else(|| format!("#{i}"), str::to_string)
                    })
                    .collect(),
                tests_total: tree.tests_total(),
            };
            renderer.render_file(&page)?;
            stats.files += 1;
        }
    }

    renderer.render_directory(&DirectoryPage::root(&tree.root, bounds))?;

    info!(
        directories = stats.directories,
        files = stats.files,
        skipped = stats.skipped,
        "Rendered coverage tree"
    );
    Ok(stats)
}

/// Writes each page as pretty-printed JSON:
/// `<out>/<dir>/index.json`, `<out>/<dir>/<file>.json`, `<out>/index.json`.
#[derive(Debug, Clone)]
pub struct JsonRenderer {
    out_dir: PathBuf,
}

impl JsonRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    fn write(&self, dir: &Path, file_name: &str, value: &impl Serialize) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(dir.join(file_name), json)?;
        Ok(())
    }
}

impl Renderer for JsonRenderer {
    fn extension(&self) -> &str {
        "json"
    }

    fn render_directory(&mut self, page: &DirectoryPage) -> Result<()> {
        self.write(&self.out_dir.join(&page.location), "index.json", page)
    }

    fn render_file(&mut self, page: &FilePage) -> Result<()> {
        self.write(
            &self.out_dir.join(&page.dir),
            &format!("{}.json", page.name),
            page,
        )
    }
}

fn format_metric(metric: Metric) -> String {
    format!("{}/{} ({}%)", metric.hit, metric.total, metric.percent())
}

/// Per-directory table followed by report totals.
#[must_use]
pub fn format_summary(tree: &CoverageTree) -> String {
    let mut out = String::new();
    let root = &tree.root;

    writeln!(
        out,
        "{:<50} {:>20} {:>20} {:>12}",
        "DIRECTORY", "LINES", "FUNCTIONS", "TESTS"
    )
    .unwrap();
    writeln!(out, "{}", "-".repeat(105)).unwrap();
    for dir in tree.directories() {
        writeln!(
            out,
            "{:<50} {:>20} {:>20} {:>12}",
            dir.name,
            format_metric(dir.lines),
            format_metric(dir.functions),
            format!("{} ({}%)", dir.tests.count, dir.tests.percent()),
        )
        .unwrap();
    }
    writeln!(out, "{}", "-".repeat(105)).unwrap();
    writeln!(
        out,
        "{:<50} {:>20} {:>20} {:>12}",
        "TOTAL",
        format_metric(root.lines),
        format_metric(root.functions),
        format!("{} ({}%)", root.tests.count, root.tests.percent()),
    )
    .unwrap();
    writeln!(
        out,
        "{} files in {} directories, {} tests",
        tree.files().count(),
        root.children.len(),
        root.tests.tests_total
    )
    .unwrap();
    out
}
