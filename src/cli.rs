//! Command handler functions for the covtree CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::aggregate::aggregate;
use crate::config::{self, Config};
use crate::frame::{BinaryFrameReader, Endianness};
use crate::model::ReportModel;
use crate::parser::ReportParser;
use crate::render::{self, JsonRenderer};
use crate::tree::{CoverageTree, TreeBuilder};

/// Config file values overridden by whatever flags were given.
pub fn resolve_config(
    config_path: Option<&Path>,
    source_root: Option<PathBuf>,
    exclude: &[String],
) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if source_root.is_some() {
        config.source_root = source_root;
    }
    if !exclude.is_empty() {
        config.excluded_markers = exclude.to_vec();
    }
    Ok(config)
}

pub fn load_report(path: &Path) -> Result<ReportModel> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    ReportParser
        .parse_reader(&mut reader)
        .with_context(|| format!("Failed to parse report {}", path.display()))
}

fn build(model: &ReportModel, config: &Config) -> CoverageTree {
    TreeBuilder::new(config).build(model, &aggregate(&model.tests))
}

pub fn cmd_summary(report: &Path, config: &Config) -> Result<String> {
    let model = load_report(report)?;
    let tree = build(&model, config);
    Ok(render::format_summary(&tree))
}

pub fn cmd_render(report: &Path, out_dir: &Path, config: &Config) -> Result<String> {
    let model = load_report(report)?;
    let tree = build(&model, config);
    let mut renderer = JsonRenderer::new(out_dir);
    let stats = render::render_tree(&tree, &model, config, &mut renderer)
        .with_context(|| format!("Failed to render into {}", out_dir.display()))?;
    Ok(format!(
        "Rendered {} directories and {} files into {} ({} skipped: source not found)\n",
        stats.directories,
        stats.files,
        out_dir.display(),
        stats.skipped,
    ))
}

/// Decode every string in a binary frame file, one per line.
pub fn cmd_frame(file: &Path, endian: Endianness, count: Option<usize>) -> Result<String> {
    let input = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let reader = BinaryFrameReader::new(BufReader::new(input), endian);

    let mut out = String::new();
    for (i, s) in reader.take(count.unwrap_or(usize::MAX)).enumerate() {
        let s = s.with_context(|| format!("Failed to decode string #{i}"))?;
        out.push_str(&s);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameWriter;

    fn write_sample(dir: &Path) -> PathBuf {
        let path = dir.join("report.ccr");
        std::fs::write(&path, include_bytes!("../tests/fixtures/sample.ccr")).unwrap();
        path
    }

    #[test]
    fn test_cmd_summary() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_sample(dir.path());
        let out = cmd_summary(&report, &Config::default()).unwrap();
        assert!(out.contains("TOTAL"));
        assert!(out.contains("Common"));
        assert!(!out.contains("zlib"));
    }

    #[test]
    fn test_cmd_summary_without_exclusions() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_sample(dir.path());
        let mut config = Config::default();
        config.excluded_markers.clear();
        let out = cmd_summary(&report, &config).unwrap();
        assert!(out.contains("4 files in 3 directories"));
    }

    #[test]
    fn test_cmd_summary_bad_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("bad.ccr");
        std::fs::write(&report, "FILES 2\na.cpp 0 0\n").unwrap();
        let err = cmd_summary(&report, &Config::default()).unwrap_err();
        assert!(format!("{err:#}").contains("line 3"));
    }

    #[test]
    fn test_cmd_render_writes_pages() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_sample(dir.path());
        let sources = dir.path().join("sources");
        std::fs::create_dir_all(sources.join("Server")).unwrap();
        std::fs::write(sources.join("Server/TCPHandler.cpp"), "void run() {}\n").unwrap();
        let out_dir = dir.path().join("out");

        let config = resolve_config(None, Some(sources), &[]).unwrap();
        let out = cmd_render(&report, &out_dir, &config).unwrap();

        assert!(out.contains("Rendered 2 directories and 1 files"));
        assert!(out_dir.join("index.json").exists());
        assert!(out_dir.join("Server/index.json").exists());
        assert!(out_dir.join("Common/index.json").exists());
        assert!(out_dir.join("Server/TCPHandler.cpp.json").exists());
        assert!(!out_dir.join("Server/Server.cpp.json").exists());

        let root: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out_dir.join("index.json")).unwrap())
                .unwrap();
        assert_eq!(root["entries"][1]["url"], "Server");
        assert_eq!(root["special_entries"][0]["lines"]["total"], 7);
    }

    #[test]
    fn test_resolve_config_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covtree.toml");
        std::fs::write(&path, "root_marker = \"project/\"\nexcluded_markers = [\"a/\"]\n").unwrap();

        let config = resolve_config(Some(&path), None, &["b/".to_string()]).unwrap();
        assert_eq!(config.root_marker, "project/");
        assert_eq!(config.excluded_markers, vec!["b/"]);
        assert!(config.source_root.is_none());
    }

    #[test]
    fn test_cmd_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.bin");
        let mut writer = FrameWriter::new(Vec::new(), Endianness::Little);
        writer.write_str("00001_select").unwrap();
        writer.write_str("00002_insert").unwrap();
        std::fs::write(&path, writer.into_inner()).unwrap();

        let out = cmd_frame(&path, Endianness::Little, None).unwrap();
        assert_eq!(out, "00001_select\n00002_insert\n");
        let out = cmd_frame(&path, Endianness::Little, Some(1)).unwrap();
        assert_eq!(out, "00001_select\n");
        assert!(cmd_frame(&path, Endianness::Big, None).is_err());
    }
}
