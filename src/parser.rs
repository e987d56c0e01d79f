/// Parser for the per-test coverage report text format.
///
/// Layout:
///   FILES <n>
///   <path> <func_count> <line_count>        (n times, each followed by:)
///   <mangled_name> <start_line> <edge_index> (func_count lines)
///   <line_number>                           (line_count lines)
///   TEST                                    (starts a test block)
///   SOURCE <id>                             (per touched source file:)
///   <hit edge indices, space separated>
///   <hit line numbers, space separated>
///   <separator>                             (any other line, ends the tests)
///   <test name>                             (one per test, until EOF)
///
/// The grammar is strict: reports are machine-generated, so any malformed
/// or missing record aborts the whole parse.
use std::io::BufRead;
use std::str::FromStr;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::{CovtreeError, ParseError, Result};
use crate::model::*;

/// Report parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportParser;

impl ReportParser {
    /// Parse a report held in memory.
    pub fn parse(&self, input: &[u8]) -> Result<ReportModel> {
        self.parse_reader(&mut &*input)
    }

    /// Parse a report from a buffered reader, line by line.
    pub fn parse_reader(&self, reader: &mut dyn BufRead) -> Result<ReportModel> {
        let started = Instant::now();
        let mut lines = LineReader::new(reader);
        let mut model = ReportModel::new();

        let header = lines.expect_line("FILES header")?;
        let file_count: usize = match header.split_whitespace().collect::<Vec<_>>()[..] {
            ["FILES", n] => parse_int(n, lines.line_no, "file count")?,
            _ => {
                return Err(ParseError::new(
                    lines.line_no,
                    format!("expected 'FILES <n>', got '{header}'"),
                )
                .into())
            }
        };

        model.files.reserve(file_count);
        for _ in 0..file_count {
            model.files.push(parse_file_block(&mut lines)?);
        }

        if parse_test_blocks(&mut lines, &mut model.tests)?.is_some() {
            model.test_names = parse_test_names(&mut lines)?;
        }

        if model.has_name_mismatch() {
            warn!(
                tests = model.tests.len(),
                names = model.test_names.len(),
                "Test name count does not match test block count"
            );
        }

        info!(
            tests = model.tests.len(),
            files = model.files.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Read the report"
        );

        Ok(model)
    }
}

/// Line source that tracks the current 1-based line number for errors.
struct LineReader<'a> {
    reader: &'a mut dyn BufRead,
    line_no: usize,
    buf: String,
}

impl<'a> LineReader<'a> {
    fn new(reader: &'a mut dyn BufRead) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                CovtreeError::from(ParseError::new(self.line_no + 1, "invalid UTF-8"))
            } else {
                CovtreeError::from(e)
            }
        })?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some(
            self.buf.trim_end_matches(['\n', '\r']).to_string(),
        ))
    }

    fn expect_line(&mut self, what: &str) -> Result<String> {
        self.next_line()?.ok_or_else(|| {
            ParseError::new(
                self.line_no + 1,
                format!("unexpected end of report, expected {what}"),
            )
            .into()
        })
    }
}

fn parse_int<T: FromStr>(token: &str, line: usize, what: &str) -> std::result::Result<T, ParseError> {
    token
        .parse::<T>()
        .map_err(|_| ParseError::new(line, format!("invalid {what}: '{token}'")))
}

fn parse_int_list(text: &str, line: usize, what: &str) -> std::result::Result<Vec<u32>, ParseError> {
    text.split_whitespace()
        .map(|token| parse_int(token, line, what))
        .collect()
}

/// `<path> <func_count> <line_count>` followed by its function and line records.
fn parse_file_block(lines: &mut LineReader<'_>) -> Result<SourceFile> {
    let header = lines.expect_line("source file record")?;
    let line_no = lines.line_no;
    let (path, func_count, line_count) = match header.split_whitespace().collect::<Vec<_>>()[..] {
        [path, funcs, instrumented] => (
            path,
            parse_int::<usize>(funcs, line_no, "function count")?,
            parse_int::<usize>(instrumented, line_no, "line count")?,
        ),
        _ => {
            return Err(ParseError::new(
                line_no,
                format!("expected '<path> <func_count> <line_count>', got '{header}'"),
            )
            .into())
        }
    };

    let mut file = SourceFile::new(path.to_string());

    for _ in 0..func_count {
        let record = lines.expect_line("function record")?;
        let line_no = lines.line_no;
        match record.split_whitespace().collect::<Vec<_>>()[..] {
            [name, start_line, edge_index] => {
                let start_line = parse_int(start_line, line_no, "function start line")?;
                let edge_index = parse_int(edge_index, line_no, "edge index")?;
                file.insert_function(
                    edge_index,
                    FunctionInfo {
                        name: name.to_string(),
                        start_line,
                    },
                );
            }
            _ => {
                return Err(ParseError::new(
                    line_no,
                    format!("expected '<name> <start_line> <edge_index>', got '{record}'"),
                )
                .into())
            }
        }
    }

    file.instrumented_lines.reserve(line_count);
    for _ in 0..line_count {
        let record = lines.expect_line("instrumented line number")?;
        let line_number = parse_int(record.trim(), lines.line_no, "line number")?;
        file.instrumented_lines.push(line_number);
    }

    Ok(file)
}

/// Read TEST/SOURCE blocks into `tests`. Returns the first line that belongs
/// to neither, if any. That line separates the blocks from the names and is
/// not a name itself.
fn parse_test_blocks(
    lines: &mut LineReader<'_>,
    tests: &mut Vec<TestRecord>,
) -> Result<Option<String>> {
    let mut pending = TestRecord::new();

    let stop_line = loop {
        let Some(line) = lines.next_line()? else {
            break None;
        };

        if line == "TEST" {
            if !pending.is_empty() {
                tests.push(std::mem::take(&mut pending));
            }
            continue;
        }

        if !line.starts_with("SOURCE") {
            break Some(line);
        }

        let line_no = lines.line_no;
        let source_id: usize = match line.split_whitespace().collect::<Vec<_>>()[..] {
            ["SOURCE", id] => parse_int(id, line_no, "source id")?,
            _ => {
                return Err(ParseError::new(
                    line_no,
                    format!("expected 'SOURCE <id>', got '{line}'"),
                )
                .into())
            }
        };

        let funcs = lines.expect_line("hit function list")?;
        let functions = parse_int_list(&funcs, lines.line_no, "hit edge index")?;
        let hit_lines = lines.expect_line("hit line list")?;
        let hit_lines = parse_int_list(&hit_lines, lines.line_no, "hit line number")?;

        // A repeated SOURCE within one block accumulates.
        let hits = pending.entry(source_id).or_default();
        hits.functions.extend(functions);
        hits.lines.extend(hit_lines);
    };

    if !pending.is_empty() {
        tests.push(pending);
    }

    Ok(stop_line)
}

/// Every remaining line is a name, positionally matching the test blocks.
/// Blank names keep their slot so later names stay on the right test.
fn parse_test_names(lines: &mut LineReader<'_>) -> Result<Vec<String>> {
    let mut names = Vec::new();
    while let Some(name) = lines.next_line()? {
        names.push(name);
    }
    if names.last().is_some_and(String::is_empty) {
        names.pop();
    }
    Ok(names)
}
