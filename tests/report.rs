mod common;

use covtree::error::CovtreeError;
use covtree::model::Metric;
use covtree::parser::ReportParser;
use covtree::tree::Rollup;

#[test]
fn single_file_single_test() {
    let (_, tree) = common::build_tree(
        "FILES 1\nsrc/lib/a.cpp 1 2\nf 10 0\n10\n20\nTEST\nSOURCE 0\n\n10\n\ntest_a\n",
    );
    let file = tree.files().next().unwrap();

    assert_eq!(file.path, "lib/a.cpp");
    assert_eq!(file.line_metric(), Metric::new(1, 2));
    assert_eq!(file.line_metric().percent(), 50);
    assert_eq!(file.function_metric(), Metric::new(0, 1));
    assert_eq!(file.function_metric().percent(), 0);
    assert_eq!(file.test_metric().count, 1);
    assert_eq!(file.test_metric().percent(), 100);
}

#[test]
fn directory_lines_are_summed() {
    // a.cpp: 5 of 10 lines hit, b.cpp: 3 of 8.
    let report = "FILES 2\n\
        src/d/a.cpp 0 10\n1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n\
        src/d/b.cpp 0 8\n1\n2\n3\n4\n5\n6\n7\n8\n\
        TEST\nSOURCE 0\n\n1 2 3 4 5\nSOURCE 1\n\n1 2 3\n";
    let (_, tree) = common::build_tree(report);
    let dir = tree.directory("d").unwrap();

    assert_eq!(dir.lines, Metric::new(8, 18));
    assert_eq!(dir.lines.percent(), 44);
    assert_eq!(tree.root.lines, dir.lines);
}

#[test]
fn excluded_paths_are_absent_everywhere() {
    let report = "FILES 3\n\
        /b/src/Core/x.cpp 1 1\nx 1 0\n1\n\
        /b/contrib/lz4/lz4.c 1 2\nlz4 1 1\n1\n2\n\
        /b/base/common/y.cpp 0 1\n1\n\
        TEST\nSOURCE 1\n1\n1 2\nSOURCE 2\n\n1\n";
    let (_, tree) = common::build_tree(report);

    assert_eq!(tree.directories().count(), 1);
    assert!(tree.files().all(|f| f.path == "Core/x.cpp"));
    assert_eq!(tree.root.lines, Metric::new(0, 1));
    assert_eq!(tree.root.functions, Metric::new(0, 1));
    assert!(tree.root.touching_tests.is_empty());
}

#[test]
fn test_count_keeps_running_max() {
    // a.cpp touched by tests 0..3, b.cpp only by test 3. The union has 4
    // tests but the directory reports the largest per-file count.
    let report = "FILES 2\nsrc/d/a.cpp 0 1\n1\nsrc/d/b.cpp 0 1\n1\n\
        TEST\nSOURCE 0\n\n1\n\
        TEST\nSOURCE 0\n\n\n\
        TEST\nSOURCE 0\n\n1\n\
        TEST\nSOURCE 1\n\n1\n";
    let (model, tree) = common::build_tree(report);
    let dir = tree.directory("d").unwrap();

    assert_eq!(model.tests.len(), 4);
    assert_eq!(dir.touching_tests.len(), 4);
    assert_eq!(dir.tests.count, 3);
    assert_eq!(tree.root.tests.count, 3);
}

#[test]
fn root_totals_match_file_sums() {
    let (_, tree) = common::build_tree(include_str!("fixtures/sample.ccr"));
    let line_total: u64 = tree.files().map(|f| f.line_metric().total).sum();
    let func_total: u64 = tree.files().map(|f| f.function_metric().total).sum();
    assert_eq!(tree.root.lines.total, line_total);
    assert_eq!(tree.root.functions.total, func_total);
    for dir in tree.directories() {
        let union: std::collections::BTreeSet<usize> = dir
            .children
            .iter()
            .flat_map(|f| f.touching_tests.iter().copied())
            .collect();
        assert_eq!(dir.touching_tests, union);
    }
}

#[test]
fn truncated_report_fails() {
    let result = ReportParser.parse(b"FILES 1\nsrc/a.cpp 2 0\nf 1 0\n");
    match result {
        Err(CovtreeError::Parse(e)) => assert_eq!(e.line, 4),
        other => panic!("expected parse error, got {other:?}"),
    }
}
