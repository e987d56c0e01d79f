use covtree::aggregate::aggregate;
use covtree::config::Config;
use covtree::model::ReportModel;
use covtree::parser::ReportParser;
use covtree::tree::{CoverageTree, TreeBuilder};

/// Parse a report and build its tree with the default config.
pub fn build_tree(report: &str) -> (ReportModel, CoverageTree) {
    let model = ReportParser.parse(report.as_bytes()).unwrap();
    let tree = TreeBuilder::new(&Config::default()).build(&model, &aggregate(&model.tests));
    (model, tree)
}
