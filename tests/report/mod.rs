//! Report module tests.

mod parser_test;
mod property_test;

/// Verify all public report types are exported from the library.
#[test]
fn test_all_report_types_exported() {
    use report_runner::report::{
        Report, ReportDelimiters, ReportParseError, ReportParser, ScanEvent, DEFAULT_CLOSE,
        DEFAULT_OPEN,
    };

    let parser = ReportParser::new(ReportDelimiters::new(DEFAULT_OPEN, DEFAULT_CLOSE));
    assert_eq!(parser.delimiters(), &ReportDelimiters::default());

    let _ = ScanEvent::Report(Report::new(serde_json::json!(null)));
    let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let _ = ScanEvent::Invalid(ReportParseError {
        input: "{".to_string(),
        reason: err.to_string(),
    });
}
