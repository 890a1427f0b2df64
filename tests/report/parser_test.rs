use report_runner::report::{Report, ReportDelimiters, ReportParser, ScanEvent};
use serde::Deserialize;

fn feed_all(parser: &mut ReportParser, chunks: &[&str]) -> Vec<ScanEvent> {
    let mut events: Vec<ScanEvent> = chunks.iter().flat_map(|c| parser.feed(c)).collect();
    events.extend(parser.finish());
    events
}

#[test]
fn test_interleaved_output_yields_reports_and_stray_in_order() {
    let mut parser = ReportParser::default();
    let events = feed_all(
        &mut parser,
        &[
            "compiling\n<<<REPORT{\"step\":\"build\"}",
            "REPORT>>>\ntesting\n<<<REPO",
            "RT{\"step\":\"test\",\"passed\":3}REPORT>>>\ndone\n",
        ],
    );

    assert_eq!(
        events,
        vec![
            ScanEvent::Stray("compiling".to_string()),
            ScanEvent::Report(Report::new(serde_json::json!({"step": "build"}))),
            ScanEvent::Stray("testing".to_string()),
            ScanEvent::Report(Report::new(
                serde_json::json!({"step": "test", "passed": 3})
            )),
            ScanEvent::Stray("done".to_string()),
        ]
    );
}

#[test]
fn test_report_decodes_into_caller_type() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Progress {
        done: u32,
        total: u32,
    }

    let mut parser = ReportParser::default();
    let events = parser.feed("<<<REPORT{\"done\":2,\"total\":5}REPORT>>>");

    let ScanEvent::Report(report) = &events[0] else {
        panic!("Expected a report, got {events:?}");
    };
    assert_eq!(
        report.parse_as::<Progress>().unwrap(),
        Progress { done: 2, total: 5 }
    );
    assert!(report.parse_as::<Vec<u32>>().is_err());
}

#[test]
fn test_parser_can_be_reused_after_finish() {
    let mut parser = ReportParser::default();
    let first = feed_all(&mut parser, &["<<<REPORT{"]);
    assert!(matches!(first.as_slice(), [ScanEvent::Unterminated(_)]));

    let second = feed_all(&mut parser, &["<<<REPORT1REPORT>>>"]);
    assert_eq!(
        second,
        vec![ScanEvent::Report(Report::new(serde_json::json!(1)))]
    );
}

#[test]
fn test_close_token_outside_report_is_stray() {
    let mut parser = ReportParser::default();
    let events = feed_all(&mut parser, &["REPORT>>> stray"]);
    assert_eq!(events, vec![ScanEvent::Stray("REPORT>>> stray".to_string())]);
}

#[test]
fn test_invalid_report_keeps_body_and_reason() {
    let mut parser = ReportParser::new(ReportDelimiters::new("[[", "]]"));
    let events = feed_all(&mut parser, &["[[ {\"a\": } ]]"]);

    match events.as_slice() {
        [ScanEvent::Invalid(err)] => {
            assert_eq!(err.input, "{\"a\": }");
            assert!(err.to_string().starts_with("Failed to parse report:"));
        }
        other => panic!("Expected one invalid report, got {other:?}"),
    }
}
