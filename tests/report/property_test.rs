//! Chunk boundaries must not change the reports found or the stray text kept.

use proptest::prelude::*;
use report_runner::report::{ReportParser, ScanEvent};

/// Reports found, and the concatenated stray text.
fn scan(chunks: &[&str]) -> (Vec<serde_json::Value>, String) {
    let mut parser = ReportParser::default();
    let mut events: Vec<ScanEvent> = chunks.iter().flat_map(|c| parser.feed(c)).collect();
    events.extend(parser.finish());

    let mut reports = Vec::new();
    let mut stray = String::new();
    for event in events {
        match event {
            ScanEvent::Report(r) => reports.push(r.into_value()),
            ScanEvent::Stray(text) | ScanEvent::Unterminated(text) => stray.push_str(&text),
            ScanEvent::Invalid(_) => {}
        }
    }
    (reports, stray)
}

fn split_at_char_boundaries<'a>(text: &'a str, cuts: &[usize]) -> Vec<&'a str> {
    let mut points: Vec<usize> = cuts
        .iter()
        .map(|c| c % (text.len() + 1))
        .filter(|&c| text.is_char_boundary(c))
        .collect();
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for point in points {
        chunks.push(&text[start..point]);
        start = point;
    }
    chunks.push(&text[start..]);
    chunks
}

fn segment() -> impl Strategy<Value = (String, Option<serde_json::Value>)> {
    let stray = "[a-zé ✓\n.]{0,12}";
    let value = prop_oneof![
        any::<i32>().prop_map(|n| serde_json::json!(n)),
        "[a-z ]{0,8}".prop_map(|s| serde_json::json!({ "msg": s })),
        prop::collection::vec(any::<bool>(), 0..4).prop_map(|v| serde_json::json!(v)),
    ];
    (stray, prop::option::of(value))
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_reports_or_stray_text(
        segments in prop::collection::vec(segment(), 0..6),
        cuts in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let mut input = String::new();
        let mut expected = Vec::new();
        let mut expected_stray = String::new();
        let mut between = String::new();
        for (stray, value) in &segments {
            input.push_str(stray);
            between.push_str(stray);
            if let Some(value) = value {
                input.push_str("<<<REPORT");
                input.push_str(&value.to_string());
                input.push_str("REPORT>>>");
                expected.push(value.clone());
                expected_stray.push_str(between.trim());
                between.clear();
            }
        }
        expected_stray.push_str(between.trim());

        let (reports, stray) = scan(&[input.as_str()]);
        prop_assert_eq!(reports, expected.clone());
        prop_assert_eq!(&stray, &expected_stray);

        let chunks = split_at_char_boundaries(&input, &cuts);
        let (split_reports, split_stray) = scan(&chunks);
        prop_assert_eq!(split_reports, expected);
        prop_assert_eq!(split_stray, expected_stray);
    }
}
