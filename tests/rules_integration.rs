use std::rc::Rc;

use tailmark::console::StyledConsole;
use tailmark::style::{RuleStyler, RulesError};
use tailmark::sync::{HtmlFileSurface, ManualClock};

const RULES: &str = r##"
// Highlight failures and request ids.
{
  rules: [
    { pattern: "\\bERROR\\b", foreground: "red", bold: true },
    { pattern: "req-[0-9]+", foreground: "#2472c8", whole_line: false, underline: true },
  ],
}
"##;

#[test]
fn test_rules_file_styles_synced_page() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("rules.json5");
    std::fs::write(&rules_path, RULES).unwrap();
    let page_path = dir.path().join("console.html");

    let styler = RuleStyler::load(&rules_path).unwrap();
    assert_eq!(styler.len(), 2);

    let console = StyledConsole::builder()
        .with_clock(ManualClock::new())
        .build(HtmlFileSurface::new(&page_path))
        .unwrap();
    console.set_line_styler(Some(Rc::new(styler)));
    console.append("INFO: served req-17\nERROR: timeout\n");
    console.refresh();

    let page = std::fs::read_to_string(&page_path).unwrap();
    assert!(page.contains(
        r#"INFO: served <span style="color:#2472c8;text-decoration:underline">req-17</span>"#
    ));
    assert!(page.contains(
        r#"<span style="color:#cd3131;font-weight:bold">ERROR: timeout</span>"#
    ));
}

#[test]
fn test_partial_line_is_styled_once_completed() {
    let dir = tempfile::tempdir().unwrap();
    let page_path = dir.path().join("console.html");
    let console = StyledConsole::builder()
        .with_clock(ManualClock::new())
        .build(HtmlFileSurface::new(&page_path))
        .unwrap();
    console.set_line_styler(Some(Rc::new(RuleStyler::from_json5(RULES).unwrap())));

    console.append("ERROR: half");
    assert!(console.style_ranges().is_empty());
    console.append(" a line\n");
    assert_eq!(console.style_ranges().len(), 1);
    assert_eq!(console.style_ranges()[0].length, "ERROR: half a line".len());
}

#[test]
fn test_bad_pattern_reports_rule_index() {
    let err = RuleStyler::from_json5(r#"{ rules: [{ pattern: "ok" }, { pattern: "(" }] }"#)
        .unwrap_err();
    assert!(matches!(err, RulesError::Pattern { index: 1, .. }));
}

#[test]
fn test_bad_color_is_a_parse_error() {
    let err = RuleStyler::from_json5(r#"{ rules: [{ pattern: "x", foreground: "chartreuse-ish" }] }"#)
        .unwrap_err();
    assert!(matches!(err, RulesError::Parse(_)));
}

#[test]
fn test_missing_rules_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RuleStyler::load(&dir.path().join("absent.json5")).unwrap_err();
    assert!(matches!(err, RulesError::Io { .. }));
}
