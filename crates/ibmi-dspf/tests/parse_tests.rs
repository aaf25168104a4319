//! Parser-level properties that hold for both strategies.

use ibmi_dspf::{parse, FallbackParser, Parser};
use ibmi_lang_core::{ParseStrategy, StrategyKind};

fn both() -> [Parser; 2] {
    [Parser::new(), Parser::with_grammar(false)]
}

const SCREEN: &str = "     A          R HEADER
     A            TITLE         30A  O  1 25
     A            USER          10A  O  1  2
     A          R DETAIL
     A            ITEM          15A  B  5  2
     A            QTY            5S 0B  5 20
     A            PRICE          7Y 2O  5 30
";

#[test]
fn fields_belong_to_the_preceding_record() {
    for parser in both() {
        let display = parser.parse(SCREEN, "S.dspf").ast;
        let counts: Vec<_> = display
            .record_formats
            .iter()
            .map(|r| (r.name.as_str(), r.fields.len()))
            .collect();
        assert_eq!(counts, vec![("HEADER", 2), ("DETAIL", 3)]);
        let names: Vec<_> = display.record_formats[1].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ITEM", "QTY", "PRICE"]);
    }
}

#[test]
fn free_layout_counts_every_record_line() {
    let text = "R SCREEN\nA TITLE 1 2\nA 'Hello' 2 2\nA NAME 5 10 20\nR NEXT\nA X 1 1 1\n";
    for parser in both() {
        let display = parser.parse(text, "F.dspf").ast;
        let counts: Vec<_> = display.record_formats.iter().map(|r| r.fields.len()).collect();
        assert_eq!(counts, vec![3, 1]);
        assert_eq!(display.record_formats[0].constants[0].text, "Hello");
    }
}

#[test]
fn empty_and_comment_only_inputs() {
    for parser in both() {
        for text in ["", "\n\n", "     A* comment only\n", "   \n     A*\n"] {
            let outcome = parser.parse(text, "E.dspf");
            assert!(outcome.ast.record_formats.is_empty(), "{text:?}");
            assert!(outcome.diagnostics.is_empty());
        }
    }
}

#[test]
#[cfg(feature = "grammar")]
fn column_layout_is_answered_by_grammar() {
    let outcome = Parser::new().parse(SCREEN, "S.dspf");
    assert_eq!(outcome.strategy, StrategyKind::Grammar);
    let qty = &outcome.ast.record_formats[1].fields[1];
    assert_eq!((qty.row, qty.col, qty.length), (Some(5), Some(20), Some(5)));
}

#[test]
#[cfg(feature = "grammar")]
fn free_layout_falls_back() {
    let outcome = Parser::new().parse("R HEADER\nA TITLE 1 25 30\nA USER 1 2 10\n", "F.dspf");
    assert_eq!(outcome.strategy, StrategyKind::Fallback);
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.ast.record_formats[0].fields.len(), 2);
}

#[test]
fn fallback_strategy_alone() {
    let parser = Parser::with_grammar(false);
    assert!(!parser.uses_grammar());
    assert_eq!(parser.parse(SCREEN, "S.dspf").strategy, StrategyKind::Fallback);
    assert_eq!(FallbackParser.name(), "dspf-fallback");
}

#[test]
fn default_parse_matches_default_parser() {
    let (display, diagnostics) = parse(SCREEN, "S.dspf");
    let outcome = Parser::default().parse(SCREEN, "S.dspf");
    assert_eq!(display, outcome.ast);
    assert_eq!(diagnostics, outcome.diagnostics);
}

#[test]
fn malformed_input_never_panics() {
    let nasty = [
        "A",
        "R",
        "     A          R",
        "     A            F  ((((",
        "     A                                      TEXT('open +",
        "     A                                      TEXT('a' -",
        "A ' '' '''",
        "A 1 2 'x",
        "\u{00e9}\u{00e8}\u{1F600}     A",
        "     A          R \u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}\u{1F600}",
        "X\r\nY\rZ",
    ];
    for parser in both() {
        for text in nasty {
            let _ = parser.parse(text, "NASTY.dspf");
        }
    }
}
