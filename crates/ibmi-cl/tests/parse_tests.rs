//! Parser-level properties that hold for both strategies.

use ibmi_cl::{parse, FallbackParser, Parser};
use ibmi_lang_core::{ParseStrategy, StrategyKind};

fn both() -> [Parser; 2] {
    [Parser::new(), Parser::with_grammar(false)]
}

#[test]
fn empty_and_comment_only_inputs_have_no_commands() {
    for parser in both() {
        for text in ["", "\n\n", "/* only a comment */\n", "* star comment\n   \n"] {
            let outcome = parser.parse(text, "EMPTY.clle");
            assert!(outcome.ast.commands.is_empty(), "{text:?}");
            assert!(!outcome.diagnostics.iter().any(|d| d.is_error()));
        }
    }
}

#[test]
fn call_with_keywords() {
    for parser in both() {
        let program = parser.parse("CALL PGM(FOO) PARM(&A &B)", "C.clle").ast;
        assert_eq!(program.commands.len(), 1);
        let command = &program.commands[0];
        assert_eq!(command.name, "CALL");
        assert!(!command.parameters.is_empty());
    }
}

#[test]
fn fallback_call_token_boundaries() {
    let (program, _) = FallbackParser.parse("CALL PGM(FOO) PARM(&A &B)", "C.clle");
    let values: Vec<_> = program.commands[0]
        .parameters
        .iter()
        .map(|p| (p.keyword.clone(), p.value.text.clone()))
        .collect();
    assert_eq!(
        values,
        vec![
            (None, "PGM(FOO)".to_string()),
            (None, "PARM(&A".to_string()),
            (None, "&B)".to_string()),
        ]
    );
}

#[test]
fn fixed_column_continuation_is_one_command() {
    let text = "\
             CALL       PGM(ORDERS)
     +                  PARM(&CUST &ORDNO)
             RETURN
";
    for parser in both() {
        let outcome = parser.parse(text, "CONT.clle");
        // The column-6 marker is not grammar syntax, so the fallback answers.
        assert_eq!(outcome.strategy, StrategyKind::Fallback);
        let commands = &outcome.ast.commands;
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].name, "CALL");
        let texts: Vec<_> = commands[0].parameters.iter().map(|p| p.value.text.as_str()).collect();
        assert_eq!(texts, vec!["PGM(ORDERS)", "PARM(&CUST", "&ORDNO)"]);
    }
}

#[test]
#[cfg(feature = "grammar")]
fn trailing_plus_continuation_is_one_command() {
    let text = "CALL PGM(ORDERS) +\n     PARM(&CUST &ORDNO)\n";
    let outcome = Parser::new().parse(text, "CONT.clle");
    assert_eq!(outcome.strategy, StrategyKind::Grammar);
    assert_eq!(outcome.ast.commands.len(), 1);
    assert_eq!(outcome.ast.commands[0].parameters.len(), 2);
}

#[test]
#[cfg(feature = "grammar")]
fn grammar_errors_are_not_merged_into_fallback_output() {
    let (program, diagnostics) = parse("SNDMSG MSG('unterminated)\nRETURN\n", "BAD.clle");
    assert!(diagnostics.is_empty());
    assert_eq!(program.commands.len(), 2);
    assert_eq!(program.commands[1].name, "RETURN");
}

#[test]
fn malformed_input_never_panics() {
    let nasty = [
        "((((",
        "))))",
        "'",
        "/*",
        "+",
        "     +",
        "&",
        "CALL PGM(\u{00e9}\u{00e8}) \u{1F600}",
        "LBL:",
        ":::",
        "X\r\nY\rZ",
        "\t\t+\t",
    ];
    for parser in both() {
        for text in nasty {
            let _ = parser.parse(text, "NASTY.clle");
        }
    }
}

#[test]
fn names_are_upper_cased() {
    for parser in both() {
        let program = parser.parse("chgvar var(&x) value(1)", "L.clle").ast;
        assert_eq!(program.commands[0].name, "CHGVAR");
    }
}
