//! Parser behavior tests.
//!
//! Source text goes through `Parser::parse`; the command tree, asset table,
//! declared variables and collected errors are inspected.

use micropatterns_lang::{CommandKind, DrawOp, Error, ErrorCode, Op, Parser, Value, compile, DEFAULT_SCRIPT};
use micropatterns_lang::syntax::token::VarRef;

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn ok(src: &str) -> Parser {
    let mut p = Parser::new();
    if !p.parse(src) {
        panic!("expected parse to succeed, got: {:#?}", p.errors());
    }
    p
}

fn err(src: &str) -> Vec<Error> {
    let mut p = Parser::new();
    if p.parse(src) {
        panic!("expected parse errors for:\n{src}");
    }
    p.errors().to_vec()
}

fn has(errs: &[Error], code: ErrorCode) -> bool {
    errs.iter().any(|e| e.code == code)
}

fn has_msg(errs: &[Error], needle: &str) -> bool {
    errs.iter().any(|e| e.message.contains(needle))
}

// ─── Lines and commands ──────────────────────────────────────────────────────

#[test]
fn blank_lines_and_comments_are_skipped() {
    let p = ok("\n   \n# a comment\n  # indented comment\nPIXEL X=1 Y=2\n");
    assert_eq!(p.commands().len(), 1);
    assert_eq!(p.commands()[0].line, 5);
}

#[test]
fn command_names_are_case_insensitive() {
    let p = ok("fill_rect x=1 y=2 width=3 height=4\nColor name=white");
    assert!(matches!(p.commands()[0].kind, CommandKind::Draw { op: DrawOp::FillRect, .. }));
    assert!(matches!(p.commands()[1].kind, CommandKind::Color(_)));
}

#[test]
fn draw_params_are_keyed_upper_case() {
    let p = ok("LINE x1=0 Y1=$HEIGHT x2=$width y2=-5");
    let CommandKind::Draw { params, .. } = &p.commands()[0].kind else { panic!("expected LINE") };
    assert_eq!(params["X1"], Value::Int(0));
    assert_eq!(params["Y1"], Value::var("$HEIGHT"));
    assert_eq!(params["X2"], Value::var("$WIDTH"));
    assert_eq!(params["Y2"], Value::Int(-5));
}

#[test]
fn unknown_command() {
    let errs = err("SPARKLE X=1");
    assert!(has(&errs, ErrorCode::P001));
    assert!(has_msg(&errs, "Unknown command: SPARKLE"));
}

#[test]
fn errors_render_with_line_prefix() {
    let errs = err("PIXEL X=1\n\nBOGUS");
    assert_eq!(errs[0].to_string(), "Line 3: Unknown command: BOGUS");
}

#[test]
fn all_errors_are_collected() {
    let errs = err("BOGUS\nPIXEL X=\"unterminated\nLET $nope = 1\nENDIF");
    assert_eq!(errs.len(), 4);
    let lines: Vec<usize> = errs.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![1, 2, 3, 4]);
}

#[test]
fn duplicate_parameter_is_an_error() {
    assert!(has(&err("PIXEL X=1 x=2"), ErrorCode::P002));
}

#[test]
fn integer_out_of_range() {
    assert!(has(&err("PIXEL X=2147483648 Y=0"), ErrorCode::P004));
    ok("PIXEL X=-2147483648 Y=2147483647");
}

#[test]
fn stray_arguments_on_bare_commands_are_ignored() {
    let p = ok("RESET_TRANSFORMS now\nREPEAT COUNT=1 TIMES\nENDREPEAT please");
    assert_eq!(p.commands().len(), 2);
}

#[test]
fn summaries_read_like_source() {
    let p = ok("color name=BLACK\nFILL NAME=\"my dots\"\nVAR $a = 2 * -$WIDTH\nPIXEL Y=2 X=1");
    let lines: Vec<String> = p.commands().iter().map(|c| c.kind.summary()).collect();
    assert_eq!(lines, [
        "COLOR NAME=BLACK",
        "FILL NAME=\"my dots\"",
        "VAR $A = 2 * -$WIDTH",
        "PIXEL X=1 Y=2",
    ]);
}

// ─── Patterns ────────────────────────────────────────────────────────────────

#[test]
fn define_pattern_builds_asset() {
    let p = ok(r#"DEFINE PATTERN NAME="Checker" WIDTH=2 HEIGHT=2 DATA="1001""#);
    let a = p.assets().get("checker").expect("asset");
    assert_eq!(a.name, "CHECKER");
    assert_eq!(a.display_name, "Checker");
    assert_eq!((a.width, a.height), (2, 2));
    assert_eq!(a.data, vec![1, 0, 0, 1]);
    assert!(p.commands().is_empty());
}

#[test]
fn define_pattern_pads_and_truncates_data() {
    let p = ok("DEFINE PATTERN NAME=\"short\" WIDTH=3 HEIGHT=1 DATA=\"1\"\n\
                DEFINE PATTERN NAME=\"long\" WIDTH=1 HEIGHT=1 DATA=\"0111\"");
    assert_eq!(p.assets().get("SHORT").unwrap().data, vec![1, 0, 0]);
    assert_eq!(p.assets().get("LONG").unwrap().data, vec![0]);
}

#[test]
fn define_pattern_errors() {
    assert!(has(&err("DEFINE SHAPE NAME=\"x\""), ErrorCode::P001));
    assert!(has(&err("DEFINE PATTERN WIDTH=1 HEIGHT=1 DATA=\"1\""), ErrorCode::P003));
    assert!(has(&err("DEFINE PATTERN NAME=\"a\" WIDTH=1 DATA=\"1\""), ErrorCode::P003));
    assert!(has(&err("DEFINE PATTERN NAME=\"a\" WIDTH=0 HEIGHT=1 DATA=\"\""), ErrorCode::P013));
    assert!(has(&err("DEFINE PATTERN NAME=\"a\" WIDTH=2 HEIGHT=1 DATA=\"12\""), ErrorCode::P013));
}

#[test]
fn duplicate_pattern_names_ignore_case() {
    let errs = err("DEFINE PATTERN NAME=\"dots\" WIDTH=1 HEIGHT=1 DATA=\"1\"\n\
                    DEFINE PATTERN NAME=\"DOTS\" WIDTH=1 HEIGHT=1 DATA=\"0\"");
    assert!(has(&errs, ErrorCode::P013));
    assert_eq!(errs[0].line, 2);
}

#[test]
fn at_most_sixteen_patterns() {
    let src: String = (0..17)
        .map(|i| format!("DEFINE PATTERN NAME=\"p{i}\" WIDTH=1 HEIGHT=1 DATA=\"1\"\n"))
        .collect();
    let errs = err(&src);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].line, 17);
}

#[test]
fn oversized_pattern_is_only_a_warning() {
    let data = "1".repeat(21 * 2);
    let p = ok(&format!("DEFINE PATTERN NAME=\"wide\" WIDTH=21 HEIGHT=2 DATA=\"{data}\""));
    assert_eq!(p.assets().len(), 1);
}

// ─── Variables ───────────────────────────────────────────────────────────────

#[test]
fn var_with_and_without_initializer() {
    let p = ok("VAR $a\nVAR $b = $a * 2 + $WIDTH");
    let CommandKind::Var { name, init } = &p.commands()[1].kind else { panic!("expected VAR") };
    assert_eq!(name, "$B");
    assert_eq!(init, &vec![
        Value::var("$A"), Value::Operator(Op::Mul), Value::Int(2),
        Value::Operator(Op::Add), Value::var("$WIDTH"),
    ]);
    let CommandKind::Var { init, .. } = &p.commands()[0].kind else { panic!("expected VAR") };
    assert!(init.is_empty());
}

#[test]
fn var_declaration_errors() {
    assert!(has(&err("VAR $a\nVAR $A"), ErrorCode::P006));
    assert!(has(&err("VAR $hour"), ErrorCode::P007));
    assert!(has(&err("VAR $index = 1"), ErrorCode::P007));
    assert!(has(&err("VAR $9lives"), ErrorCode::P008));
    assert!(has(&err("VAR x"), ErrorCode::P008));
    assert!(has(&err("VAR $a 10"), ErrorCode::P002));
    assert!(has(&err("VAR $a ="), ErrorCode::P009));
}

#[test]
fn let_errors() {
    assert!(has(&err("LET $x = 1"), ErrorCode::P005));
    assert!(has(&err("LET $SECOND = 1"), ErrorCode::P007));
    assert!(has(&err("VAR $x\nLET $x"), ErrorCode::P002));
    assert!(has(&err("VAR $x\nLET $x ="), ErrorCode::P009));
    assert!(has(&err("VAR $x\nLET x = 1"), ErrorCode::P008));
}

#[test]
fn undeclared_variables_are_rejected_everywhere() {
    assert!(has(&err("PIXEL X=$nowhere Y=0"), ErrorCode::P005));
    assert!(has(&err("REPEAT COUNT=$n TIMES\nENDREPEAT"), ErrorCode::P005));
    assert!(has(&err("IF $n > 1 THEN\nENDIF"), ErrorCode::P005));
    assert!(has(&err("VAR $a = $b"), ErrorCode::P005));
}

#[test]
fn declaration_must_precede_use() {
    assert!(has(&err("LET $late = 1\nVAR $late"), ErrorCode::P005));
}

#[test]
fn environment_variables_need_no_declaration() {
    ok("VAR $t = $HOUR * 3600 + $MINUTE * 60 + $SECOND + $COUNTER + $WIDTH + $HEIGHT");
}

#[test]
fn negated_variable_in_expression() {
    let p = ok("VAR $a = 5\nVAR $b = -$a + 1");
    let CommandKind::Var { init, .. } = &p.commands()[1].kind else { panic!("expected VAR") };
    assert_eq!(init[0], Value::Variable(VarRef { name: "$A".into(), negated: true }));
}

// ─── Expressions and conditions ──────────────────────────────────────────────

#[test]
fn malformed_expressions() {
    assert!(has(&err("VAR $a = 1 +"), ErrorCode::P009));
    assert!(has(&err("VAR $a = * 2"), ErrorCode::P009));
    assert!(has(&err("VAR $a = 1 ^ 2"), ErrorCode::P009));
    assert!(has(&err("VAR $a = (1)"), ErrorCode::P009));
}

#[test]
fn malformed_conditions() {
    assert!(has(&err("IF 1 = 1 THEN\nENDIF"), ErrorCode::P010));
    assert!(has(&err("IF 1 + 1 THEN\nENDIF"), ErrorCode::P010));
    assert!(has(&err("IF 1 < 2 < 3 THEN\nENDIF"), ErrorCode::P010));
    assert!(has(&err("IF == 1 THEN\nENDIF"), ErrorCode::P010));
    assert!(has(&err("IF 1 == 1\nENDIF"), ErrorCode::P010));
}

// ─── Blocks ──────────────────────────────────────────────────────────────────

#[test]
fn repeat_times_keyword_is_optional() {
    let p = ok("REPEAT COUNT=3 TIMES\nENDREPEAT\nrepeat count=4\nendrepeat");
    assert!(matches!(&p.commands()[0].kind, CommandKind::Repeat { count: Value::Int(3), .. }));
    assert!(matches!(&p.commands()[1].kind, CommandKind::Repeat { count: Value::Int(4), .. }));
}

#[test]
fn repeat_header_errors() {
    assert!(has(&err("REPEAT 3 TIMES\nENDREPEAT"), ErrorCode::P003));
    assert!(has(&err("REPEAT COUNT= TIMES\nENDREPEAT"), ErrorCode::P003));
    assert!(has(&err("REPEAT COUNT=3 TIMES NOW\nENDREPEAT"), ErrorCode::P002));
    assert!(has(&err("REPEAT COUNT=\"3\" TIMES\nENDREPEAT"), ErrorCode::P003));
}

#[test]
fn unmatched_terminators_and_unclosed_blocks_differ() {
    let stray = err("ENDREPEAT");
    assert!(has(&stray, ErrorCode::P011));
    assert!(!has(&stray, ErrorCode::P012));

    let unclosed = err("PIXEL X=0 Y=0\nIF 1 == 1 THEN\nPIXEL X=0 Y=0");
    assert!(has(&unclosed, ErrorCode::P012));
    assert!(!has(&unclosed, ErrorCode::P011));
    assert!(has_msg(&unclosed, "started on line 2"));
}

#[test]
fn every_unclosed_block_is_reported() {
    let errs = err("REPEAT COUNT=1 TIMES\nIF 1 == 1 THEN");
    assert_eq!(errs.len(), 2);
    assert!(errs.iter().all(|e| e.code == ErrorCode::P012));
}

#[test]
fn else_outside_if() {
    assert!(has(&err("REPEAT COUNT=1 TIMES\nELSE\nENDREPEAT"), ErrorCode::P011));
}

// ─── Whole scripts ───────────────────────────────────────────────────────────

#[test]
fn parse_is_idempotent() {
    let src = "DEFINE PATTERN NAME=\"p\" WIDTH=2 HEIGHT=1 DATA=\"10\"\n\
               VAR $n = 3\n\
               REPEAT COUNT=$n TIMES\n\
                 IF $INDEX % 2 == 0 THEN\n\
                   FILL NAME=\"p\"\n\
                 ELSE\n\
                   FILL NAME=SOLID\n\
                 ENDIF\n\
                 FILL_RECT X=$INDEX Y=0 WIDTH=1 HEIGHT=1\n\
               ENDREPEAT";
    let mut p = Parser::new();
    assert!(p.parse(src));
    let first = (p.commands().to_vec(), p.declared_variables().to_vec(), p.assets().len());
    assert!(p.parse(src));
    let second = (p.commands().to_vec(), p.declared_variables().to_vec(), p.assets().len());
    assert_eq!(first, second);
}

#[test]
fn compile_returns_every_error() {
    let errs = compile("BOGUS\nENDIF").expect_err("expected errors");
    assert_eq!(errs.len(), 2);
}

#[test]
fn default_script_parses() {
    let script = compile(DEFAULT_SCRIPT).unwrap_or_else(|e| panic!("{e:#?}"));
    assert!(script.assets.get("artdeco").is_some());
    assert!(script.declared_variables.contains(&"$SECONDPLUS".to_string()));
}
