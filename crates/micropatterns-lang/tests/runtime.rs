//! Runtime behavior tests.
//!
//! Tests the full stack: compile → Runtime::new → generate_display_list.
//! Display-list items are inspected for resolved parameters and the drawing
//! state they captured; runtime errors are inspected where scripts degrade.

use std::cell::Cell;

use micropatterns_lang::types::affine;
use micropatterns_lang::{
    Color, DisplayListItem, DrawOp, ExecState, RunState, Runtime, RuntimeError, RuntimeErrorCode, Script, compile,
    DEFAULT_SCRIPT,
};
use test_log::test;

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn script(src: &str) -> Script {
    compile(src).unwrap_or_else(|errs| panic!("compile failed: {errs:#?}"))
}

fn generate(src: &str, state: ExecState) -> (Vec<DisplayListItem>, Vec<RuntimeError>) {
    let script = script(src);
    let mut rt = Runtime::new(&script, 200, 200);
    rt.set_exec_state(state);
    assert!(rt.generate_display_list(), "generation was interrupted");
    let errors = rt.errors().to_vec();
    (rt.take_display_list(), errors)
}

fn run(src: &str) -> Vec<DisplayListItem> {
    let (items, errors) = generate(src, ExecState::default());
    assert!(errors.is_empty(), "unexpected runtime errors: {errors:#?}");
    items
}

fn run_errs(src: &str) -> (Vec<DisplayListItem>, Vec<RuntimeError>) {
    generate(src, ExecState::default())
}

fn xs(items: &[DisplayListItem]) -> Vec<i32> {
    items.iter().map(|i| i.param("X")).collect()
}

fn close(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
}

// ─── Drawing state ───────────────────────────────────────────────────────────

#[test]
fn defaults_are_black_solid_identity() {
    let items = run("PIXEL X=1 Y=2");
    let item = &items[0];
    assert_eq!(item.color, Color::Black);
    assert!(item.fill.is_none());
    assert_eq!(item.matrix, affine::identity());
    assert_eq!(item.scale, 1.0);
    assert_eq!(item.line, 1);
    assert_eq!((item.param("X"), item.param("Y")), (1, 2));
}

#[test]
fn missing_params_default_to_zero() {
    let items = run("FILL_RECT WIDTH=5");
    assert_eq!(items[0].param("X"), 0);
    assert_eq!(items[0].param("HEIGHT"), 0);
    assert_eq!(items[0].param("WIDTH"), 5);
}

#[test]
fn color_and_fill_are_snapshotted() {
    let items = run("DEFINE PATTERN NAME=\"p\" WIDTH=1 HEIGHT=1 DATA=\"1\"\n\
                     COLOR NAME=WHITE\nFILL NAME=\"P\"\nPIXEL X=0 Y=0\n\
                     COLOR NAME=black\nFILL NAME=solid\nPIXEL X=0 Y=0");
    assert_eq!(items[0].color, Color::White);
    assert_eq!(items[0].fill.as_ref().map(|a| a.name.as_str()), Some("P"));
    assert_eq!(items[1].color, Color::Black);
    assert!(items[1].fill.is_none());
}

#[test]
fn invalid_color_falls_back_to_black() {
    let (items, errors) = run_errs("COLOR NAME=WHITE\nCOLOR NAME=RED\nPIXEL X=0 Y=0");
    assert_eq!(items[0].color, Color::Black);
    assert_eq!(errors[0].code, RuntimeErrorCode::R007);
    assert_eq!(errors[0].line, 2);
}

#[test]
fn unknown_fill_falls_back_to_solid() {
    let (items, errors) = run_errs("DEFINE PATTERN NAME=\"p\" WIDTH=1 HEIGHT=1 DATA=\"1\"\n\
                                    FILL NAME=\"p\"\nFILL NAME=\"missing\"\nPIXEL X=0 Y=0");
    assert!(items[0].fill.is_none());
    assert_eq!(errors[0].code, RuntimeErrorCode::R008);
}

// ─── Transforms ──────────────────────────────────────────────────────────────

#[test]
fn translate_then_rotate_composes_by_right_multiplication() {
    let items = run("TRANSLATE DX=10 DY=0\nROTATE DEGREES=90\nPIXEL X=5 Y=0");
    assert!(close(items[0].to_screen(5.0, 0.0), (10.0, 5.0)));
}

#[test]
fn inverse_stays_consistent() {
    let items = run("TRANSLATE DX=17 DY=-4\nROTATE DEGREES=33\nTRANSLATE DX=3 DY=9\nPIXEL X=0 Y=0");
    let item = &items[0];
    let p = item.to_screen(2.5, -7.0);
    assert!(close(item.to_logical(p.0, p.1), (2.5, -7.0)));
}

#[test]
fn scale_replaces_and_clamps() {
    let items = run("SCALE FACTOR=3\nSCALE FACTOR=2\nPIXEL X=0 Y=0\nSCALE FACTOR=0\nPIXEL X=0 Y=0\nSCALE FACTOR=-4\nPIXEL X=0 Y=0");
    assert_eq!(items[0].scale, 2.0);
    assert_eq!(items[1].scale, 1.0);
    assert_eq!(items[2].scale, 1.0);
}

#[test]
fn reset_transforms_restores_identity_and_scale() {
    let items = run("TRANSLATE DX=5 DY=5\nROTATE DEGREES=45\nSCALE FACTOR=4\nRESET_TRANSFORMS\nPIXEL X=0 Y=0");
    assert_eq!(items[0].matrix, affine::identity());
    assert_eq!(items[0].inverse, affine::identity());
    assert_eq!(items[0].scale, 1.0);
}

// ─── Variables ───────────────────────────────────────────────────────────────

#[test]
fn environment_variables_are_visible() {
    let state = ExecState { counter: 7, hour: 13, minute: 45, second: 30 };
    let (items, _) = generate("LINE X1=$WIDTH Y1=$HEIGHT X2=$HOUR Y2=$COUNTER\nPIXEL X=$MINUTE Y=$SECOND", state);
    assert_eq!(items[0].param("X1"), 200);
    assert_eq!(items[0].param("Y1"), 200);
    assert_eq!(items[0].param("X2"), 13);
    assert_eq!(items[0].param("Y2"), 7);
    assert_eq!((items[1].param("X"), items[1].param("Y")), (45, 30));
}

#[test]
fn var_and_let() {
    let items = run("VAR $a = 2 + 3 * 4\nVAR $b\nLET $b = $a - 10 - 3\nPIXEL X=$a Y=$b");
    assert_eq!((items[0].param("X"), items[0].param("Y")), (14, 1));
}

#[test]
fn negated_variable_parameter() {
    let items = run("VAR $d = 6\nTRANSLATE DX=-$d DY=0\nPIXEL X=0 Y=0");
    assert!(close(items[0].to_screen(0.0, 0.0), (-6.0, 0.0)));
}

#[test]
fn declared_variables_start_at_zero_each_generation() {
    let script = script("VAR $n\nLET $n = $n + 1\nPIXEL X=$n Y=0");
    let mut rt = Runtime::new(&script, 10, 10);
    rt.generate_display_list();
    rt.generate_display_list();
    assert_eq!(rt.display_list()[0].param("X"), 1);
    assert_eq!(rt.variable("n"), Some(1));
}

#[test]
fn var_inside_loop_reinitialises() {
    let items = run("REPEAT COUNT=3 TIMES\nVAR $y = $INDEX * 2\nPIXEL X=$INDEX Y=$y\nENDREPEAT");
    let ys: Vec<i32> = items.iter().map(|i| i.param("Y")).collect();
    assert_eq!(ys, vec![0, 2, 4]);
}

#[test]
fn division_by_zero_in_let() {
    let (items, errors) = run_errs("VAR $z = 0\nVAR $r\nLET $r = 10 / $z + 4\nPIXEL X=$r Y=0");
    assert_eq!(items[0].param("X"), 4);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, RuntimeErrorCode::R002);
}

#[test]
fn let_before_var_executes_is_an_error() {
    let script = script("IF 1 == 2 THEN\nVAR $x = 5\nENDIF\nLET $x = $x + 3\nPIXEL X=$x Y=0");
    let mut rt = Runtime::new(&script, 10, 10);
    assert!(rt.generate_display_list());
    let codes: Vec<_> = rt.errors().iter().map(|e| e.code).collect();
    assert_eq!(codes, [RuntimeErrorCode::R006, RuntimeErrorCode::R001]);
    assert_eq!(rt.variable("x"), None);
    assert_eq!(rt.display_list()[0].param("X"), 0);
}

// ─── Control flow ────────────────────────────────────────────────────────────

#[test]
fn repeat_sets_index() {
    let items = run("REPEAT COUNT=4 TIMES\nPIXEL X=$INDEX Y=0\nENDREPEAT");
    assert_eq!(xs(&items), vec![0, 1, 2, 3]);
}

#[test]
fn nested_repeat_index_is_innermost_and_restored() {
    let items = run("REPEAT COUNT=2 TIMES\n\
                       REPEAT COUNT=2 TIMES\n\
                         PIXEL X=$INDEX Y=0\n\
                       ENDREPEAT\n\
                       PIXEL X=$INDEX Y=1\n\
                     ENDREPEAT");
    assert_eq!(xs(&items), vec![0, 1, 0, 0, 1, 1]);
    let ys: Vec<i32> = items.iter().map(|i| i.param("Y")).collect();
    assert_eq!(ys, vec![0, 0, 1, 0, 0, 1]);
}

#[test]
fn index_outside_loop_is_a_runtime_error() {
    let (items, errors) = run_errs("PIXEL X=$INDEX Y=0");
    assert_eq!(items[0].param("X"), 0);
    assert_eq!(errors[0].code, RuntimeErrorCode::R004);
}

#[test]
fn repeat_count_from_variable_and_zero() {
    let items = run("VAR $n = 3\nREPEAT COUNT=$n TIMES\nPIXEL X=1 Y=1\nENDREPEAT\nREPEAT COUNT=0 TIMES\nPIXEL X=2 Y=2\nENDREPEAT");
    assert_eq!(items.len(), 3);
}

#[test]
fn negative_repeat_count_is_skipped() {
    let (items, errors) = run_errs("VAR $n = -2\nREPEAT COUNT=$n TIMES\nPIXEL X=1 Y=1\nENDREPEAT\nPIXEL X=9 Y=9");
    assert_eq!(xs(&items), vec![9]);
    assert_eq!(errors[0].code, RuntimeErrorCode::R009);
}

#[test]
fn if_else_branches() {
    let items = run("REPEAT COUNT=4 TIMES\n\
                       IF $INDEX % 2 == 0 THEN\n\
                         PIXEL X=$INDEX Y=0\n\
                       ELSE\n\
                         PIXEL X=$INDEX Y=1\n\
                       ENDIF\n\
                     ENDREPEAT");
    let ys: Vec<i32> = items.iter().map(|i| i.param("Y")).collect();
    assert_eq!(ys, vec![0, 1, 0, 1]);
    assert_eq!(xs(&items), vec![0, 1, 2, 3]);
}

#[test]
fn if_without_else() {
    let items = run("IF $WIDTH > 100 THEN\nPIXEL X=1 Y=0\nENDIF\nIF $WIDTH < 100 THEN\nPIXEL X=2 Y=0\nENDIF");
    assert_eq!(xs(&items), vec![1]);
}

// ─── Display-list items ──────────────────────────────────────────────────────

#[test]
fn opacity_classification() {
    let items = run("PIXEL X=0 Y=0\nFILL_PIXEL X=0 Y=0\nFILL_RECT X=0 Y=0 WIDTH=1 HEIGHT=1\n\
                     FILL_CIRCLE X=0 Y=0 RADIUS=1\nLINE X1=0 Y1=0 X2=1 Y2=1\n\
                     RECT X=0 Y=0 WIDTH=1 HEIGHT=1\nCIRCLE X=0 Y=0 RADIUS=1");
    let opaque: Vec<bool> = items.iter().map(|i| i.is_opaque).collect();
    assert_eq!(opaque, vec![true, true, true, true, false, false, false]);
}

#[test]
fn draw_opacity_follows_asset_bits() {
    let items = run("DEFINE PATTERN NAME=\"full\" WIDTH=2 HEIGHT=2 DATA=\"1111\"\n\
                     DEFINE PATTERN NAME=\"holey\" WIDTH=2 HEIGHT=2 DATA=\"1110\"\n\
                     DRAW NAME=\"full\" X=0 Y=0\nDRAW NAME=\"holey\" X=0 Y=0");
    assert!(items[0].is_opaque);
    assert!(!items[1].is_opaque);
    assert_eq!(items[0].op, DrawOp::Draw);
    assert_eq!(items[1].string_params["NAME"], "HOLEY");
}

#[test]
fn draw_with_unknown_asset_is_dropped() {
    let (items, errors) = run_errs("DRAW NAME=\"ghost\" X=0 Y=0\nPIXEL X=1 Y=1");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].op, DrawOp::Pixel);
    assert_eq!(errors[0].code, RuntimeErrorCode::R008);
}

#[test]
fn display_list_is_in_script_order() {
    let items = run("FILL_RECT X=0 Y=0 WIDTH=1 HEIGHT=1\nLINE X1=0 Y1=0 X2=1 Y2=1\nCIRCLE X=0 Y=0 RADIUS=1");
    let ops: Vec<DrawOp> = items.iter().map(|i| i.op).collect();
    assert_eq!(ops, vec![DrawOp::FillRect, DrawOp::Line, DrawOp::Circle]);
    let lines: Vec<usize> = items.iter().map(|i| i.line).collect();
    assert_eq!(lines, vec![1, 2, 3]);
}

// ─── Host state and interruption ─────────────────────────────────────────────

#[test]
fn host_state_round_trips() {
    let script = script("PIXEL X=0 Y=0");
    let mut rt = Runtime::new(&script, 10, 10);
    rt.set_counter(42);
    rt.set_time(1, 2, 3);
    assert_eq!(rt.counter(), 42);
    assert_eq!(rt.time(), (1, 2, 3));
    assert_eq!(rt.exec_state(), ExecState { counter: 42, hour: 1, minute: 2, second: 3 });
    assert_eq!(rt.run_state(), RunState::Idle);
    rt.generate_display_list();
    assert_eq!(rt.run_state(), RunState::Complete);
}

#[test]
fn interrupt_before_generation_yields_empty_list() {
    let script = script("PIXEL X=0 Y=0\nPIXEL X=1 Y=0");
    let mut rt = Runtime::new(&script, 10, 10);
    rt.request_interrupt();
    assert!(!rt.generate_display_list());
    assert!(rt.display_list().is_empty());
    assert_eq!(rt.run_state(), RunState::Interrupted);
    assert!(rt.is_interrupted());

    rt.clear_interrupt();
    assert!(rt.generate_display_list());
    assert_eq!(rt.display_list().len(), 2);
}

#[test]
fn yield_hook_can_interrupt_a_loop() {
    let script = script("REPEAT COUNT=100 TIMES\nFILL_PIXEL X=$INDEX Y=0\nENDREPEAT");
    let mut rt = Runtime::new(&script, 10, 10);
    let handle = rt.interrupt_handle();
    rt.set_yield_hook(move || handle.request());
    assert!(!rt.generate_display_list());
    assert_eq!(rt.display_list().len(), 20);
}

#[test]
fn yield_hook_runs_on_top_level_and_loop_intervals() {
    let yields = Cell::new(0);
    let mut src = String::from("REPEAT COUNT=40 TIMES\nENDREPEAT\n");
    for _ in 0..99 { src.push_str("PIXEL X=0 Y=0\n"); }
    let script = script(&src);
    let mut rt = Runtime::new(&script, 10, 10);
    rt.set_yield_hook(|| yields.set(yields.get() + 1));
    assert!(rt.generate_display_list());
    drop(rt);
    // 2 from the loop (after 20 and 40) + 2 top-level (after 50 and 100 commands).
    assert_eq!(yields.get(), 4);
}

// ─── Default script ──────────────────────────────────────────────────────────

#[test]
fn default_script_generates_for_various_host_states() {
    let script = script(DEFAULT_SCRIPT);
    for (counter, second) in [(0, 0), (1, 7), (123, 59), (-5, 31)] {
        let mut rt = Runtime::new(&script, 200, 200);
        rt.set_counter(counter);
        rt.set_time(10, 10, second);
        assert!(rt.generate_display_list());
        assert!(!rt.display_list().is_empty());
        assert_eq!(rt.display_list()[0].op, DrawOp::FillRect);
    }
}
