// End-to-end: decode a board, run its seed wave, and route the narration
// through the stream capture into a rendered screen buffer.

use core_board::{BoardDecoder, instantiate_board, validate_board_instruction};
use core_render::{MemoryRenderer, RenderCtx, shared_colors};
use core_screen::{FixedSlotStore, RenderingsDecoder, SlotStore, validate_instruction};
use core_session::{
    DispatchPayload, ScreenKey, ScreenSession, SessionOpts, SwitchOutcome, SysStream,
};
use core_tsi::nodes::{SinkBuffer, TextFanSource, TextTransform};
use core_tsi::{PayloadKind, RunOptions, Tsi, TsiContext, TsiId, run_circuit, validate_board};
use core_widget::WidgetPayload;

const BOARD: &str = r#"
circuit chain =
  src = tsi.source.text;
  map = tsi.map.upper;
  out = tsi.sink.text;
  src@payload:str -> map@payload:str;
  map@payload:str -> out@payload:str;
  run("one two");
"#;

const SCREENS: &str = r#"
_screen (
  __name = activity
  __key = F+1
  _rectangle (
    __coords = 0,0 __shape = 100,100 __z = 1
    _buffer ( __coords = 0,0 __shape = 100,100 __capacity = 64 __trigger = log )
  )
  _update ( __name = log __form = str = .sys.stdout )
)
_screen (
  __name = control
  __key = F+2
  _rectangle (
    __coords = 0,0 __shape = 100,100 __z = 1
    _label ( __coords = 0,0 __shape = 100,30 __value = "idle" __trigger = status )
  )
  _update ( __name = status __form = str = .str0 )
)
"#;

fn factory(tsi_type: &str, id: TsiId, alias: &str) -> Option<Box<dyn Tsi>> {
    match tsi_type {
        "tsi.source.text" => Some(Box::new(TextFanSource::new(id, alias))),
        "tsi.map.upper" => Some(Box::new(TextTransform::new(id, alias))),
        "tsi.sink.text" => Some(Box::new(SinkBuffer::new(id, alias, PayloadKind::String, 32))),
        _ => None,
    }
}

#[test]
fn board_wave_feeds_screen_buffer() {
    // Board side: decode, validate, instantiate, run.
    let instruction = BoardDecoder::new().unwrap().decode(BOARD).expect("decode board");
    let diag = validate_board_instruction(&instruction);
    assert!(diag.ok(), "{:?}", diag.errors);
    let mut board = instantiate_board(&instruction, &factory).expect("instantiate");
    assert!(validate_board(&board).is_ok());

    let mut ctx = TsiContext::default();
    let outcome = run_circuit(&mut board.circuits[0], &mut ctx, RunOptions::default());
    assert!(outcome.is_ok());
    // src + 2x map + 2x sink.
    assert_eq!(outcome.steps, 5);

    let sink = board.circuits[0].nodes[2]
        .as_any()
        .downcast_ref::<SinkBuffer>()
        .expect("sink node");
    let texts: Vec<&str> = sink
        .items()
        .iter()
        .filter_map(|(_, s)| s.as_text())
        .collect();
    assert_eq!(texts, vec!["ONE", "TWO"]);

    // Screen side: decode, validate, build, capture the sink contents.
    let renderings = RenderingsDecoder::new().unwrap().decode(SCREENS).expect("decode screens");
    let opts = SessionOpts::default();
    assert!(validate_instruction(&renderings, &opts.validate).ok());

    let mut store = FixedSlotStore::new();
    let mut session = ScreenSession::new(renderings, opts);
    assert!(session.build_all(&store, 60, 16), "{:?}", session.diag().errors);

    let mut out = session.router().unwrap().capture(SysStream::Stdout);
    for t in &texts {
        out.write_line(t);
    }
    assert!(session.pump_streams(&mut store));

    let buffer = session.active_buffer().unwrap().clone();
    {
        let node = buffer.borrow();
        let WidgetPayload::Buffer(bb) = &node.payload else {
            panic!("buffer payload");
        };
        let lines: Vec<&str> = bb.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(lines, vec!["ONE", "TWO"]);
    }

    // Rendered frame shows the routed lines.
    let colors = shared_colors();
    let mut renderer = MemoryRenderer::new(16, 60);
    {
        let mut rctx = RenderCtx::new(&mut renderer, colors);
        session.render(&mut rctx);
    }
    let frame: String = (0..16).map(|y| renderer.row_text(y)).collect::<Vec<_>>().join("\n");
    assert!(frame.contains("ONE"));
    assert!(frame.contains("TWO"));
}

#[test]
fn screen_switching_and_action_dispatch() {
    let renderings = RenderingsDecoder::new().unwrap().decode(SCREENS).unwrap();
    let opts = SessionOpts::default();
    let mut store = FixedSlotStore::new();
    let mut session = ScreenSession::new(renderings, opts);
    assert!(session.build_all(&store, 60, 16));

    // F+2 switches; unknown F+9 shows the fallback listing.
    assert_eq!(session.handle_screen_key(ScreenKey::Fn(2)), SwitchOutcome::Switched);
    assert_eq!(session.handle_screen_key(ScreenKey::Fn(9)), SwitchOutcome::Switched);

    let colors = shared_colors();
    let mut renderer = MemoryRenderer::new(16, 60);
    {
        let mut rctx = RenderCtx::new(&mut renderer, colors.clone());
        session.render(&mut rctx);
    }
    let frame: String = (0..16).map(|y| renderer.row_text(y)).collect::<Vec<_>>().join("\n");
    assert!(frame.contains("F+9"), "fallback names the pressed key");
    assert!(frame.contains("F+1") && frame.contains("F+2"), "fallback lists configured keys");

    // Update flows into the inactive screen's label.
    store.set_str(0, "running".to_string());
    let d = session.dispatch_event_all("status", &mut store, Some(&DispatchPayload::text("running")));
    assert!(d.ok(), "{:?}", d.errors);
    assert_eq!(session.handle_screen_key(ScreenKey::Fn(2)), SwitchOutcome::Switched);

    let mut renderer = MemoryRenderer::new(16, 60);
    {
        let mut rctx = RenderCtx::new(&mut renderer, colors);
        session.render(&mut rctx);
    }
    let frame: String = (0..16).map(|y| renderer.row_text(y)).collect::<Vec<_>>().join("\n");
    assert!(frame.contains("running"));
}
