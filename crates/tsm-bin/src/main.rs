//! tsm entrypoint: load config + DSL documents, validate, run the board's
//! seed waves, then drive the screen session until quit.
//!
//! Exit codes: 0 on clean shutdown, non-zero on unrecoverable startup
//! failure (config, DSL validation, terminal setup) with diagnostics on
//! stderr.

use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use core_bnf::Diagnostics;
use core_board::{BoardDecoder, instantiate_board, validate_board_instruction};
use core_render::{RenderCtx, Renderer};
use core_screen::{FixedSlotStore, RenderingsDecoder, SlotStore, validate_instruction};
use core_session::{
    CaptureHandle, DispatchPayload, EditorKeyResult, InputKeyResult, ScreenKey, ScreenSession,
    SessionOpts, SwitchOutcome, SysStream, focused_figure, handle_buffer_scroll_key,
    handle_buffer_wheel, handle_editor_key, handle_focus_key, handle_text_input_key,
};
use core_terminal::{CrosstermBackend, CrosstermRenderer, TerminalBackend};
use core_tsi::{PayloadKind, RunOptions, TsiContext, TsiId, run_circuit, validate_board};
use core_tsi::nodes::{SinkBuffer, TextFanSource, TextTransform};
use core_widget::WidgetPayload;

/// Demo documents used when the config names none, so a bare `tsm` run
/// shows something real.
const DEMO_BOARD: &str = r#"
circuit demo =
  src = tsi.source.text;
  map = tsi.map.upper;
  out = tsi.sink.text;
  src@payload:str -> map@payload:str;
  map@payload:str -> out@payload:str;
  run("alpha beta gamma");
"#;

const DEMO_RENDERINGS: &str = r#"
_screen (
  __name = dashboard
  __key  = F+1
  __text_color = #C8C8C8
  _rectangle (
    __coords = 0,0 __shape = 100,65 __z = 1
    __border = true __title = "activity"
    _buffer (
      __coords = 0,0 __shape = 100,100
      __capacity = 1000
      __trigger = log_update
    )
  )
  _rectangle (
    __coords = 0,65 __shape = 100,35 __z = 2
    _input_box (
      __coords = 0,0 __shape = 40,30
      __value = "type and press enter"
      __trigger = submit
    )
    _horizontal_plot (
      __coords = 40,0 __shape = 60,100
      __type = line
      __trigger = data_update
    )
  )
  _update ( __name = log_update __label = sys __color = #80CBC4 __form = str = .sys.stdout )
  _action ( __name = submit __form = str = .str1 )
  _update ( __name = data_update __form = vec = .vec0 )
)

_screen (
  __name = errors
  __key  = F+2
  _rectangle (
    __coords = 0,0 __shape = 100,100 __z = 1
    __border = true __title = "stderr"
    _buffer (
      __coords = 0,0 __shape = 100,100
      __capacity = 500
      __trigger = err_update
    )
  )
  _update ( __name = err_update __label = err __color = #F14C4C __form = str = .sys.stderr )
)
"#;

fn configure_logging(config: &core_config::Config) -> Result<WorkerGuard> {
    let file = &config.file.logging.file;
    let dir = file.parent().filter(|p| !p.as_os_str().is_empty());
    let name = file
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tsm.log"));
    let appender = tracing_appender::rolling::never(
        dir.unwrap_or_else(|| std::path::Path::new(".")),
        name,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.file.logging.filter.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn fail_with_diagnostics(stage: &str, diag: &Diagnostics) -> ! {
    eprintln!("[{stage}] validation failed:");
    for e in &diag.errors {
        eprintln!("  error: {e}");
    }
    for w in &diag.warnings {
        eprintln!("  warning: {w}");
    }
    std::process::exit(1);
}

fn node_factory(tsi_type: &str, id: TsiId, alias: &str) -> Option<Box<dyn core_tsi::Tsi>> {
    match tsi_type {
        "tsi.source.text" => Some(Box::new(TextFanSource::new(id, alias))),
        "tsi.map.upper" => Some(Box::new(TextTransform::new(id, alias))),
        "tsi.sink.text" => Some(Box::new(SinkBuffer::new(id, alias, PayloadKind::String, 256))),
        "tsi.sink.tensor" => Some(Box::new(SinkBuffer::new(id, alias, PayloadKind::Tensor, 256))),
        _ => None,
    }
}

fn load_document(config: &core_config::Config, doc: Option<&PathBuf>, fallback: &str) -> Result<String> {
    match doc {
        Some(path) => {
            let resolved = config.resolve_document(path);
            std::fs::read_to_string(&resolved)
                .with_context(|| format!("reading DSL document {}", resolved.display()))
        }
        None => Ok(fallback.to_string()),
    }
}

/// Run every circuit's seed wave, narrating into the stdout capture so
/// the session buffer shows the board activity.
fn run_board_waves(board: &mut core_tsi::Board, narrate: &mut CaptureHandle) {
    let mut ctx = TsiContext::default();
    for circuit in &mut board.circuits {
        let name = circuit.name.clone();
        let outcome = run_circuit(circuit, &mut ctx, RunOptions::default());
        match &outcome.error {
            None => narrate.write_line(&format!("[board] circuit {name}: {} steps", outcome.steps)),
            Some(e) => narrate.write_line(&format!(
                "[board] circuit {name}: terminated after {} steps: {e}",
                outcome.steps
            )),
        }
        for node in &circuit.nodes {
            if let Some(sink) = node.as_any().downcast_ref::<SinkBuffer>() {
                for (wave, signal) in sink.items() {
                    narrate.write_line(&format!(
                        "[board] {} wave={{{},{}}} {}",
                        node.instance_name(),
                        wave.id,
                        wave.i,
                        signal.summarize(),
                    ));
                }
            }
        }
    }
}

fn seed_demo_data(store: &mut FixedSlotStore) {
    let pts: Vec<(f64, f64)> = (0..120)
        .map(|i| (f64::from(i), (f64::from(i) * 0.12).sin()))
        .collect();
    store.set_vec(0, pts);
    store.set_str(1, String::new());
}

fn refreshed_plot(tick: u32) -> Vec<(f64, f64)> {
    (0..120)
        .map(|i| {
            (
                f64::from(i),
                (f64::from(i) * 0.12 + 0.15 * f64::from(tick)).sin(),
            )
        })
        .collect()
}

fn save_focused_editor(session: &mut ScreenSession) {
    let Some(built) = session.active_built_mut() else {
        return;
    };
    let Some((_, obj, _)) = focused_figure(built) else {
        return;
    };
    let mut node = obj.borrow_mut();
    let WidgetPayload::Editor(ed) = &mut node.payload else {
        return;
    };
    if ed.path.is_empty() {
        ed.status = "no path".to_string();
        return;
    }
    match std::fs::File::create(&ed.path).and_then(|mut f| f.write_all(ed.to_text().as_bytes())) {
        Ok(()) => {
            ed.dirty = false;
            ed.status = "saved".to_string();
        }
        Err(e) => {
            warn!(target: "tsm", error = %e, path = %ed.path, "editor save failed");
            ed.status = "save failed".to_string();
        }
    }
}

fn main() -> Result<()> {
    // tsm [config_path]
    let config_arg = std::env::args().nth(1).map(PathBuf::from);
    let config = core_config::load_from(config_arg.as_deref())?;
    let _log_guard = configure_logging(&config)?;
    info!(target: "tsm", "startup");

    // Decode + validate both documents before the terminal starts, so
    // failures print plainly.
    let board_text = load_document(&config, config.file.documents.board.as_ref(), DEMO_BOARD)?;
    let board_decoder = BoardDecoder::new().context("compiling board grammar")?;
    let board_instruction = board_decoder
        .decode(&board_text)
        .context("decoding board instruction")?;
    let board_diag = validate_board_instruction(&board_instruction);
    if !board_diag.ok() {
        fail_with_diagnostics("board", &board_diag);
    }

    let renderings_text = load_document(
        &config,
        config.file.documents.renderings.as_ref(),
        DEMO_RENDERINGS,
    )?;
    let renderings_decoder = RenderingsDecoder::new().context("compiling renderings grammar")?;
    let renderings = renderings_decoder
        .decode(&renderings_text)
        .context("decoding renderings instruction")?;
    let opts = SessionOpts {
        footer_screen: config.file.documents.footer_screen.clone(),
        ..SessionOpts::default()
    };
    let screen_diag = validate_instruction(&renderings, &opts.validate);
    if !screen_diag.ok() {
        fail_with_diagnostics("renderings", &screen_diag);
    }

    let mut board = match instantiate_board(&board_instruction, &node_factory) {
        Ok(b) => b,
        Err(diag) => fail_with_diagnostics("board.instantiate", &diag),
    };
    if let Err(issue) = validate_board(&board) {
        bail!("board runtime validation failed: {issue}");
    }

    let mut store = FixedSlotStore::new();
    seed_demo_data(&mut store);

    // Terminal up; the guard restores it on every exit path.
    let mut backend = CrosstermBackend::new();
    backend.set_title("tsm")?;
    let _term_guard = backend.enter_guard()?;

    let colors = core_render::shared_colors();
    let mut renderer = CrosstermRenderer::new(colors.clone());

    let mut session = ScreenSession::new(renderings, opts);
    let (rows, cols) = renderer.size();
    if !session.build_all(&store, cols, rows) {
        drop(_term_guard);
        fail_with_diagnostics("session.build", session.diag());
    }

    let mut out_capture = session
        .router()
        .map(|r| r.capture(SysStream::Stdout))
        .context("stream router missing")?;
    let mut err_capture = session.router().map(|r| r.capture(SysStream::Stderr));

    // One seed wave per circuit, narrated into the activity buffer.
    run_board_waves(&mut board, &mut out_capture);
    out_capture.write_line("[tsm] F+N switch screens, Tab focus, Alt+q quit");
    out_capture.write_line("[tsm] Alt+u refresh plot, Alt+o stdout line, Alt+e stderr line");
    session.pump_streams(&mut store);

    {
        let mut ctx = RenderCtx::new(&mut renderer, colors.clone());
        session.render(&mut ctx);
    }

    let mut plot_tick: u32 = 0;
    let mut out_seq: u64 = 0;
    let mut err_seq: u64 = 0;

    loop {
        let mut changed = false;

        if crossterm::event::poll(Duration::from_millis(50))? {
            match crossterm::event::read()? {
                Event::Key(key) => {
                    if is_quit(&key) {
                        break;
                    }
                    changed |= handle_key(
                        &mut session,
                        &mut store,
                        &key,
                        &mut out_capture,
                        err_capture.as_mut(),
                        &mut plot_tick,
                        &mut out_seq,
                        &mut err_seq,
                    );
                }
                Event::Mouse(ev) => {
                    if let Some(buffer) = session.active_buffer().cloned() {
                        changed |= handle_buffer_wheel(&buffer, &ev);
                    }
                }
                Event::Resize(_, _) => changed = true,
                _ => {}
            }
        }

        changed |= session.pump_streams(&mut store);

        if changed {
            let mut ctx = RenderCtx::new(&mut renderer, colors.clone());
            session.render(&mut ctx);
        }
    }

    info!(target: "tsm", "shutdown");
    Ok(())
}

fn is_quit(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::ALT)
}

#[allow(clippy::too_many_arguments)]
fn handle_key(
    session: &mut ScreenSession,
    store: &mut FixedSlotStore,
    key: &KeyEvent,
    out_capture: &mut CaptureHandle,
    err_capture: Option<&mut CaptureHandle>,
    plot_tick: &mut u32,
    out_seq: &mut u64,
    err_seq: &mut u64,
) -> bool {
    // 1) Screen switching + unconfigured-key fallback.
    if let KeyCode::F(n) = key.code {
        return session.handle_screen_key(ScreenKey::Fn(n)) != SwitchOutcome::NotHandled;
    }

    // 2) UI keys: typing, focus, scroll. A consumed key is never a command.
    let mut committed: Option<String> = None;
    let mut save_requested = false;
    if let Some(built) = session.active_built_mut() {
        match handle_text_input_key(built, key) {
            InputKeyResult::Handled => return true,
            InputKeyResult::Committed(text) => committed = Some(text),
            InputKeyResult::NotHandled => {}
        }
        if committed.is_none() {
            match handle_editor_key(built, key) {
                EditorKeyResult::Handled => return true,
                EditorKeyResult::SaveRequested => save_requested = true,
                EditorKeyResult::NotHandled => {}
            }
            if !save_requested && handle_focus_key(built, key) {
                return true;
            }
        }
    }
    if save_requested {
        save_focused_editor(session);
        return true;
    }
    if let Some(text) = committed {
        // Committed terminal input echoes into the activity stream.
        out_capture.write_line(&format!("> {text}"));
        if let Some(built) = session.active_built_mut()
            && built.events_by_name.contains_key("submit")
        {
            let _ = core_session::dispatch_event(
                built,
                "submit",
                store,
                Some(&DispatchPayload::text(text)),
            );
        }
        return true;
    }

    if let Some(buffer) = session.active_buffer().cloned()
        && handle_buffer_scroll_key(&buffer, key)
    {
        return true;
    }

    // 3) Application commands require Alt.
    if !key.modifiers.contains(KeyModifiers::ALT) {
        return false;
    }
    match key.code {
        KeyCode::Char('o') => {
            out_capture.write_line(&format!("[key] stdout one seq={}", *out_seq));
            *out_seq += 1;
            true
        }
        KeyCode::Char('e') => {
            if let Some(err) = err_capture {
                err.write_line(&format!("[key] stderr one seq={}", *err_seq));
                *err_seq += 1;
            }
            true
        }
        KeyCode::Char('u') => {
            store.set_vec(0, refreshed_plot(*plot_tick));
            *plot_tick += 1;
            let _ = session.dispatch_event_all("data_update", store, None);
            true
        }
        _ => false,
    }
}
