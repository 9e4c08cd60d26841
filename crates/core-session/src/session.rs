//! Multi-screen session: builds every screen once, switches on activation
//! keys, keeps widget state alive across switches, and pumps captured
//! streams into all built screens.

use ahash::AHashMap;
use core_bnf::Diagnostics;
use core_render::RenderCtx;
use core_screen::{
    FigureKind, RenderingsInstruction, SlotStore, ValidateOpts, is_unset,
};
use core_widget::{LayoutSpec, Style, TextAlign, TextBox, WidgetNode, WidgetPayload, WidgetRef, add_child, object};
use tracing::{debug, info, warn};

use crate::build::{BuildOpts, BuiltScreen, build_screen, make_error_box, render_root};
use crate::dispatch::{DispatchPayload, dispatch_event};
use crate::keys::{ScreenKey, parse_screen_key};
use crate::streams::StreamRouter;

#[derive(Debug, Clone, Default)]
pub struct SessionOpts {
    pub build: BuildOpts,
    pub validate: ValidateOpts,
    /// Name of a screen used as the bottom-strip template for every built
    /// screen. That screen is never built or key-switched on its own.
    pub footer_screen: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    NotHandled,
    /// Active view changed (switch or fallback page).
    Switched,
    /// Key mapped to a screen that failed to build.
    Error,
}

pub struct ScreenSession {
    instruction: RenderingsInstruction,
    opts: SessionOpts,

    screen_for_key: AHashMap<ScreenKey, usize>,

    active_screen: usize,
    built: Vec<BuiltScreen>,
    built_ok: Vec<bool>,
    router: Option<StreamRouter>,

    /// First buffer figure of the active screen, target of scroll keys.
    active_buffer: Option<WidgetRef>,
    active_buffer_id: String,

    fallback_active: bool,
    fallback_root: Option<WidgetRef>,

    last_diag: Diagnostics,
}

impl ScreenSession {
    pub fn new(instruction: RenderingsInstruction, opts: SessionOpts) -> Self {
        let mut screen_for_key = AHashMap::default();
        for (si, sc) in instruction.screens.iter().enumerate() {
            if opts.footer_screen.as_deref() == Some(sc.name.as_str()) {
                continue;
            }
            if let Some(key) = parse_screen_key(&sc.key_raw) {
                screen_for_key.insert(key, si);
            }
        }
        Self {
            instruction,
            opts,
            screen_for_key,
            active_screen: 0,
            built: Vec::new(),
            built_ok: Vec::new(),
            router: None,
            active_buffer: None,
            active_buffer_id: String::new(),
            fallback_active: false,
            fallback_root: None,
            last_diag: Diagnostics::default(),
        }
    }

    pub fn diag(&self) -> &Diagnostics {
        &self.last_diag
    }

    pub fn router(&self) -> Option<&StreamRouter> {
        self.router.as_ref()
    }

    pub fn active_built(&self) -> Option<&BuiltScreen> {
        if *self.built_ok.get(self.active_screen)? {
            self.built.get(self.active_screen)
        } else {
            None
        }
    }

    pub fn active_built_mut(&mut self) -> Option<&mut BuiltScreen> {
        if !*self.built_ok.get(self.active_screen)? {
            return None;
        }
        self.built.get_mut(self.active_screen)
    }

    pub fn active_buffer(&self) -> Option<&WidgetRef> {
        self.active_buffer.as_ref()
    }

    /// Build every screen once; widget state (buffers, inputs) survives
    /// screen switches. The stream router attaches across the union of
    /// all built screens.
    pub fn build_all(&mut self, store: &dyn SlotStore, cols: i32, rows: i32) -> bool {
        self.last_diag = Diagnostics::default();
        // Detach before re-attaching so capture handles of a previous
        // generation stop routing.
        self.router = None;

        let footer_index = self.opts.footer_screen.as_deref().and_then(|name| {
            let found = self.instruction.screens.iter().position(|s| s.name == name);
            if found.is_none() {
                warn!(target: "session", footer = name, "footer screen not found, using fallback bar");
            }
            found
        });
        let footer = footer_index.map(|i| self.instruction.screens[i].clone());

        self.built = (0..self.instruction.screens.len())
            .map(|si| {
                if Some(si) == footer_index {
                    // The footer template is not a standalone screen.
                    return BuiltScreen::default();
                }
                build_screen(
                    &self.instruction,
                    si,
                    store,
                    cols,
                    rows,
                    &self.opts.build,
                    &self.opts.validate,
                    footer.as_ref(),
                )
            })
            .collect();
        self.built_ok = self.built.iter().map(BuiltScreen::ok).collect();

        for (ok, built) in self.built_ok.iter().zip(&self.built) {
            if !ok {
                self.last_diag.merge(built.diag.clone());
            }
        }

        let ok_refs: Vec<&BuiltScreen> = self
            .built
            .iter()
            .zip(&self.built_ok)
            .filter(|&(_, &ok)| ok)
            .map(|(b, _)| b)
            .collect();
        if ok_refs.is_empty() {
            return false;
        }
        self.router = Some(StreamRouter::attach_for_many(&ok_refs));

        if !self.built_ok.get(self.active_screen).copied().unwrap_or(false) {
            self.active_screen = self.built_ok.iter().position(|&ok| ok).unwrap_or(0);
        }
        self.refresh_active_buffer();
        info!(
            target: "session",
            screens = self.built.len(),
            ok = self.built_ok.iter().filter(|&&b| b).count(),
            "screens built"
        );
        self.built_ok.get(self.active_screen).copied().unwrap_or(false)
    }

    /// Switch the active screen (no rebuild, no state reset).
    pub fn switch_to(&mut self, screen_index: usize) -> bool {
        self.last_diag = Diagnostics::default();
        if screen_index >= self.built.len() || !self.built_ok[screen_index] {
            if let Some(b) = self.built.get(screen_index) {
                self.last_diag = b.diag.clone();
            } else {
                self.last_diag.err("switch_to: screen index out of range");
            }
            return false;
        }
        self.active_screen = screen_index;
        self.fallback_active = false;
        self.refresh_active_buffer();
        debug!(target: "session", screen = screen_index, "screen switched");
        true
    }

    /// Screen-switch key handling: configured keys switch, unconfigured
    /// function keys show the fallback page listing what is configured.
    pub fn handle_screen_key(&mut self, key: ScreenKey) -> SwitchOutcome {
        if let Some(&si) = self.screen_for_key.get(&key) {
            if !self.fallback_active && si == self.active_screen {
                return SwitchOutcome::NotHandled;
            }
            return if self.switch_to(si) {
                SwitchOutcome::Switched
            } else {
                SwitchOutcome::Error
            };
        }
        if let ScreenKey::Fn(n) = key {
            self.show_unconfigured_fn_screen(n);
            return SwitchOutcome::Switched;
        }
        SwitchOutcome::NotHandled
    }

    fn show_unconfigured_fn_screen(&mut self, fn_key: u8) {
        self.fallback_active = true;
        self.fallback_root = Some(self.build_unconfigured_fn_root(fn_key));
        // Don't let scroll keys mutate a hidden buffer while the fallback
        // page is visible.
        self.active_buffer = None;
        self.active_buffer_id.clear();
    }

    fn build_unconfigured_fn_root(&self, fn_key: u8) -> WidgetRef {
        let mut root_node = WidgetNode::new("unconfigured_fn_screen");
        root_node.style = Style::default();
        let root = object(root_node);

        let mut msg = format!("No screen is configured for key F+{fn_key}.\n\nConfigured screens:\n");
        let mut any = false;
        for sc in &self.instruction.screens {
            if self.opts.footer_screen.as_deref() == Some(sc.name.as_str()) {
                continue;
            }
            let Some(ScreenKey::Fn(n)) = parse_screen_key(&sc.key_raw) else {
                continue;
            };
            any = true;
            let name = if is_unset(&sc.name) { "(unnamed)" } else { &sc.name };
            msg.push_str(&format!("  F+{n}  ->  {name}\n"));
        }
        if !any {
            msg.push_str("  (none)\n");
        }
        msg.push_str("\nFix: add __key F+N to a screen in the renderings instruction.\n");

        let box_ = make_error_box(
            "unconfigured_key",
            &msg,
            LayoutSpec::normalized(0.05, 0.10, 0.90, 0.45),
        );
        add_child(&root, box_);

        let mut hint = WidgetNode::new("hint");
        hint.layout = LayoutSpec::normalized(0.05, 0.60, 0.90, 0.10);
        hint.style = Style {
            bold: true,
            label_color: "yellow".to_string(),
            ..Style::default()
        };
        hint.payload = WidgetPayload::Text(TextBox::new(
            "Press a configured F+N key to switch screens.",
            true,
            TextAlign::Left,
        ));
        add_child(&root, object(hint));
        root
    }

    pub fn active_root(&self) -> Option<WidgetRef> {
        if self.fallback_active && self.fallback_root.is_some() {
            return self.fallback_root.clone();
        }
        self.active_built()
            .and_then(|b| b.root.clone())
            .or_else(|| self.fallback_root.clone())
    }

    /// Render the active view; clears first so leftovers of the previous
    /// screen never bleed through.
    pub fn render(&self, ctx: &mut RenderCtx<'_>) {
        ctx.r.clear();
        if let Some(root) = self.active_root() {
            render_root(ctx, &root);
        }
        if let Err(e) = ctx.r.flush() {
            tracing::error!(target: "session", error = %e, "flush failed");
        }
    }

    fn refresh_active_buffer(&mut self) {
        self.active_buffer = None;
        self.active_buffer_id.clear();
        let found = {
            let Some(built) = self.active_built() else {
                return;
            };
            // First buffer figure in id order keeps this deterministic.
            let mut ids: Vec<&String> = built
                .figure_kind_by_id
                .iter()
                .filter(|&(_, &kind)| kind == FigureKind::Buffer)
                .map(|(id, _)| id)
                .collect();
            ids.sort();
            ids.first().and_then(|id| {
                built
                    .figure_object_by_id
                    .get(*id)
                    .map(|obj| ((*id).clone(), obj.clone()))
            })
        };
        if let Some((id, obj)) = found {
            self.active_buffer_id = id;
            self.active_buffer = Some(obj);
        }
    }

    /// Dispatch into every built screen so inactive screens stay in sync.
    pub fn dispatch_event_all(
        &mut self,
        event_name: &str,
        store: &mut dyn SlotStore,
        payload: Option<&DispatchPayload>,
    ) -> Diagnostics {
        let mut out = Diagnostics::default();
        for (built, &ok) in self.built.iter_mut().zip(&self.built_ok) {
            if ok && built.events_by_name.contains_key(event_name) {
                out.merge(dispatch_event(built, event_name, store, payload));
            }
        }
        out
    }

    /// Drain captured stream lines into all built screens.
    pub fn pump_streams(&mut self, store: &mut dyn SlotStore) -> bool {
        let Some(router) = self.router.take() else {
            return false;
        };
        let changed = router.pump_all(&mut self.built, store);
        self.router = Some(router);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::SysStream;
    use core_render::{MemoryRenderer, shared_colors};
    use core_screen::{FixedSlotStore, RenderingsDecoder};

    const TWO_SCREENS: &str = r#"
        _screen (
          __name = first
          __key = F+1
          _rectangle (
            __coords = 0,0 __shape = 100,100
            _buffer ( __coords = 0,0 __shape = 100,100 __capacity = 50 __trigger = log )
          )
          _update ( __name = log __form = str = .sys.stdout )
        )
        _screen (
          __name = second
          __key = F+2
          _rectangle (
            __coords = 0,0 __shape = 100,100
            _label ( __coords = 0,0 __shape = 100,20 __value = "hello second" __trigger = lab )
          )
          _update ( __name = lab __form = str = .str0 )
        )
    "#;

    fn session() -> (ScreenSession, FixedSlotStore) {
        let inst = RenderingsDecoder::new().unwrap().decode(TWO_SCREENS).unwrap();
        let mut sess = ScreenSession::new(inst, SessionOpts::default());
        let store = FixedSlotStore::new();
        assert!(sess.build_all(&store, 60, 20), "{:?}", sess.diag().errors);
        (sess, store)
    }

    #[test]
    fn activation_keys_switch_screens() {
        let (mut sess, _) = session();
        assert_eq!(sess.active_screen, 0);
        assert_eq!(sess.handle_screen_key(ScreenKey::Fn(2)), SwitchOutcome::Switched);
        assert_eq!(sess.active_screen, 1);
        // Already active: nothing to do.
        assert_eq!(sess.handle_screen_key(ScreenKey::Fn(2)), SwitchOutcome::NotHandled);
        assert_eq!(sess.handle_screen_key(ScreenKey::Fn(1)), SwitchOutcome::Switched);
    }

    #[test]
    fn unknown_fn_key_shows_fallback_listing_configured_keys() {
        let (mut sess, _) = session();
        assert_eq!(sess.handle_screen_key(ScreenKey::Fn(9)), SwitchOutcome::Switched);
        assert!(sess.fallback_active);

        let mut r = MemoryRenderer::new(24, 80);
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        sess.render(&mut ctx);
        let all: String = (0..24).map(|y| r.row_text(y)).collect::<Vec<_>>().join("\n");
        assert!(all.contains("F+9"));
        assert!(all.contains("F+1"));
        assert!(all.contains("F+2"));

        // Returning to a configured key leaves the fallback.
        assert_eq!(sess.handle_screen_key(ScreenKey::Fn(1)), SwitchOutcome::Switched);
        assert!(!sess.fallback_active);
    }

    #[test]
    fn stdout_capture_routes_into_active_buffer() {
        let (mut sess, mut store) = session();
        let mut out = sess.router().unwrap().capture(SysStream::Stdout);
        out.write_line("hello");
        assert!(sess.pump_streams(&mut store));

        let buffer = sess.active_buffer().unwrap().clone();
        let node = buffer.borrow();
        let WidgetPayload::Buffer(bb) = &node.payload else {
            panic!("buffer payload")
        };
        assert_eq!(bb.lines.len(), 1);
        assert_eq!(bb.lines[0].text, "hello");
    }

    #[test]
    fn inactive_screens_receive_dispatches() {
        let (mut sess, mut store) = session();
        store.set_str(0, "updated".to_string());
        let d = sess.dispatch_event_all("lab", &mut store, None);
        assert!(d.ok(), "{:?}", d.errors);

        // Screen 2 was inactive; its label should have refreshed anyway.
        sess.handle_screen_key(ScreenKey::Fn(2));
        let built = sess.active_built().unwrap();
        let id = built.figures_for_event["lab"][0].clone();
        let obj = built.figure_object_by_id[&id].clone();
        let node = obj.borrow();
        let WidgetPayload::Text(tb) = &node.payload else {
            panic!("label payload")
        };
        assert_eq!(tb.content, "updated");
    }

    #[test]
    fn render_paints_active_screen() {
        let (mut sess, _store) = session();
        sess.handle_screen_key(ScreenKey::Fn(2));
        let mut r = MemoryRenderer::new(20, 60);
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        sess.render(&mut ctx);
        let all: String = (0..20).map(|y| r.row_text(y)).collect::<Vec<_>>().join("\n");
        assert!(all.contains("hello second"));
        assert!(all.contains("F+N: switch screens"));
    }

    const FOOTER_SCREEN: &str = r#"
        _screen (
          __name = footer
          __key = F+3
          _rectangle (
            __coords = 0,0 __shape = 100,100 __z = 1
            _label ( __coords = 0,0 __shape = 60,100 __value = "status ready" )
            _input_box ( __coords = 60,0 __shape = 40,100 __value = "" )
          )
        )
    "#;

    #[test]
    fn footer_template_feeds_every_screen_and_is_not_switchable() {
        let text = format!("{TWO_SCREENS}\n{FOOTER_SCREEN}");
        let inst = RenderingsDecoder::new().unwrap().decode(&text).unwrap();
        let opts = SessionOpts {
            footer_screen: Some("footer".to_string()),
            ..SessionOpts::default()
        };
        let mut sess = ScreenSession::new(inst, opts);
        let store = FixedSlotStore::new();
        assert!(sess.build_all(&store, 60, 20), "{:?}", sess.diag().errors);

        // Both real screens carry the footer's status label.
        for si in [0usize, 1] {
            let built = &sess.built[si];
            assert!(built.ok());
            let menu = built.menu_bar.as_ref().expect("footer label");
            let node = menu.borrow();
            let WidgetPayload::Text(tb) = &node.payload else {
                panic!("label payload");
            };
            assert_eq!(tb.content, "status ready");
        }

        // The template's own F+3 key is not a switch target: it lands on
        // the unconfigured-key fallback page instead.
        assert_eq!(sess.handle_screen_key(ScreenKey::Fn(3)), SwitchOutcome::Switched);
        assert!(sess.fallback_active);

        let mut r = MemoryRenderer::new(20, 60);
        let mut ctx = RenderCtx::new(&mut r, shared_colors());
        sess.render(&mut ctx);
        let all: String = (0..20).map(|y| r.row_text(y)).collect::<Vec<_>>().join("\n");
        assert!(all.contains("F+3"));
    }

    #[test]
    fn buffer_state_survives_screen_switches() {
        let (mut sess, mut store) = session();
        let mut out = sess.router().unwrap().capture(SysStream::Stdout);
        out.write_line("persistent");
        sess.pump_streams(&mut store);

        sess.handle_screen_key(ScreenKey::Fn(2));
        sess.handle_screen_key(ScreenKey::Fn(1));

        let buffer = sess.active_buffer().unwrap().clone();
        let node = buffer.borrow();
        let WidgetPayload::Buffer(bb) = &node.payload else {
            panic!("buffer payload")
        };
        assert_eq!(bb.lines.len(), 1, "no rebuild on switch");
    }
}
