//! Key decomposition: screen-switch keys, focus keys, text/editor/buffer
//! keys routed to the focused widget. Everything else is an application
//! command.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use core_screen::FigureKind;
use core_widget::{WidgetPayload, content_rect};
use unicode_segmentation::UnicodeSegmentation;

use crate::build::BuiltScreen;
use crate::focus::{focus_next, focus_prev, focused_figure};

bitflags! {
    /// Modifier mask in routing decisions (wheel acceleration, chords).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModMask: u8 {
        const CTRL  = 0b0001;
        const ALT   = 0b0010;
        const SHIFT = 0b0100;
    }
}

pub fn mod_mask(mods: KeyModifiers) -> ModMask {
    let mut out = ModMask::empty();
    if mods.contains(KeyModifiers::CONTROL) {
        out |= ModMask::CTRL;
    }
    if mods.contains(KeyModifiers::ALT) {
        out |= ModMask::ALT;
    }
    if mods.contains(KeyModifiers::SHIFT) {
        out |= ModMask::SHIFT;
    }
    out
}

/// Screen activation key parsed from `__key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKey {
    /// `F0` / `F+0`: the default screen.
    Default,
    /// `F+N` for N >= 1.
    Fn(u8),
}

pub fn parse_screen_key(key_raw: &str) -> Option<ScreenKey> {
    if key_raw.is_empty() || key_raw == "<empty>" {
        return None;
    }
    let k = key_raw.to_ascii_lowercase();
    if k == "f0" || k == "f+0" {
        return Some(ScreenKey::Default);
    }
    let n: u8 = k.strip_prefix("f+")?.parse().ok()?;
    if n >= 1 { Some(ScreenKey::Fn(n)) } else { None }
}

/// What a text-input key press did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKeyResult {
    NotHandled,
    Handled,
    /// Enter committed the input line.
    Committed(String),
}

/// Typing into the focused input box. Backspace removes one grapheme
/// cluster, Enter commits and clears.
pub fn handle_text_input_key(built: &mut BuiltScreen, key: &KeyEvent) -> InputKeyResult {
    let Some((_, obj, kind)) = focused_figure(built) else {
        return InputKeyResult::NotHandled;
    };
    if kind != FigureKind::InputBox {
        return InputKeyResult::NotHandled;
    }
    let mut node = obj.borrow_mut();
    let WidgetPayload::Text(tb) = &mut node.payload else {
        return InputKeyResult::NotHandled;
    };

    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            tb.content.push(c);
            InputKeyResult::Handled
        }
        KeyCode::Backspace => {
            if let Some((at, _)) = tb.content.grapheme_indices(true).next_back() {
                tb.content.truncate(at);
            }
            InputKeyResult::Handled
        }
        KeyCode::Enter => {
            let committed = std::mem::take(&mut tb.content);
            InputKeyResult::Committed(committed)
        }
        _ => InputKeyResult::NotHandled,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKeyResult {
    NotHandled,
    Handled,
    /// Ctrl+S with the editor's path and content snapshot queued for save.
    SaveRequested,
}

/// Editing keys for the focused text editor. The save itself stays with
/// the caller so tests and the binary control file IO.
pub fn handle_editor_key(built: &mut BuiltScreen, key: &KeyEvent) -> EditorKeyResult {
    let Some((_, obj, kind)) = focused_figure(built) else {
        return EditorKeyResult::NotHandled;
    };
    if kind != FigureKind::TextEditor {
        return EditorKeyResult::NotHandled;
    }
    let mut node = obj.borrow_mut();
    let WidgetPayload::Editor(ed) = &mut node.payload else {
        return EditorKeyResult::NotHandled;
    };

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('s') if ctrl => EditorKeyResult::SaveRequested,
        KeyCode::Char(c) if !ctrl => {
            ed.insert_char(c);
            EditorKeyResult::Handled
        }
        KeyCode::Enter => {
            ed.newline();
            EditorKeyResult::Handled
        }
        KeyCode::Backspace => {
            ed.backspace();
            EditorKeyResult::Handled
        }
        KeyCode::Delete => {
            ed.delete();
            EditorKeyResult::Handled
        }
        KeyCode::Left => {
            ed.move_cursor(0, -1);
            EditorKeyResult::Handled
        }
        KeyCode::Right => {
            ed.move_cursor(0, 1);
            EditorKeyResult::Handled
        }
        KeyCode::Up => {
            ed.move_cursor(-1, 0);
            EditorKeyResult::Handled
        }
        KeyCode::Down => {
            ed.move_cursor(1, 0);
            EditorKeyResult::Handled
        }
        KeyCode::Home => {
            ed.home();
            EditorKeyResult::Handled
        }
        KeyCode::End => {
            ed.end();
            EditorKeyResult::Handled
        }
        KeyCode::PageUp => {
            ed.page(-1);
            EditorKeyResult::Handled
        }
        KeyCode::PageDown => {
            ed.page(1);
            EditorKeyResult::Handled
        }
        _ => EditorKeyResult::NotHandled,
    }
}

/// Tab / Shift-Tab over the stable focus ring.
pub fn handle_focus_key(built: &mut BuiltScreen, key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::BackTab => {
            focus_prev(built);
            true
        }
        KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => {
            focus_prev(built);
            true
        }
        KeyCode::Tab => {
            focus_next(built);
            true
        }
        _ => false,
    }
}

const LINE_STEP: i32 = 1;
const PAGE_STEP: i32 = 10;
const SMALL_HEIGHT_ROWS: i32 = 8;
const MAX_WHEEL_STEP: i32 = 12;

/// Scroll keys for the active buffer: arrows and pages move through
/// history, `g` jumps back to the tail.
pub fn handle_buffer_scroll_key(buffer: &core_widget::WidgetRef, key: &KeyEvent) -> bool {
    let mut node = buffer.borrow_mut();
    let WidgetPayload::Buffer(bb) = &mut node.payload else {
        return false;
    };
    match key.code {
        KeyCode::Up => bb.scroll_by(LINE_STEP),
        KeyCode::Down => bb.scroll_by(-LINE_STEP),
        KeyCode::PageUp => bb.scroll_by(PAGE_STEP),
        KeyCode::PageDown => bb.scroll_by(-PAGE_STEP),
        KeyCode::Char('g') => bb.jump_tail(),
        _ => return false,
    }
    true
}

/// Mouse wheel scrolling scales with the visible height; Shift quadruples
/// and Ctrl doubles the step.
pub fn handle_buffer_wheel(buffer: &core_widget::WidgetRef, ev: &MouseEvent) -> bool {
    let step = {
        let node = buffer.borrow();
        if !matches!(node.payload, WidgetPayload::Buffer(_)) {
            return false;
        }
        let visible = content_rect(&node).h.max(1);
        let mut step = if visible > SMALL_HEIGHT_ROWS {
            ((visible + 5) / 6).clamp(2, MAX_WHEEL_STEP)
        } else {
            1
        };
        let mods = mod_mask(ev.modifiers);
        if mods.contains(ModMask::SHIFT) {
            step *= 4;
        }
        if mods.contains(ModMask::CTRL) {
            step *= 2;
        }
        step
    };

    let mut node = buffer.borrow_mut();
    let WidgetPayload::Buffer(bb) = &mut node.payload else {
        return false;
    };
    match ev.kind {
        MouseEventKind::ScrollUp => {
            bb.scroll_by(step); // older
            true
        }
        MouseEventKind::ScrollDown => {
            bb.scroll_by(-step); // newer
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::tests::built_screen;
    use crate::focus::set_focus;
    use core_screen::FixedSlotStore;
    use core_widget::{BufferBox, BufferDir, LayoutSpec, Rect, WidgetNode, layout_tree, object};
    use crossterm::event::{KeyEventKind, KeyEventState, MouseButton};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn key_with(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: mods,
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    #[test]
    fn parses_activation_keys() {
        assert_eq!(parse_screen_key("F+3"), Some(ScreenKey::Fn(3)));
        assert_eq!(parse_screen_key("f+12"), Some(ScreenKey::Fn(12)));
        assert_eq!(parse_screen_key("F0"), Some(ScreenKey::Default));
        assert_eq!(parse_screen_key("F+0"), Some(ScreenKey::Default));
        assert_eq!(parse_screen_key("<empty>"), None);
        assert_eq!(parse_screen_key("Q"), None);
    }

    #[test]
    fn typing_edits_the_focused_input() {
        let store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        set_focus(&mut built, 0); // the DSL input box

        assert_eq!(
            handle_text_input_key(&mut built, &key(KeyCode::Char('x'))),
            InputKeyResult::Handled
        );
        assert_eq!(
            handle_text_input_key(&mut built, &key(KeyCode::Backspace)),
            InputKeyResult::Handled
        );
        handle_text_input_key(&mut built, &key(KeyCode::Char('o')));
        handle_text_input_key(&mut built, &key(KeyCode::Char('k')));
        let got = handle_text_input_key(&mut built, &key(KeyCode::Enter));
        assert_eq!(got, InputKeyResult::Committed("hiok".to_string()));
    }

    #[test]
    fn input_keys_ignored_when_plot_focused() {
        let store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        set_focus(&mut built, 1); // plot
        assert_eq!(
            handle_text_input_key(&mut built, &key(KeyCode::Char('x'))),
            InputKeyResult::NotHandled
        );
    }

    #[test]
    fn tab_and_shift_tab_move_focus() {
        let store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        let start = built.focus_index;
        assert!(handle_focus_key(&mut built, &key(KeyCode::Tab)));
        assert_ne!(built.focus_index, start);
        assert!(handle_focus_key(&mut built, &key(KeyCode::BackTab)));
        assert_eq!(built.focus_index, start);
        assert!(!handle_focus_key(&mut built, &key(KeyCode::Char('a'))));
    }

    fn buffer_widget(h: i32) -> core_widget::WidgetRef {
        let mut n = WidgetNode::new("buf");
        n.layout = LayoutSpec::absolute(0.0, 0.0, 20.0, h as f64);
        let mut bb = BufferBox::new(100, BufferDir::UpDown);
        for i in 0..50 {
            bb.push_line(format!("l{i}"), "", "");
        }
        n.payload = WidgetPayload::Buffer(bb);
        let node = object(n);
        layout_tree(&node, Rect::new(0, 0, 20, h));
        node
    }

    #[test]
    fn buffer_keys_scroll_and_jump_tail() {
        let node = buffer_widget(6);
        assert!(handle_buffer_scroll_key(&node, &key(KeyCode::PageUp)));
        {
            let n = node.borrow();
            let WidgetPayload::Buffer(bb) = &n.payload else {
                unreachable!()
            };
            assert_eq!(bb.scroll, 10);
        }
        assert!(handle_buffer_scroll_key(&node, &key(KeyCode::Char('g'))));
        let n = node.borrow();
        let WidgetPayload::Buffer(bb) = &n.payload else {
            unreachable!()
        };
        assert_eq!(bb.scroll, 0);
        assert!(bb.follow_tail);
    }

    fn wheel(kind: MouseEventKind, mods: KeyModifiers) -> MouseEvent {
        MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: mods,
        }
    }

    #[test]
    fn wheel_step_scales_with_height_and_modifiers() {
        let tall = buffer_widget(18);
        assert!(handle_buffer_wheel(&tall, &wheel(MouseEventKind::ScrollUp, KeyModifiers::NONE)));
        {
            let n = tall.borrow();
            let WidgetPayload::Buffer(bb) = &n.payload else {
                unreachable!()
            };
            // (18 + 5) / 6 = 3
            assert_eq!(bb.scroll, 3);
        }

        let small = buffer_widget(4);
        assert!(handle_buffer_wheel(
            &small,
            &wheel(MouseEventKind::ScrollUp, KeyModifiers::SHIFT)
        ));
        let n = small.borrow();
        let WidgetPayload::Buffer(bb) = &n.payload else {
            unreachable!()
        };
        // Small widget: base step 1, Shift x4.
        assert_eq!(bb.scroll, 4);

        // Non-wheel events are not handled.
        assert!(!handle_buffer_wheel(
            &small,
            &wheel(MouseEventKind::Down(MouseButton::Left), KeyModifiers::NONE)
        ));
    }

    #[test]
    fn editor_keys_route_to_focused_editor_only() {
        let store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        set_focus(&mut built, 0); // input box, not editor
        assert_eq!(
            handle_editor_key(&mut built, &key(KeyCode::Char('x'))),
            EditorKeyResult::NotHandled
        );
        assert_eq!(
            handle_editor_key(&mut built, &key_with(KeyCode::Char('s'), KeyModifiers::CONTROL)),
            EditorKeyResult::NotHandled
        );
    }
}
