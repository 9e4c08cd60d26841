//! Screen sessions: building widget trees from validated renderings
//! instructions, dispatching events into data slots and figures, focus and
//! key routing, and stdout/stderr capture.

pub mod build;
pub mod dispatch;
pub mod focus;
pub mod keys;
pub mod session;
pub mod streams;

pub use build::{BuildOpts, BuiltScreen, build_screen};
pub use dispatch::{DispatchPayload, dispatch_event};
pub use focus::{focus_next, focus_prev, focused_figure, set_focus};
pub use keys::{
    EditorKeyResult, InputKeyResult, ModMask, ScreenKey, handle_buffer_scroll_key,
    handle_buffer_wheel, handle_editor_key, handle_focus_key, handle_text_input_key, mod_mask,
    parse_screen_key,
};
pub use session::{ScreenSession, SessionOpts, SwitchOutcome};
pub use streams::{CaptureHandle, StreamRouter, SysLine, SysStream};
