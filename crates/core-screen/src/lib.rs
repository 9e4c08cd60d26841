//! Renderings instructions: screens, panels, figures and events declared in
//! the DSL, decoded into typed structures, validated, and compiled into a
//! resolved event map bound to data slots.

pub mod data;
pub mod decode;
pub mod form;
pub mod model;
pub mod validate;

pub use data::{FixedSlotStore, Point, SlotStore};
pub use decode::{RENDERINGS_GRAMMAR, RenderingsDecoder};
pub use form::{
    BindKind, DataRef, ResolvedBinding, ResolvedEvent, ResolvedEventMap, SysRef,
    event_has_system_binding, first_binding_of_kind, kind_ok, parse_bind_kind, parse_data_path,
};
pub use model::{
    Binding, Coords, Event, EventKind, Figure, FigureKind, Panel, RenderingsInstruction, Screen,
    UNSET_TOKEN, is_ident, is_unset, is_valid_color_token, is_valid_plot_type, join_path,
    pick_color, sanitize_id,
};
pub use validate::{
    ScreenContract, ValidateOpts, compile_events, required_bind_kind_for_figure,
    required_event_kind_for_figure, validate_and_compile_screen, validate_data_access,
    validate_instruction,
};
