//! Screen validation + event compilation.
//!
//! All checks accumulate into a [`Diagnostics`]; a screen with any error is
//! never instantiated, but validation keeps going so the user sees every
//! problem at once.

use ahash::{AHashMap, AHashSet};
use core_bnf::Diagnostics;

use crate::data::SlotStore;
use crate::form::{
    BindKind, DataRef, ResolvedBinding, ResolvedEvent, ResolvedEventMap, event_has_system_binding,
    first_binding_of_kind, kind_ok, parse_bind_kind, parse_data_path,
};
use crate::model::{
    EventKind, Figure, FigureKind, Panel, RenderingsInstruction, Screen, is_ident, is_unset,
    is_valid_color_token, is_valid_plot_type,
};

/// Semantic strictness knobs. Defaults mirror the intended wiring rules.
#[derive(Debug, Clone, Copy)]
pub struct ValidateOpts {
    /// `__form` local names must be one of {str,vec,num}.
    pub strict_form_types: bool,
    /// Events must carry at least one `__form` binding.
    pub require_event_bindings: bool,
    /// Figure triggers must reference a declared event.
    pub require_trigger_event_exists: bool,
    /// One event may not drive figures of different kinds.
    pub forbid_mixed_figure_kinds_per_event: bool,
    /// The event kind must match what the figure kind requires.
    pub enforce_event_kind_by_figure: bool,
    /// All triggers of one figure must bind the same slot (buffers exempt).
    pub enforce_same_binding_per_figure: bool,
}

impl Default for ValidateOpts {
    fn default() -> Self {
        Self {
            strict_form_types: true,
            require_event_bindings: true,
            require_trigger_event_exists: true,
            forbid_mixed_figure_kinds_per_event: true,
            enforce_event_kind_by_figure: true,
            enforce_same_binding_per_figure: true,
        }
    }
}

/// The figure kind decides which binding type its events must supply.
pub fn required_bind_kind_for_figure(kind: FigureKind) -> BindKind {
    match kind {
        FigureKind::HorizontalPlot => BindKind::Vec,
        _ => BindKind::Str,
    }
}

/// ...and which event kind may trigger it.
pub fn required_event_kind_for_figure(kind: FigureKind) -> EventKind {
    match kind {
        FigureKind::InputBox => EventKind::Action,
        _ => EventKind::Update,
    }
}

fn pct_ok(v: f64) -> bool {
    v.is_finite() && (0.0..=100.0).contains(&v)
}

pub fn validate_screen_fields(sc: &Screen, si: usize, d: &mut Diagnostics) {
    let where_ = format!("screen[{si}]");

    if !is_unset(&sc.kind_raw) && sc.kind_raw != "_screen" {
        d.err(format!(
            "{where_}: kind_raw='{}' (expected _screen)",
            sc.kind_raw
        ));
    }
    if is_unset(&sc.name) || !is_ident(&sc.name) {
        d.err(format!("{where_}: invalid/missing __name '{}'", sc.name));
    }
    if !is_unset(&sc.key_raw) {
        let k = sc.key_raw.to_ascii_lowercase();
        let ok = k == "f0" || k == "f+0" || (k.len() >= 3 && k.starts_with("f+"));
        if !ok {
            d.warn(format!(
                "{where_}: __key '{}' not in expected form 'F+N' or 'F0'",
                sc.key_raw
            ));
        }
    }
    if !(sc.tickness > 0.0 && sc.tickness.is_finite()) {
        d.err(format!("{where_}: __tickness must be > 0"));
    }
    for (label, color) in [
        ("__line_color", &sc.line_color),
        ("__text_color", &sc.text_color),
        ("__back_color", &sc.back_color),
    ] {
        if !is_valid_color_token(color) {
            d.err(format!("{where_}: invalid {label} '{color}'"));
        }
    }
}

pub fn validate_panel_fields(p: &Panel, si: usize, pi: usize, d: &mut Diagnostics) {
    let where_ = format!("screen[{si}].panel[{pi}]");

    if !is_unset(&p.kind_raw) && p.kind_raw != "_rectangle" {
        d.err(format!(
            "{where_}: kind_raw='{}' (expected _rectangle)",
            p.kind_raw
        ));
    }
    if !p.coords.set {
        d.err(format!("{where_}: missing __coords"));
    }
    if !p.shape.set {
        d.err(format!("{where_}: missing __shape"));
    }
    if p.coords.set && (!pct_ok(p.coords.x) || !pct_ok(p.coords.y)) {
        d.err(format!("{where_}: __coords must be within [0,100]"));
    }
    if p.shape.set {
        if p.shape.x <= 0.0 || p.shape.y <= 0.0 {
            d.err(format!("{where_}: __shape must be > 0"));
        }
        if !pct_ok(p.shape.x) || !pct_ok(p.shape.y) {
            d.err(format!("{where_}: __shape must be within (0,100]"));
        }
    }
    if p.coords.set && p.shape.set {
        if p.coords.x + p.shape.x > 100.0 + 1e-9 {
            d.err(format!("{where_}: __coords.x + __shape.x must be <= 100"));
        }
        if p.coords.y + p.shape.y > 100.0 + 1e-9 {
            d.err(format!("{where_}: __coords.y + __shape.y must be <= 100"));
        }
    }
    if !(p.tickness > 0.0 && p.tickness.is_finite()) {
        d.err(format!("{where_}: __tickness must be > 0"));
    }
    if p.title_on && is_unset(&p.title) {
        d.err(format!("{where_}: __title set but title string is empty"));
    }
    for (label, color) in [
        ("__line_color", &p.line_color),
        ("__text_color", &p.text_color),
        ("__back_color", &p.back_color),
    ] {
        if !is_valid_color_token(color) {
            d.err(format!("{where_}: invalid {label} '{color}'"));
        }
    }
}

pub fn validate_figure_fields(f: &Figure, si: usize, pi: usize, fi: usize, d: &mut Diagnostics) {
    let where_ = format!("screen[{si}].panel[{pi}].figure[{fi}]");

    if is_unset(&f.kind_raw) {
        d.err(format!("{where_}: missing FIGURE kind"));
        return;
    }
    let Some(kind) = FigureKind::parse(&f.kind_raw) else {
        d.err(format!(
            "{where_}: unsupported FIGURE kind_raw='{}'",
            f.kind_raw
        ));
        return;
    };

    if !f.coords.set {
        d.err(format!("{where_}: missing __coords"));
    }
    if !f.shape.set {
        d.err(format!("{where_}: missing __shape"));
    }
    if f.shape.set && (f.shape.x <= 0.0 || f.shape.y <= 0.0) {
        d.err(format!("{where_}: __shape must be > 0"));
    }
    if !(f.tickness > 0.0 && f.tickness.is_finite()) {
        d.err(format!("{where_}: __tickness must be > 0"));
    }
    for (label, color) in [
        ("__line_color", &f.line_color),
        ("__text_color", &f.text_color),
        ("__back_color", &f.back_color),
    ] {
        if !is_valid_color_token(color) {
            d.err(format!("{where_}: invalid {label} '{color}'"));
        }
    }

    match kind {
        FigureKind::Label | FigureKind::InputBox => {
            if !f.has_value || is_unset(&f.value) {
                d.err(format!("{where_}: {} requires __value", f.kind_raw));
            }
        }
        FigureKind::HorizontalPlot => {
            if f.has_value && !is_unset(&f.value) {
                d.err(format!("{where_}: _horizontal_plot must NOT have __value"));
            }
            if !is_valid_plot_type(&f.type_raw) {
                d.err(format!(
                    "{where_}: invalid __type '{}' (expected line/scatter/stairs/stem)",
                    f.type_raw
                ));
            }
            if f.title_on && is_unset(&f.title) {
                d.err(format!("{where_}: __title set but title string is empty"));
            }
            if f.legend_on && is_unset(&f.legend) {
                d.err(format!("{where_}: __legend set but legend string is empty"));
            }
        }
        FigureKind::Buffer => {
            if f.has_value && !is_unset(&f.value) {
                d.err(format!("{where_}: _buffer must NOT have __value"));
            }
            if !f.has_capacity || f.capacity <= 0 {
                d.err(format!("{where_}: _buffer requires __capacity > 0"));
            }
            let t = if is_unset(&f.type_raw) {
                String::new()
            } else {
                f.type_raw.to_ascii_lowercase()
            };
            if !(t.is_empty() || t == "updown" || t == "downup") {
                d.err(format!(
                    "{where_}: _buffer invalid __type '{}' (expected updown/downup)",
                    f.type_raw
                ));
            }
        }
        FigureKind::TextEditor => {}
    }
}

/// Compile the screen's events into a name-keyed map; every binding is
/// type-checked here so dispatch can trust the map.
pub fn compile_events(
    sc: &Screen,
    si: usize,
    opts: &ValidateOpts,
    d: &mut Diagnostics,
) -> ResolvedEventMap {
    let mut out = ResolvedEventMap::default();
    let mut seen: AHashSet<&str> = AHashSet::default();

    for (ei, event) in sc.events.iter().enumerate() {
        let where_ = format!("screen[{si}].event[{ei}]");

        let Some(kind) = EventKind::parse(&event.kind_raw) else {
            d.err(format!(
                "{where_}: unsupported EVENT kind_raw='{}'",
                event.kind_raw
            ));
            continue;
        };
        if is_unset(&event.name) || !is_ident(&event.name) {
            d.err(format!("{where_}: invalid/missing __name '{}'", event.name));
            continue;
        }
        if !seen.insert(event.name.as_str()) {
            d.err(format!("{where_}: duplicate EVENT __name '{}'", event.name));
            continue;
        }
        if opts.require_event_bindings && event.bindings.is_empty() {
            d.err(format!("{where_}: missing __form bindings"));
            continue;
        }

        let mut resolved = ResolvedEvent {
            kind,
            name: event.name.clone(),
            label: None,
            color: None,
            bindings: Vec::new(),
        };

        if event.has_label && !is_unset(&event.label) {
            if !is_ident(&event.label) {
                d.err(format!("{where_}: invalid __label '{}'", event.label));
            } else {
                resolved.label = Some(event.label.clone());
            }
        }
        if event.has_color && !is_unset(&event.color) {
            if !is_valid_color_token(&event.color) {
                d.err(format!("{where_}: invalid __color '{}'", event.color));
            } else {
                resolved.color = Some(event.color.clone());
            }
        }

        for (bi, binding) in event.bindings.iter().enumerate() {
            let bwhere = format!("{where_}.binding[{bi}]");

            if is_unset(&binding.local_name) {
                d.err(format!(
                    "{bwhere}: invalid local_name '{}'",
                    binding.local_name
                ));
                continue;
            }
            if is_unset(&binding.path) {
                d.err(format!("{bwhere}: missing path_name"));
                continue;
            }

            let bind_kind = parse_bind_kind(&binding.local_name);
            if opts.strict_form_types && bind_kind.is_none() {
                d.err(format!(
                    "{bwhere}: local_name must be one of {{str,vec,num}}, got '{}'",
                    binding.local_name
                ));
                continue;
            }
            let Some(bind_kind) = bind_kind else {
                continue;
            };

            let Some(data_ref) = parse_data_path(&binding.path) else {
                d.err(format!(
                    "{bwhere}: invalid path '{}' (expected .strN/.vecN/.numN or .sys.stdout/.sys.stderr)",
                    binding.path
                ));
                continue;
            };

            if !kind_ok(bind_kind, &data_ref) {
                d.err(format!(
                    "{bwhere}: type mismatch: local '{}' vs path '{}'",
                    binding.local_name, binding.path
                ));
                continue;
            }

            resolved.bindings.push(ResolvedBinding {
                bind_kind,
                data_ref,
                raw: binding.path.clone(),
            });
        }

        // All bindings rejected means the event is not wired to anything.
        if opts.require_event_bindings && resolved.bindings.is_empty() {
            d.err(format!(
                "{where_}: no valid __form bindings (all bindings were invalid)"
            ));
            continue;
        }

        out.insert(resolved.name.clone(), resolved);
    }

    out
}

/// Every indexed slot referenced by the event map must be supported by the
/// store.
pub fn validate_data_access(events: &ResolvedEventMap, store: &dyn SlotStore) -> Diagnostics {
    let mut d = Diagnostics::default();
    for event in events.values() {
        for (bi, binding) in event.bindings.iter().enumerate() {
            let where_ = format!("event[{}].binding[{bi}]", event.name);
            let supported = match binding.data_ref {
                DataRef::System(_) => true,
                DataRef::Str(i) => store.supports_str(i),
                DataRef::Vec(i) => store.supports_vec(i),
                DataRef::Num(i) => store.supports_num(i),
            };
            if !supported {
                d.err(format!(
                    "{where_}: refers to {} but data store does not support it",
                    binding.raw
                ));
            }
        }
    }
    d
}

/// System-stream events are update-only with exactly one `str` form.
pub fn validate_system_events(events: &ResolvedEventMap, si: usize, d: &mut Diagnostics) {
    for event in events.values() {
        if !event_has_system_binding(event) {
            continue;
        }
        let where_ = format!("screen[{si}].event[{}]", event.name);

        if event.kind != EventKind::Update {
            d.err(format!(
                "{where_}: system stream bindings are only allowed on _update events"
            ));
        }
        if event.bindings.len() != 1 {
            d.err(format!(
                "{where_}: system stream event must have exactly one __form binding"
            ));
            continue;
        }
        let binding = &event.bindings[0];
        if binding.bind_kind != BindKind::Str {
            d.err(format!(
                "{where_}: system stream binding must be local_name 'str'"
            ));
        }
        if !matches!(binding.data_ref, DataRef::System(_)) {
            d.err(format!(
                "{where_}: expected system ref (.sys.stdout/.sys.stderr)"
            ));
        }
    }
}

fn for_each_figure<'a>(sc: &'a Screen, mut f: impl FnMut(usize, usize, &'a Figure)) {
    for (pi, panel) in sc.panels.iter().enumerate() {
        for (fi, figure) in panel.figures.iter().enumerate() {
            f(pi, fi, figure);
        }
    }
}

pub fn cross_validate_triggers(
    sc: &Screen,
    si: usize,
    events: &ResolvedEventMap,
    opts: &ValidateOpts,
    d: &mut Diagnostics,
) {
    let mut event_to_figkinds: AHashMap<&str, AHashSet<&str>> = AHashMap::default();

    for_each_figure(sc, |_pi, _fi, figure| {
        if is_unset(&figure.kind_raw) {
            return;
        }
        let Some(kind) = FigureKind::parse(&figure.kind_raw) else {
            return;
        };
        let want_bind = required_bind_kind_for_figure(kind);
        let want_event = required_event_kind_for_figure(kind);

        for trigger in &figure.triggers {
            if is_unset(trigger) {
                continue;
            }
            let Some(event) = events.get(trigger.as_str()) else {
                if opts.require_trigger_event_exists {
                    d.err(format!(
                        "screen[{si}]: FIGURE trigger '{trigger}' has no matching EVENT"
                    ));
                }
                continue;
            };

            event_to_figkinds
                .entry(trigger.as_str())
                .or_default()
                .insert(figure.kind_raw.as_str());

            if opts.enforce_event_kind_by_figure && event.kind != want_event {
                d.err(format!(
                    "screen[{si}]: EVENT '{trigger}' kind mismatch for FIGURE '{}' (needs {}, got {})",
                    figure.kind_raw,
                    want_event.token(),
                    event.kind.token(),
                ));
            }
            if first_binding_of_kind(event, want_bind).is_none() {
                d.err(format!(
                    "screen[{si}]: EVENT '{trigger}' missing required binding type for FIGURE '{}'",
                    figure.kind_raw
                ));
            }
            if event_has_system_binding(event) && kind != FigureKind::Buffer {
                d.err(format!(
                    "screen[{si}]: EVENT '{trigger}' is a system stream source, only _buffer may trigger it"
                ));
            }
        }
    });

    if opts.forbid_mixed_figure_kinds_per_event {
        let mut offenders: Vec<(&str, Vec<&str>)> = event_to_figkinds
            .iter()
            .filter(|(_, kinds)| kinds.len() > 1)
            .map(|(name, kinds)| {
                let mut ks: Vec<&str> = kinds.iter().copied().collect();
                ks.sort_unstable();
                (*name, ks)
            })
            .collect();
        offenders.sort_unstable();
        for (name, kinds) in offenders {
            d.err(format!(
                "screen[{si}]: EVENT '{name}' referenced by multiple FIGURE kinds {{{}}} (ambiguous wiring)",
                kinds.join(",")
            ));
        }
    }
}

/// All triggers of one figure must resolve to the same slot; buffers are
/// exempt because fan-in is their point.
pub fn validate_same_binding_per_figure(
    sc: &Screen,
    si: usize,
    events: &ResolvedEventMap,
    opts: &ValidateOpts,
    d: &mut Diagnostics,
) {
    if !opts.enforce_same_binding_per_figure {
        return;
    }

    for_each_figure(sc, |_pi, _fi, figure| {
        let Some(kind) = FigureKind::parse(&figure.kind_raw) else {
            return;
        };
        if kind == FigureKind::Buffer {
            return;
        }
        let want_bind = required_bind_kind_for_figure(kind);
        let want_event = required_event_kind_for_figure(kind);

        let mut first: Option<&ResolvedBinding> = None;
        for trigger in &figure.triggers {
            let Some(event) = events.get(trigger.as_str()) else {
                continue;
            };
            if opts.enforce_event_kind_by_figure && event.kind != want_event {
                continue;
            }
            let Some(binding) = first_binding_of_kind(event, want_bind) else {
                continue;
            };
            match first {
                None => first = Some(binding),
                Some(prev) if prev.data_ref != binding.data_ref => {
                    d.err(format!(
                        "screen[{si}]: FIGURE triggers bind to different slots (first {}, then {})",
                        prev.raw, binding.raw
                    ));
                }
                Some(_) => {}
            }
        }
    });
}

/// Validate + compile contract for a single screen.
#[derive(Debug, Default)]
pub struct ScreenContract {
    pub diag: Diagnostics,
    pub events: ResolvedEventMap,
}

pub fn validate_and_compile_screen(sc: &Screen, si: usize, opts: &ValidateOpts) -> ScreenContract {
    let mut out = ScreenContract::default();

    validate_screen_fields(sc, si, &mut out.diag);
    for (pi, panel) in sc.panels.iter().enumerate() {
        validate_panel_fields(panel, si, pi, &mut out.diag);
        for (fi, figure) in panel.figures.iter().enumerate() {
            validate_figure_fields(figure, si, pi, fi, &mut out.diag);
        }
    }

    out.events = compile_events(sc, si, opts, &mut out.diag);
    validate_system_events(&out.events, si, &mut out.diag);
    cross_validate_triggers(sc, si, &out.events, opts, &mut out.diag);
    validate_same_binding_per_figure(sc, si, &out.events, opts, &mut out.diag);

    out
}

pub fn validate_instruction(inst: &RenderingsInstruction, opts: &ValidateOpts) -> Diagnostics {
    let mut d = Diagnostics::default();
    if inst.screens.is_empty() {
        d.err("instruction: no screens present");
        return d;
    }
    for (si, sc) in inst.screens.iter().enumerate() {
        let one = validate_and_compile_screen(sc, si, opts);
        d.merge(one.diag);
    }
    d
}
