//! Build a widget tree from one validated screen of a renderings
//! instruction.
//!
//! Panels are placed normalized (DSL percent-of-screen over 100), stably
//! sorted by z-index; figure declaration order fixes both paint order and
//! focus order. Initial figure content is seeded from the bound data
//! slots so the first frame is already correct.

use ahash::AHashMap;
use core_bnf::Diagnostics;
use core_render::render_tree;
use core_screen::{
    BindKind, DataRef, EventKind, Figure, FigureKind, Panel, RenderingsInstruction, ResolvedBinding,
    ResolvedEventMap, Screen, SlotStore, ValidateOpts, first_binding_of_kind, is_unset, join_path,
    pick_color, required_bind_kind_for_figure, required_event_kind_for_figure, sanitize_id,
    validate_and_compile_screen, validate_data_access,
};
use core_widget::{
    BufferBox, BufferDir, EditorBox, LayoutSpec, PlotBox, PlotMode, SeriesCfg, Style, TextAlign,
    TextBox, WidgetNode, WidgetPayload, WidgetRef, add_child, object,
};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct BuildOpts {
    pub plot_legend_overlay: bool,
    /// Build a red error box instead of dropping a broken figure.
    pub render_placeholders_on_error: bool,
    /// Reserved rows at the bottom hosting the status label + terminal
    /// input.
    pub show_menu_bar: bool,
    pub menu_rows: i32,
}

impl Default for BuildOpts {
    fn default() -> Self {
        Self {
            plot_legend_overlay: true,
            render_placeholders_on_error: false,
            show_menu_bar: true,
            menu_rows: 1,
        }
    }
}

/// A built screen plus the runtime dispatch maps.
#[derive(Default)]
pub struct BuiltScreen {
    pub diag: Diagnostics,
    pub root: Option<WidgetRef>,

    pub menu_bar: Option<WidgetRef>,
    pub terminal_input: Option<WidgetRef>,
    pub terminal_input_id: String,

    pub events_by_name: ResolvedEventMap,
    pub triggers_by_figure_id: AHashMap<String, Vec<String>>,
    pub figures_for_event: AHashMap<String, Vec<String>>,
    pub figure_object_by_id: AHashMap<String, WidgetRef>,
    pub figure_kind_by_id: AHashMap<String, FigureKind>,

    /// Interactive figures in declaration order.
    pub focus_order: Vec<String>,
    pub focus_index: Option<usize>,
}

impl BuiltScreen {
    pub fn ok(&self) -> bool {
        self.diag.ok() && self.root.is_some()
    }
}

pub fn parse_plot_mode(type_raw: &str) -> PlotMode {
    match type_raw.to_ascii_lowercase().as_str() {
        "scatter" => PlotMode::Scatter,
        "stairs" => PlotMode::Stairs,
        "stem" => PlotMode::Stem,
        _ => PlotMode::Line,
    }
}

fn mk_panel_id(screen_name: &str, panel_index: usize) -> String {
    format!("{}.panel{panel_index}", sanitize_id(screen_name))
}

fn mk_figure_id(screen_name: &str, panel_index: usize, figure_index: usize, kind: FigureKind) -> String {
    format!(
        "{}.panel{panel_index}.fig{figure_index}.{}",
        sanitize_id(screen_name),
        sanitize_id(kind.token()),
    )
}

pub fn make_error_box(id: &str, msg: &str, layout: LayoutSpec) -> WidgetRef {
    let mut n = WidgetNode::new(id);
    n.layout = layout;
    n.style = Style {
        border: true,
        title: id.to_string(),
        label_color: "white".to_string(),
        background_color: "red".to_string(),
        border_color: "white".to_string(),
        bold: true,
        inverse: false,
    };
    n.payload = WidgetPayload::Text(TextBox::new(msg, true, TextAlign::Left));
    object(n)
}

/// Earliest matching binding across the figure's triggers, honoring the
/// figure's required event kind.
fn find_initial_binding<'a>(
    figure: &Figure,
    kind: FigureKind,
    events: &'a ResolvedEventMap,
    vopt: &ValidateOpts,
) -> Option<&'a ResolvedBinding> {
    let want_bind: BindKind = required_bind_kind_for_figure(kind);
    let want_event: EventKind = required_event_kind_for_figure(kind);
    for trigger in &figure.triggers {
        if is_unset(trigger) {
            continue;
        }
        let Some(event) = events.get(trigger.as_str()) else {
            continue;
        };
        if vopt.enforce_event_kind_by_figure
            && event.kind != want_event
            && kind != FigureKind::TextEditor
        {
            continue;
        }
        if let Some(b) = first_binding_of_kind(event, want_bind) {
            return Some(b);
        }
    }
    None
}

fn initial_str(binding: Option<&ResolvedBinding>, store: &dyn SlotStore, fallback: &str) -> String {
    if let Some(b) = binding
        && let DataRef::Str(i) = b.data_ref
        && let Some(s) = store.get_str(i)
    {
        return s;
    }
    fallback.to_string()
}

#[allow(clippy::too_many_arguments)]
fn build_figure_object(
    sc: &Screen,
    panel: &Panel,
    figure: &Figure,
    kind: FigureKind,
    figure_id: &str,
    events: &ResolvedEventMap,
    store: &dyn SlotStore,
    bopt: &BuildOpts,
    vopt: &ValidateOpts,
) -> WidgetRef {
    let fg = pick_color(&figure.text_color, &panel.text_color, &sc.text_color, "white");
    let bg = pick_color(&figure.back_color, &panel.back_color, &sc.back_color, "<empty>");
    let ln = pick_color(&figure.line_color, &panel.line_color, &sc.line_color, "gray");

    // Figure percent-of-panel -> normalized [0,1].
    let u = 100.0;
    let layout = LayoutSpec::normalized(
        (figure.coords.x / u).clamp(0.0, 1.0),
        (figure.coords.y / u).clamp(0.0, 1.0),
        (figure.shape.x / u).clamp(0.0, 1.0),
        (figure.shape.y / u).clamp(0.0, 1.0),
    );

    let style = Style {
        border: figure.border,
        title: if figure.title_on && !is_unset(&figure.title) {
            figure.title.clone()
        } else {
            String::new()
        },
        label_color: fg,
        background_color: bg,
        border_color: ln.clone(),
        bold: false,
        inverse: false,
    };

    let binding = find_initial_binding(figure, kind, events, vopt);

    let payload = match kind {
        FigureKind::Label => {
            let content = initial_str(binding, store, &figure.value);
            let wrap = figure.type_raw.to_ascii_lowercase() != "nowrap";
            WidgetPayload::Text(TextBox::new(content, wrap, TextAlign::Left))
        }
        FigureKind::InputBox => {
            let content = initial_str(binding, store, &figure.value);
            WidgetPayload::Text(TextBox::new(content, false, TextAlign::Left))
        }
        FigureKind::Buffer => {
            const DEFAULT_CAP: usize = 1000;
            let cap = if figure.capacity > 0 {
                figure.capacity as usize
            } else {
                DEFAULT_CAP
            };
            let dir = if figure.type_raw.eq_ignore_ascii_case("downup") {
                BufferDir::DownUp
            } else {
                BufferDir::UpDown
            };
            WidgetPayload::Buffer(BufferBox::new(cap, dir))
        }
        FigureKind::TextEditor => {
            let path = initial_str(binding, store, &figure.value);
            let mut ed = EditorBox::new(path.clone());
            let t = figure.type_raw.to_ascii_lowercase();
            if t == "readonly" || t == "ro" {
                ed.read_only = true;
            }
            if !path.is_empty() && !is_unset(&path) {
                match std::fs::read_to_string(&path) {
                    Ok(text) => ed.load_text(&text),
                    Err(_) => {
                        ed.status = "open failed".to_string();
                        ed.dirty = false;
                    }
                }
            }
            WidgetPayload::Editor(ed)
        }
        FigureKind::HorizontalPlot => {
            let mut pb = PlotBox::default();
            let mut pts = Vec::new();
            if let Some(b) = binding
                && let DataRef::Vec(i) = b.data_ref
                && let Some(v) = store.get_vec(i)
            {
                pts = v;
            }
            pb.series.push(pts);
            pb.series_cfg.push(SeriesCfg {
                color_fg: ln,
                mode: parse_plot_mode(&figure.type_raw),
                ..SeriesCfg::default()
            });
            pb.opts.draw_grid = true;
            pb.opts.draw_axes = true;
            WidgetPayload::Plot(pb)
        }
    };

    let mut node = WidgetNode::new(figure_id);
    node.layout = layout;
    node.style = style;
    node.payload = payload;
    node.focusable = kind.is_focusable();
    let obj = object(node);

    if bopt.plot_legend_overlay
        && kind == FigureKind::HorizontalPlot
        && figure.legend_on
        && !is_unset(&figure.legend)
    {
        let mut legend = WidgetNode::new(join_path(figure_id, "legend"));
        legend.layout = LayoutSpec::absolute(
            1.0,
            0.0,
            (figure.legend.chars().count() + 2).clamp(1, 50) as f64,
            1.0,
        );
        legend.style = obj.borrow().style.clone();
        legend.style.border = false;
        legend.style.title.clear();
        legend.payload = WidgetPayload::Text(TextBox::new(&figure.legend, false, TextAlign::Left));
        add_child(&obj, object(legend));
    }

    obj
}

/// Materialize a footer template's panels and figures inside the bottom
/// container. The first footer label becomes the status target and the
/// first footer input becomes the terminal input; footer figures join
/// `figures_for_event` only when their triggers name events of the main
/// screen's event map.
#[allow(clippy::too_many_arguments)]
fn build_footer_section(
    footer_sc: &Screen,
    footer_base: &str,
    bottom: &WidgetRef,
    base_style: &Style,
    store: &dyn SlotStore,
    bopt: &BuildOpts,
    vopt: &ValidateOpts,
    out: &mut BuiltScreen,
) {
    let mut panels: Vec<(i32, usize, &Panel)> = footer_sc
        .panels
        .iter()
        .enumerate()
        .map(|(i, p)| (p.z_index, i, p))
        .collect();
    panels.sort_by_key(|&(z, i, _)| (z, i));

    for (pi, &(z, _, panel)) in panels.iter().enumerate() {
        let panel_id = mk_panel_id(footer_base, pi);
        let u = 100.0;
        let mut pnode = WidgetNode::new(panel_id);
        pnode.layout = LayoutSpec::normalized(
            (panel.coords.x / u).clamp(0.0, 1.0),
            (panel.coords.y / u).clamp(0.0, 1.0),
            (panel.shape.x / u).clamp(0.0, 1.0),
            (panel.shape.y / u).clamp(0.0, 1.0),
        );
        pnode.style = Style {
            border: panel.border,
            title: if panel.title_on && !is_unset(&panel.title) {
                panel.title.clone()
            } else {
                String::new()
            },
            label_color: pick_color(
                "<empty>",
                &panel.text_color,
                &footer_sc.text_color,
                &base_style.label_color,
            ),
            background_color: pick_color(
                "<empty>",
                &panel.back_color,
                &footer_sc.back_color,
                &base_style.background_color,
            ),
            border_color: pick_color(
                "<empty>",
                &panel.line_color,
                &footer_sc.line_color,
                &base_style.border_color,
            ),
            bold: false,
            inverse: false,
        };
        pnode.z_index = z;
        let pobj = object(pnode);

        for (fi, figure) in panel.figures.iter().enumerate() {
            let Some(kind) = FigureKind::parse(&figure.kind_raw) else {
                continue;
            };
            let figure_id = mk_figure_id(footer_base, pi, fi, kind);

            out.triggers_by_figure_id
                .insert(figure_id.clone(), figure.triggers.clone());
            out.figure_kind_by_id.insert(figure_id.clone(), kind);
            for trigger in &figure.triggers {
                if !is_unset(trigger) && out.events_by_name.contains_key(trigger.as_str()) {
                    out.figures_for_event
                        .entry(trigger.clone())
                        .or_default()
                        .push(figure_id.clone());
                }
            }

            let fobj = build_figure_object(
                footer_sc,
                panel,
                figure,
                kind,
                &figure_id,
                &out.events_by_name,
                store,
                bopt,
                vopt,
            );
            out.figure_object_by_id.insert(figure_id.clone(), fobj.clone());
            if fobj.borrow().focusable {
                out.focus_order.push(figure_id.clone());
            }

            if out.menu_bar.is_none() && kind == FigureKind::Label {
                out.menu_bar = Some(fobj.clone());
            }
            if out.terminal_input.is_none() && kind == FigureKind::InputBox {
                out.terminal_input = Some(fobj.clone());
                out.terminal_input_id = figure_id.clone();
            }

            add_child(&pobj, fobj);
        }

        add_child(bottom, pobj);
    }
}

/// Validate, compile, and materialize one screen into a widget tree.
///
/// `footer` is an optional screen template whose panels and figures fill
/// the reserved bottom rows instead of the status/input fallback bar.
#[allow(clippy::too_many_arguments)]
pub fn build_screen(
    inst: &RenderingsInstruction,
    screen_index: usize,
    store: &dyn SlotStore,
    term_cols: i32,
    term_rows: i32,
    bopt: &BuildOpts,
    vopt: &ValidateOpts,
    footer: Option<&Screen>,
) -> BuiltScreen {
    let mut out = BuiltScreen::default();

    let Some(sc) = inst.screens.get(screen_index) else {
        out.diag.err("build_screen: screen_index out of range");
        return out;
    };

    let contract = validate_and_compile_screen(sc, screen_index, vopt);
    out.diag.merge(contract.diag);
    out.events_by_name = contract.events;
    out.diag.merge(validate_data_access(&out.events_by_name, store));
    if !out.diag.ok() {
        return out;
    }

    let full_w = term_cols.max(0);
    let full_h = term_rows.max(0);
    let menu_rows = if bopt.show_menu_bar {
        bopt.menu_rows.clamp(0, full_h)
    } else {
        0
    };
    let content_h = (full_h - menu_rows).max(0);

    let root_id = sanitize_id(&sc.name);

    // Borderless outer root so the menu bar owns the last rows cleanly.
    let mut root_node = WidgetNode::new(root_id.clone());
    root_node.layout = LayoutSpec::absolute(0.0, 0.0, full_w as f64, full_h as f64);
    root_node.style.label_color = pick_color("<empty>", "<empty>", &sc.text_color, "white");
    root_node.style.background_color = pick_color("<empty>", "<empty>", &sc.back_color, "<empty>");
    root_node.style.border_color = pick_color("<empty>", "<empty>", &sc.line_color, "gray");
    let root = object(root_node);

    // Content container: DSL 0..100 coordinates map onto this.
    let mut content_node = WidgetNode::new(join_path(&root_id, "content"));
    content_node.layout = LayoutSpec::absolute(0.0, 0.0, full_w as f64, content_h as f64);
    content_node.style.border = sc.border;
    content_node.style.title = if is_unset(&sc.name) {
        "screen".to_string()
    } else {
        sc.name.clone()
    };
    content_node.style.label_color = root.borrow().style.label_color.clone();
    content_node.style.background_color = root.borrow().style.background_color.clone();
    content_node.style.border_color = root.borrow().style.border_color.clone();
    let content = object(content_node);
    add_child(&root, content.clone());

    // Stable z-order sort; declaration order breaks ties.
    let mut panels: Vec<(i32, usize, &Panel)> = sc
        .panels
        .iter()
        .enumerate()
        .map(|(i, p)| (p.z_index, i, p))
        .collect();
    panels.sort_by_key(|&(z, i, _)| (z, i));

    for (pi, &(z, _, panel)) in panels.iter().enumerate() {
        let panel_id = mk_panel_id(&sc.name, pi);
        let u = 100.0;
        let mut pnode = WidgetNode::new(panel_id);
        pnode.layout = LayoutSpec::normalized(
            (panel.coords.x / u).clamp(0.0, 1.0),
            (panel.coords.y / u).clamp(0.0, 1.0),
            (panel.shape.x / u).clamp(0.0, 1.0),
            (panel.shape.y / u).clamp(0.0, 1.0),
        );
        pnode.style = Style {
            border: panel.border,
            title: if panel.title_on && !is_unset(&panel.title) {
                panel.title.clone()
            } else {
                String::new()
            },
            label_color: pick_color("<empty>", &panel.text_color, &sc.text_color, "white"),
            background_color: pick_color("<empty>", &panel.back_color, &sc.back_color, "<empty>"),
            border_color: pick_color("<empty>", &panel.line_color, &sc.line_color, "gray"),
            bold: false,
            inverse: false,
        };
        pnode.z_index = z;
        let pobj = object(pnode);

        for (fi, figure) in panel.figures.iter().enumerate() {
            let Some(kind) = FigureKind::parse(&figure.kind_raw) else {
                // Validation rejects unknown kinds; this only triggers when
                // the caller builds despite errors.
                if bopt.render_placeholders_on_error {
                    let id = format!("{}.fig{fi}", pobj.borrow().id);
                    add_child(
                        &pobj,
                        make_error_box(
                            &id,
                            "figure build failed",
                            LayoutSpec::absolute(0.0, 0.0, 30.0, 3.0),
                        ),
                    );
                }
                continue;
            };
            let figure_id = mk_figure_id(&sc.name, pi, fi, kind);

            out.triggers_by_figure_id
                .insert(figure_id.clone(), figure.triggers.clone());
            out.figure_kind_by_id.insert(figure_id.clone(), kind);
            for trigger in &figure.triggers {
                if !is_unset(trigger) {
                    out.figures_for_event
                        .entry(trigger.clone())
                        .or_default()
                        .push(figure_id.clone());
                }
            }

            let fobj = build_figure_object(
                sc, panel, figure, kind, &figure_id, &out.events_by_name, store, bopt, vopt,
            );
            out.figure_object_by_id.insert(figure_id.clone(), fobj.clone());
            if fobj.borrow().focusable {
                out.focus_order.push(figure_id.clone());
            }
            add_child(&pobj, fobj);
        }

        add_child(&content, pobj);
    }

    // Bottom section: a DSL footer template when one is supplied, the
    // status label + terminal input fallback otherwise. Base colors prefer
    // the footer screen's, then the active screen's.
    if menu_rows > 0 && full_w > 0 && bopt.show_menu_bar {
        let footer_colors = footer.map(|f| {
            (
                f.text_color.as_str(),
                f.back_color.as_str(),
                f.line_color.as_str(),
            )
        });
        let (ffg, fbg, fln) = footer_colors.unwrap_or(("<empty>", "<empty>", "<empty>"));
        let base_style = Style {
            border: false,
            title: String::new(),
            label_color: pick_color("<empty>", ffg, &sc.text_color, "white"),
            background_color: pick_color("<empty>", fbg, &sc.back_color, "<empty>"),
            border_color: pick_color("<empty>", fln, &sc.line_color, "gray"),
            bold: false,
            inverse: false,
        };

        let mut bottom_node = WidgetNode::new(join_path(&root_id, "bottom"));
        bottom_node.layout =
            LayoutSpec::absolute(0.0, content_h as f64, full_w as f64, menu_rows as f64);
        bottom_node.style = base_style.clone();
        let bottom = object(bottom_node);
        add_child(&root, bottom.clone());

        match footer.filter(|f| !f.panels.is_empty()) {
            Some(footer_sc) => {
                // Footer ids hang under the screen root so they stay
                // unique per built screen.
                let footer_base = join_path(&root_id, "bottom");
                build_footer_section(
                    footer_sc,
                    &footer_base,
                    &bottom,
                    &base_style,
                    store,
                    bopt,
                    vopt,
                    &mut out,
                );
            }
            None => {
                let split = ((f64::from(full_w) * 0.65).round() as i32).clamp(0, full_w);

                let mut status_text = "F+N: switch screens".to_string();
                if status_text.len() as i32 > full_w {
                    status_text.truncate(full_w.max(0) as usize);
                }
                let mut status_node = WidgetNode::new(join_path(&root_id, "bottom.status"));
                status_node.layout =
                    LayoutSpec::absolute(0.0, 0.0, split.max(0) as f64, menu_rows as f64);
                status_node.style = base_style.clone();
                status_node.payload =
                    WidgetPayload::Text(TextBox::new(status_text, false, TextAlign::Left));
                let status = object(status_node);
                out.menu_bar = Some(status.clone());
                add_child(&bottom, status);

                let mut input_style = base_style;
                input_style.background_color = "#202020".to_string();
                input_style.label_color = "white".to_string();
                let input_id = join_path(&root_id, "bottom.input");
                let mut input_node = WidgetNode::new(input_id.clone());
                input_node.layout = LayoutSpec::absolute(
                    split as f64,
                    0.0,
                    (full_w - split).max(1) as f64,
                    menu_rows as f64,
                );
                input_node.style = input_style;
                input_node.payload = WidgetPayload::Text(TextBox::new("", false, TextAlign::Left));
                input_node.focusable = true;
                let input = object(input_node);

                out.terminal_input = Some(input.clone());
                out.terminal_input_id = input_id.clone();
                out.figure_object_by_id.insert(input_id.clone(), input.clone());
                out.figure_kind_by_id.insert(input_id.clone(), FigureKind::InputBox);
                out.triggers_by_figure_id.insert(input_id.clone(), Vec::new());
                out.focus_order.push(input_id);
                add_child(&bottom, input);
            }
        }
    }

    // Default focus prefers the terminal input.
    if !out.focus_order.is_empty() {
        let want = out
            .focus_order
            .iter()
            .position(|id| !out.terminal_input_id.is_empty() && *id == out.terminal_input_id)
            .unwrap_or(0);
        out.focus_index = Some(want);
        if let Some(obj) = out.figure_object_by_id.get(&out.focus_order[want]) {
            obj.borrow_mut().focused = true;
        }
    }

    debug!(
        target: "session.build",
        screen = %sc.name,
        figures = out.figure_object_by_id.len(),
        focusable = out.focus_order.len(),
        "screen built"
    );
    out.root = Some(root);
    out
}

/// Layout + draw a built root onto the backend.
pub fn render_root(ctx: &mut core_render::RenderCtx<'_>, root: &WidgetRef) {
    let (rows, cols) = ctx.r.size();
    core_widget::layout_tree(root, core_widget::Rect::new(0, 0, cols, rows));
    render_tree(ctx, root);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core_screen::{FixedSlotStore, RenderingsDecoder};

    pub(crate) const SCREEN: &str = r#"
        _screen (
          __name = main
          __key  = F+1
          _rectangle (
            __coords = 0,0 __shape = 100,60 __z = 1
            _buffer (
              __coords = 0,0 __shape = 100,100 __capacity = 100
              __trigger = log_update
            )
          )
          _rectangle (
            __coords = 0,60 __shape = 100,40 __z = 2
            _input_box ( __coords = 0,0 __shape = 50,100 __value = "hi" __trigger = submit )
            _horizontal_plot ( __coords = 50,0 __shape = 50,100 __type = line __trigger = data_update )
          )
          _update ( __name = log_update __label = sys __form = str = .sys.stdout )
          _action ( __name = submit __form = str = .str1 )
          _update ( __name = data_update __form = vec = .vec0 )
        )
    "#;

    pub(crate) fn built_screen(store: &FixedSlotStore) -> BuiltScreen {
        let inst = RenderingsDecoder::new().unwrap().decode(SCREEN).unwrap();
        build_screen(
            &inst,
            0,
            store,
            80,
            24,
            &BuildOpts::default(),
            &ValidateOpts::default(),
            None,
        )
    }

    #[test]
    fn builds_widget_tree_with_maps() {
        let mut store = FixedSlotStore::new();
        store.set_vec(0, vec![(0.0, 0.0), (1.0, 1.0)]);
        let built = built_screen(&store);
        assert!(built.ok(), "{:?}", built.diag.errors);
        // buffer + input + plot + terminal input
        assert_eq!(built.figure_object_by_id.len(), 4);
        assert_eq!(built.figures_for_event["log_update"].len(), 1);
        assert_eq!(built.figures_for_event["data_update"].len(), 1);
    }

    #[test]
    fn focus_order_is_declaration_order_and_prefers_terminal() {
        let store = FixedSlotStore::new();
        let built = built_screen(&store);
        // input_box, plot, then the synthetic terminal input.
        assert_eq!(built.focus_order.len(), 3);
        assert!(built.focus_order[0].contains("_input_box"));
        assert!(built.focus_order[1].contains("_horizontal_plot"));
        assert_eq!(built.focus_order[2], built.terminal_input_id);
        assert_eq!(built.focus_index, Some(2));

        let focused = built
            .figure_object_by_id
            .get(&built.terminal_input_id)
            .unwrap();
        assert!(focused.borrow().focused);
    }

    #[test]
    fn rebuilding_reproduces_focus_order() {
        let store = FixedSlotStore::new();
        let a = built_screen(&store);
        let b = built_screen(&store);
        assert_eq!(a.focus_order, b.focus_order);
        assert_eq!(a.focus_index, b.focus_index);
    }

    #[test]
    fn input_seeds_from_bound_slot() {
        let mut store = FixedSlotStore::new();
        store.set_str(1, "seeded".to_string());
        let built = built_screen(&store);
        let id = &built.focus_order[0];
        let obj = built.figure_object_by_id.get(id).unwrap();
        let node = obj.borrow();
        let WidgetPayload::Text(tb) = &node.payload else {
            panic!("input payload");
        };
        assert_eq!(tb.content, "seeded");
    }

    #[test]
    fn invalid_screen_returns_diagnostics_without_tree() {
        let inst = RenderingsDecoder::new()
            .unwrap()
            .decode("_screen ( __name = broken _update ( __name = e __form = vec = .str0 ) )")
            .unwrap();
        let store = FixedSlotStore::new();
        let built = build_screen(
            &inst,
            0,
            &store,
            80,
            24,
            &BuildOpts::default(),
            &ValidateOpts::default(),
            None,
        );
        assert!(!built.ok());
        assert!(built.root.is_none());
    }

    const FOOTER: &str = r#"
        _screen (
          __name = footer
          __text_color = #FFD26E
          _rectangle (
            __coords = 0,0 __shape = 100,100 __z = 1
            _label ( __coords = 0,0 __shape = 60,100 __value = "ready" )
            _input_box ( __coords = 60,0 __shape = 40,100 __value = "cmd" )
          )
        )
    "#;

    #[test]
    fn dsl_footer_replaces_fallback_bar() {
        let text = format!("{SCREEN}\n{FOOTER}");
        let inst = RenderingsDecoder::new().unwrap().decode(&text).unwrap();
        let store = FixedSlotStore::new();
        let built = build_screen(
            &inst,
            0,
            &store,
            80,
            24,
            &BuildOpts::default(),
            &ValidateOpts::default(),
            Some(&inst.screens[1]),
        );
        assert!(built.ok(), "{:?}", built.diag.errors);

        // The footer label is the status target and the footer input is
        // the terminal input; no synthetic fallback bar exists.
        let menu = built.menu_bar.as_ref().expect("footer label");
        {
            let node = menu.borrow();
            let WidgetPayload::Text(tb) = &node.payload else {
                panic!("label payload");
            };
            assert_eq!(tb.content, "ready");
        }
        assert!(built.terminal_input_id.contains("bottom"));
        assert!(built.terminal_input_id.contains("_input_box"));
        assert!(!built.figure_object_by_id.contains_key("main.bottom.input"));

        // Footer colors win over the active screen's for the bottom strip.
        let input = built.terminal_input.as_ref().unwrap();
        assert_eq!(input.borrow().style.label_color, "#FFD26E");

        // Focus still prefers the terminal input.
        let idx = built.focus_index.expect("focus");
        assert_eq!(built.focus_order[idx], built.terminal_input_id);
    }

    #[test]
    fn empty_footer_template_falls_back_to_status_bar() {
        let text = format!("{SCREEN}\n_screen ( __name = footer )");
        let inst = RenderingsDecoder::new().unwrap().decode(&text).unwrap();
        let store = FixedSlotStore::new();
        let built = build_screen(
            &inst,
            0,
            &store,
            80,
            24,
            &BuildOpts::default(),
            &ValidateOpts::default(),
            Some(&inst.screens[1]),
        );
        assert!(built.ok());
        assert!(built.terminal_input_id.ends_with("bottom.input"));
    }
}
