//! Event dispatch: `_action` writes payloads into slots, then every figure
//! whose triggers list the event refreshes its data payload.

use core_bnf::Diagnostics;
use core_screen::{
    BindKind, DataRef, EventKind, FigureKind, Point, ResolvedBinding, SlotStore,
    first_binding_of_kind, required_bind_kind_for_figure,
};
use core_widget::WidgetPayload;
use tracing::trace;

use crate::build::BuiltScreen;

/// Payload accompanying a dispatch; `_action` requires one, system-stream
/// dispatches carry the captured line.
#[derive(Debug, Clone, Default)]
pub struct DispatchPayload {
    pub text: Option<String>,
    pub vec: Option<Vec<Point>>,
    pub num: Option<f64>,
}

impl DispatchPayload {
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            text: Some(s.into()),
            ..Self::default()
        }
    }
}

fn binding_get_str(
    binding: &ResolvedBinding,
    store: &dyn SlotStore,
    payload: Option<&DispatchPayload>,
    diag: &mut Diagnostics,
    where_: &str,
) -> Option<String> {
    match binding.data_ref {
        DataRef::Str(i) => match store.get_str(i) {
            Some(s) => Some(s),
            None => {
                diag.warn(format!("{where_}: str{i} read returned nothing"));
                None
            }
        },
        DataRef::System(_) => match payload.and_then(|p| p.text.clone()) {
            Some(s) => Some(s),
            None => {
                diag.err(format!("{where_}: system stream binding requires a text payload"));
                None
            }
        },
        _ => {
            diag.err(format!("{where_}: string read on non-str binding"));
            None
        }
    }
}

/// Dispatch one named event into a built screen. Figures update in
/// declaration order; diagnostics accumulate instead of aborting.
pub fn dispatch_event(
    built: &mut BuiltScreen,
    event_name: &str,
    store: &mut dyn SlotStore,
    payload: Option<&DispatchPayload>,
) -> Diagnostics {
    let mut diag = Diagnostics::default();

    if built.root.is_none() {
        diag.err("dispatch_event: screen has no built root");
        return diag;
    }
    let Some(event) = built.events_by_name.get(event_name).cloned() else {
        diag.err(format!("dispatch_event: event not found: '{event_name}'"));
        return diag;
    };

    // _action: write the payload into every bound slot.
    if event.kind == EventKind::Action {
        let Some(payload) = payload else {
            diag.err(format!("dispatch_event: _action '{event_name}' requires a payload"));
            return diag;
        };
        for binding in &event.bindings {
            match binding.bind_kind {
                BindKind::Str => match (&payload.text, binding.data_ref) {
                    (Some(s), DataRef::Str(i)) => {
                        if !store.set_str(i, s.clone()) {
                            diag.err(format!("dispatch_event: failed set_str({i})"));
                        }
                    }
                    (None, _) => diag.err(format!(
                        "dispatch_event: missing text payload for _action '{event_name}'"
                    )),
                    _ => {}
                },
                BindKind::Vec => match (&payload.vec, binding.data_ref) {
                    (Some(v), DataRef::Vec(i)) => {
                        if !store.set_vec(i, v.clone()) {
                            diag.err(format!("dispatch_event: failed set_vec({i})"));
                        }
                    }
                    (None, _) => diag.err(format!(
                        "dispatch_event: missing vec payload for _action '{event_name}'"
                    )),
                    _ => {}
                },
                BindKind::Num => match (payload.num, binding.data_ref) {
                    (Some(v), DataRef::Num(i)) => {
                        if !store.set_num(i, v) {
                            diag.err(format!("dispatch_event: failed set_num({i})"));
                        }
                    }
                    (None, _) => diag.err(format!(
                        "dispatch_event: missing num payload for _action '{event_name}'"
                    )),
                    _ => {}
                },
            }
        }
    }

    let Some(figure_ids) = built.figures_for_event.get(event_name) else {
        diag.warn(format!(
            "dispatch_event: event '{event_name}' is not referenced by any figure triggers"
        ));
        return diag;
    };

    for figure_id in figure_ids.clone() {
        let (Some(obj), Some(&kind)) = (
            built.figure_object_by_id.get(&figure_id),
            built.figure_kind_by_id.get(&figure_id),
        ) else {
            continue;
        };
        let want = required_bind_kind_for_figure(kind);
        let Some(binding) = first_binding_of_kind(&event, want) else {
            continue;
        };
        let where_ = format!("dispatch_event({event_name},{figure_id})");

        match kind {
            FigureKind::Label | FigureKind::InputBox => {
                if let Some(s) = binding_get_str(binding, store, payload, &mut diag, &where_)
                    && let WidgetPayload::Text(tb) = &mut obj.borrow_mut().payload
                {
                    tb.content = s;
                }
            }
            FigureKind::Buffer => {
                if let Some(s) = binding_get_str(binding, store, payload, &mut diag, &where_)
                    && let WidgetPayload::Buffer(bb) = &mut obj.borrow_mut().payload
                {
                    bb.push_line(
                        s,
                        event.label.clone().unwrap_or_default(),
                        event.color.clone().unwrap_or_default(),
                    );
                }
            }
            FigureKind::TextEditor => {
                if let Some(path) = binding_get_str(binding, store, payload, &mut diag, &where_)
                    && let WidgetPayload::Editor(ed) = &mut obj.borrow_mut().payload
                    && ed.path != path
                {
                    ed.path = path.clone();
                    match std::fs::read_to_string(&path) {
                        Ok(text) => ed.load_text(&text),
                        Err(_) => ed.status = "open failed".to_string(),
                    }
                }
            }
            FigureKind::HorizontalPlot => {
                let DataRef::Vec(i) = binding.data_ref else {
                    continue;
                };
                if let Some(points) = store.get_vec(i)
                    && let WidgetPayload::Plot(pb) = &mut obj.borrow_mut().payload
                {
                    if pb.series.is_empty() {
                        pb.series.push(Vec::new());
                    }
                    pb.series[0] = points;
                }
            }
        }
        trace!(target: "session.dispatch", event = event_name, figure = %figure_id, "figure updated");
    }

    diag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::tests::built_screen;
    use core_screen::FixedSlotStore;

    #[test]
    fn action_writes_slot_and_updates_figures() {
        let mut store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        let d = dispatch_event(
            &mut built,
            "submit",
            &mut store,
            Some(&DispatchPayload::text("typed")),
        );
        assert!(d.ok(), "{:?}", d.errors);
        assert_eq!(store.get_str(1), Some("typed".to_string()));

        // The input figure (trigger: submit) refreshed from the slot.
        let id = built.figures_for_event["submit"][0].clone();
        let obj = built.figure_object_by_id[&id].clone();
        let node = obj.borrow();
        let WidgetPayload::Text(tb) = &node.payload else {
            panic!("text payload")
        };
        assert_eq!(tb.content, "typed");
    }

    #[test]
    fn action_without_payload_is_an_error() {
        let mut store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        let d = dispatch_event(&mut built, "submit", &mut store, None);
        assert!(d.errors.iter().any(|e| e.contains("requires a payload")));
    }

    #[test]
    fn update_pushes_buffer_line_with_event_metadata() {
        let mut store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        let d = dispatch_event(
            &mut built,
            "log_update",
            &mut store,
            Some(&DispatchPayload::text("hello")),
        );
        assert!(d.ok(), "{:?}", d.errors);

        let id = built.figures_for_event["log_update"][0].clone();
        let obj = built.figure_object_by_id[&id].clone();
        let node = obj.borrow();
        let WidgetPayload::Buffer(bb) = &node.payload else {
            panic!("buffer payload")
        };
        assert_eq!(bb.lines.len(), 1);
        assert_eq!(bb.lines[0].text, "hello");
        assert_eq!(bb.lines[0].label, "sys");
    }

    #[test]
    fn plot_update_replaces_series_zero() {
        let mut store = FixedSlotStore::new();
        store.set_vec(0, vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
        let mut built = built_screen(&store);
        let d = dispatch_event(&mut built, "data_update", &mut store, None);
        assert!(d.ok(), "{:?}", d.errors);

        let id = built.figures_for_event["data_update"][0].clone();
        let obj = built.figure_object_by_id[&id].clone();
        let node = obj.borrow();
        let WidgetPayload::Plot(pb) = &node.payload else {
            panic!("plot payload")
        };
        assert_eq!(pb.series[0].len(), 3);
    }

    #[test]
    fn unknown_event_is_an_error() {
        let mut store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        let d = dispatch_event(&mut built, "nope", &mut store, None);
        assert!(!d.ok());
    }
}
