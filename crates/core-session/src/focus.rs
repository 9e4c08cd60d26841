//! Focus ring over the built screen's interactive figures.

use core_screen::FigureKind;
use core_widget::WidgetRef;

use crate::build::BuiltScreen;

/// Currently focused figure, if any.
pub fn focused_figure(built: &BuiltScreen) -> Option<(String, WidgetRef, FigureKind)> {
    let idx = built.focus_index?;
    let id = built.focus_order.get(idx)?.clone();
    let obj = built.figure_object_by_id.get(&id)?.clone();
    let kind = *built.figure_kind_by_id.get(&id)?;
    Some((id, obj, kind))
}

/// Move focus to `index` in the stable focus order, updating widget flags.
pub fn set_focus(built: &mut BuiltScreen, index: usize) {
    if built.focus_order.is_empty() {
        built.focus_index = None;
        return;
    }
    let index = index % built.focus_order.len();
    if let Some(prev) = built.focus_index
        && let Some(id) = built.focus_order.get(prev)
        && let Some(obj) = built.figure_object_by_id.get(id)
    {
        obj.borrow_mut().focused = false;
    }
    built.focus_index = Some(index);
    if let Some(obj) = built.figure_object_by_id.get(&built.focus_order[index]) {
        obj.borrow_mut().focused = true;
    }
}

pub fn focus_next(built: &mut BuiltScreen) {
    if built.focus_order.is_empty() {
        return;
    }
    let next = match built.focus_index {
        Some(i) => (i + 1) % built.focus_order.len(),
        None => 0,
    };
    set_focus(built, next);
}

pub fn focus_prev(built: &mut BuiltScreen) {
    if built.focus_order.is_empty() {
        return;
    }
    let len = built.focus_order.len();
    let prev = match built.focus_index {
        Some(i) => (i + len - 1) % len,
        None => len - 1,
    };
    set_focus(built, prev);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::tests::built_screen;
    use core_screen::FixedSlotStore;

    #[test]
    fn tab_cycles_in_stable_order() {
        let store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        // Starts on the terminal input (index 2 of 3).
        assert_eq!(built.focus_index, Some(2));
        focus_next(&mut built);
        assert_eq!(built.focus_index, Some(0));
        focus_next(&mut built);
        assert_eq!(built.focus_index, Some(1));
        focus_prev(&mut built);
        assert_eq!(built.focus_index, Some(0));

        // Exactly one widget carries the focused flag.
        let focused: Vec<_> = built
            .figure_object_by_id
            .values()
            .filter(|o| o.borrow().focused)
            .collect();
        assert_eq!(focused.len(), 1);
    }

    #[test]
    fn focused_figure_reports_kind() {
        let store = FixedSlotStore::new();
        let mut built = built_screen(&store);
        set_focus(&mut built, 1);
        let (_, _, kind) = focused_figure(&built).expect("focused");
        assert_eq!(kind, core_screen::FigureKind::HorizontalPlot);
    }
}
