use crate::slot::{PlayerId, Slot, SlotView};

/// Per-cell views of `grid` for `viewer`, in row-major order.
pub fn views(grid: &[Option<Slot>], viewer: &PlayerId) -> Vec<SlotView> {
    grid.iter()
        .map(|cell| match cell {
            Some(slot) => slot.view_for(viewer),
            None => SlotView::None,
        })
        .collect()
}

/// Renders `grid` as seen by `viewer`: one line per cell, each terminated by a
/// newline.
pub fn render(grid: &[Option<Slot>], viewer: &PlayerId) -> String {
    let mut out = String::with_capacity(grid.len() * 8);
    for view in views(grid, viewer) {
        out.push_str(&view.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Label;

    fn slot(label: &str) -> Slot {
        Slot::new(Label::parse(label).expect("label"))
    }

    #[test]
    fn renders_every_kind_of_cell() {
        let alice = PlayerId::from("alice");
        let bob = PlayerId::from("bob");

        let mut mine = slot("A");
        mine.turn_up();
        mine.take(&alice);
        let mut loose = slot("B");
        loose.turn_up();
        let grid = vec![None, Some(slot("C")), Some(mine), Some(loose)];

        assert_eq!(render(&grid, &alice), "none\ndown\nmy A\nup B\n");
        assert_eq!(render(&grid, &bob), "none\ndown\nup A\nup B\n");
    }

    #[test]
    fn empty_grid_renders_nothing() {
        assert_eq!(render(&[], &PlayerId::from("alice")), "");
    }
}
