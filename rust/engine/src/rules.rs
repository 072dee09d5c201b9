use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::errors::BoardError;
use crate::slot::{Label, PlayerId, Position, Slot};
use crate::snapshot;

/// Result of a completed turn, applied when the same player next starts a turn.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Matched { first: Position, second: Position },
    Mismatched { first: Position, second: Position },
}

impl Outcome {
    pub fn positions(&self) -> [Position; 2] {
        match *self {
            Outcome::Matched { first, second } | Outcome::Mismatched { first, second } => {
                [first, second]
            }
        }
    }
}

/// What a first-flip attempt found at the target position.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Attempt {
    /// The player now controls the card.
    Acquired,
    /// Another player holds the card; the caller has to wait and retry.
    Contested,
}

/// The rule engine: grid plus per-player turn state.
///
/// Every method runs to completion without blocking. Callers needing mutual
/// exclusion and waiting wrap this in [`crate::board::Board`].
#[derive(Debug, Clone)]
pub struct BoardState {
    rows: usize,
    cols: usize,
    /// Row-major, `rows * cols` cells. `None` once a matched pair is removed.
    grid: Vec<Option<Slot>>,
    /// Card each player turned as the first half of an unfinished turn.
    /// Always agrees with the controller fields of the grid.
    first_selection: HashMap<PlayerId, Position>,
    pending: HashMap<PlayerId, Outcome>,
    /// Bumped on every change to a card.
    generation: u64,
}

impl BoardState {
    pub fn new(rows: usize, cols: usize, labels: Vec<Label>) -> Result<Self, BoardError> {
        if rows == 0 || cols == 0 {
            return Err(BoardError::Format(format!(
                "expected positive dimensions, found {rows}x{cols}"
            )));
        }
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            BoardError::Format(format!("a {rows}x{cols} board is too large"))
        })?;
        if labels.len() != expected {
            return Err(BoardError::Format(format!(
                "expected {expected} labels for a {rows}x{cols} board, found {}",
                labels.len()
            )));
        }
        let grid = labels.into_iter().map(|label| Some(Slot::new(label))).collect();
        Ok(Self {
            rows,
            cols,
            grid,
            first_selection: HashMap::new(),
            pending: HashMap::new(),
            generation: 0,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn slot(&self, pos: Position) -> Option<&Slot> {
        self.index(pos).and_then(|i| self.grid[i].as_ref())
    }

    pub fn first_selection(&self, player: &PlayerId) -> Option<Position> {
        self.first_selection.get(player).copied()
    }

    pub fn pending(&self, player: &PlayerId) -> Option<Outcome> {
        self.pending.get(player).copied()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn render(&self, viewer: &PlayerId) -> String {
        snapshot::render(&self.grid, viewer)
    }

    fn index(&self, pos: Position) -> Option<usize> {
        (pos.row < self.rows && pos.col < self.cols).then(|| pos.row * self.cols + pos.col)
    }

    fn slot_mut(&mut self, pos: Position) -> Option<&mut Slot> {
        let i = self.index(pos)?;
        self.grid[i].as_mut()
    }

    /// Applies the player's previous outcome, if any. Returns whether the grid
    /// changed.
    pub fn settle(&mut self, player: &PlayerId) -> bool {
        let Some(outcome) = self.pending.remove(player) else {
            return false;
        };
        let mut changed = false;
        match outcome {
            Outcome::Matched { first, second } => {
                for pos in [first, second] {
                    if let Some(i) = self.index(pos) {
                        changed |= self.grid[i].take().is_some();
                    }
                }
            }
            Outcome::Mismatched { first, second } => {
                for pos in [first, second] {
                    // Another player may have claimed the card since the mismatch.
                    if let Some(slot) = self.slot_mut(pos) {
                        if slot.is_face_up() && slot.controller().is_none() {
                            slot.turn_down();
                            changed = true;
                        }
                    }
                }
            }
        }
        if changed {
            self.generation += 1;
        }
        changed
    }

    /// Tries to take `pos` as the player's first card. Returns
    /// [`Attempt::Contested`] without changing that card if someone else holds it.
    pub fn try_flip_first(
        &mut self,
        pos: Position,
        player: &PlayerId,
    ) -> Result<Attempt, BoardError> {
        let contested = match self.slot(pos) {
            None => return Err(BoardError::EmptySpace(pos)),
            Some(slot) => slot.is_held_by_other(player),
        };

        if let Some(previous) = self.first_selection.get(player).copied() {
            if previous != pos {
                self.first_selection.remove(player);
                if let Some(slot) = self.slot_mut(previous) {
                    slot.release();
                }
                self.generation += 1;
            }
        }

        if contested {
            return Ok(Attempt::Contested);
        }

        let slot = self.slot_mut(pos).ok_or(BoardError::EmptySpace(pos))?;
        if !slot.is_face_up() {
            slot.turn_up();
        }
        slot.take(player);
        self.first_selection.insert(player.clone(), pos);
        self.generation += 1;
        Ok(Attempt::Acquired)
    }

    /// Resolves the player's turn with `pos` as the second card.
    pub fn flip_second(&mut self, pos: Position, player: &PlayerId) -> Result<Outcome, BoardError> {
        let first = self
            .first_selection
            .get(player)
            .copied()
            .ok_or_else(|| BoardError::NoFirstSelection(player.clone()))?;

        let target = match self.slot(pos) {
            None => Err(BoardError::EmptySpace(pos)),
            Some(slot) if slot.is_face_up() && slot.controller().is_some() => {
                Err(BoardError::Controlled(pos))
            }
            Some(_) => Ok(()),
        };
        if let Err(err) = target {
            self.first_selection.remove(player);
            if let Some(slot) = self.slot_mut(first) {
                slot.release();
            }
            self.generation += 1;
            return Err(err);
        }

        let first_label = self
            .slot(first)
            .map(|slot| slot.label().clone())
            .ok_or_else(|| {
                BoardError::InvariantViolation(format!(
                    "first selection {first} of {player} has no card"
                ))
            })?;

        let second = self.slot_mut(pos).ok_or(BoardError::EmptySpace(pos))?;
        if !second.is_face_up() {
            second.turn_up();
        }

        let outcome = if second.label() == &first_label {
            second.take(player);
            Outcome::Matched { first, second: pos }
        } else {
            second.release();
            if let Some(slot) = self.slot_mut(first) {
                slot.release();
            }
            Outcome::Mismatched { first, second: pos }
        };

        self.first_selection.remove(player);
        self.pending.insert(player.clone(), outcome);
        self.generation += 1;
        Ok(outcome)
    }

    /// Distinct labels still on the board, in sorted order.
    pub fn distinct_labels(&self) -> Vec<Label> {
        self.grid
            .iter()
            .flatten()
            .map(|slot| slot.label().clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Replaces labels according to `replacements`; labels without an entry
    /// are kept.
    pub fn relabel(&mut self, replacements: &HashMap<Label, Label>) {
        let mut changed = false;
        for slot in self.grid.iter_mut().flatten() {
            if let Some(label) = replacements.get(slot.label()) {
                slot.relabel(label.clone());
                changed = true;
            }
        }
        if changed {
            self.generation += 1;
        }
    }

    /// Verifies the representation invariant.
    ///
    /// Controllers on the grid are authoritative; `first_selection` and matched
    /// `pending` entries must account for every controlled card and nothing else.
    pub fn check_rep(&self) -> Result<(), BoardError> {
        let violation =
            |msg: String| -> Result<(), BoardError> { Err(BoardError::InvariantViolation(msg)) };

        if self.grid.len() != self.rows * self.cols {
            return violation(format!(
                "grid holds {} cells, expected {}",
                self.grid.len(),
                self.rows * self.cols
            ));
        }

        for (player, pos) in &self.first_selection {
            if self.pending.contains_key(player) {
                return violation(format!("{player} has both a first card and a pending outcome"));
            }
            match self.slot(*pos) {
                Some(slot) if slot.is_face_up() && slot.is_controlled_by(player) => {}
                _ => {
                    return violation(format!("first selection {pos} of {player} is not held by them"))
                }
            }
        }

        for (player, outcome) in &self.pending {
            for pos in outcome.positions() {
                if self.index(pos).is_none() {
                    return violation(format!("pending outcome of {player} points outside the grid"));
                }
            }
            if let Outcome::Matched { first, second } = outcome {
                for pos in [*first, *second] {
                    match self.slot(pos) {
                        Some(slot) if slot.is_face_up() && slot.is_controlled_by(player) => {}
                        _ => {
                            return violation(format!(
                                "matched card {pos} of {player} is no longer held by them"
                            ))
                        }
                    }
                }
            }
        }

        for (i, cell) in self.grid.iter().enumerate() {
            let Some(slot) = cell else { continue };
            let pos = Position::new(i / self.cols, i % self.cols);
            if slot.label().as_str().is_empty() {
                return violation(format!("card at {pos} has an empty label"));
            }
            let Some(controller) = slot.controller() else { continue };
            if !slot.is_face_up() {
                return violation(format!("face-down card at {pos} is controlled by {controller}"));
            }
            let selected = self.first_selection.get(controller) == Some(&pos);
            let matched = matches!(
                self.pending.get(controller),
                Some(outcome @ Outcome::Matched { .. }) if outcome.positions().contains(&pos)
            );
            if !selected && !matched {
                return violation(format!(
                    "card at {pos} is controlled by {controller} outside of any turn"
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(rows: usize, cols: usize, labels: &[&str]) -> BoardState {
        let labels = labels
            .iter()
            .map(|l| Label::parse(l).expect("label"))
            .collect();
        BoardState::new(rows, cols, labels).expect("board state")
    }

    fn p(row: usize, col: usize) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn construction_requires_matching_label_count() {
        let labels = vec![Label::parse("A").expect("label")];
        assert!(matches!(
            BoardState::new(2, 2, labels),
            Err(BoardError::Format(_))
        ));
        assert!(matches!(
            BoardState::new(0, 2, Vec::new()),
            Err(BoardError::Format(_))
        ));
    }

    #[test]
    fn construction_rejects_overflowing_dimensions() {
        let labels = vec![Label::parse("A").expect("label")];
        assert!(matches!(
            BoardState::new(usize::MAX, 2, labels),
            Err(BoardError::Format(_))
        ));
    }

    #[test]
    fn first_flip_turns_up_and_takes_control() {
        let alice = PlayerId::from("alice");
        let mut s = state(1, 2, &["A", "A"]);
        assert_eq!(s.try_flip_first(p(0, 0), &alice).expect("flip"), Attempt::Acquired);
        let slot = s.slot(p(0, 0)).expect("slot");
        assert!(slot.is_face_up());
        assert!(slot.is_controlled_by(&alice));
        assert_eq!(s.first_selection(&alice), Some(p(0, 0)));
        s.check_rep().expect("consistent");
    }

    #[test]
    fn first_flip_on_card_held_by_other_is_contested() {
        let alice = PlayerId::from("alice");
        let bob = PlayerId::from("bob");
        let mut s = state(1, 2, &["A", "B"]);
        s.try_flip_first(p(0, 0), &alice).expect("alice");
        assert_eq!(s.try_flip_first(p(0, 0), &bob).expect("bob"), Attempt::Contested);
        assert_eq!(s.first_selection(&bob), None);
        assert!(s.slot(p(0, 0)).expect("slot").is_controlled_by(&alice));
    }

    #[test]
    fn reselecting_own_card_is_idempotent() {
        let alice = PlayerId::from("alice");
        let mut s = state(1, 2, &["A", "B"]);
        s.try_flip_first(p(0, 0), &alice).expect("flip");
        assert_eq!(s.try_flip_first(p(0, 0), &alice).expect("again"), Attempt::Acquired);
        assert_eq!(s.first_selection(&alice), Some(p(0, 0)));
        s.check_rep().expect("consistent");
    }

    #[test]
    fn second_first_flip_releases_the_earlier_card() {
        let alice = PlayerId::from("alice");
        let mut s = state(1, 3, &["A", "B", "C"]);
        s.try_flip_first(p(0, 0), &alice).expect("flip");
        s.try_flip_first(p(0, 2), &alice).expect("flip again");
        let earlier = s.slot(p(0, 0)).expect("slot");
        assert!(earlier.is_face_up());
        assert_eq!(earlier.controller(), None);
        assert_eq!(s.first_selection(&alice), Some(p(0, 2)));
        s.check_rep().expect("consistent");
    }

    #[test]
    fn empty_first_flip_keeps_selection() {
        let alice = PlayerId::from("alice");
        let mut s = state(1, 2, &["A", "B"]);
        s.try_flip_first(p(0, 0), &alice).expect("flip");
        assert!(matches!(
            s.try_flip_first(p(5, 5), &alice),
            Err(BoardError::EmptySpace(_))
        ));
        assert_eq!(s.first_selection(&alice), Some(p(0, 0)));
        assert!(s.slot(p(0, 0)).expect("slot").is_controlled_by(&alice));
    }

    #[test]
    fn second_flip_without_first_changes_nothing() {
        let alice = PlayerId::from("alice");
        let mut s = state(1, 2, &["A", "A"]);
        assert!(matches!(
            s.flip_second(p(0, 1), &alice),
            Err(BoardError::NoFirstSelection(_))
        ));
        assert!(!s.slot(p(0, 1)).expect("slot").is_face_up());
    }

    #[test]
    fn second_flip_on_own_first_card_is_controlled_and_releases() {
        let alice = PlayerId::from("alice");
        let mut s = state(1, 2, &["A", "A"]);
        s.try_flip_first(p(0, 0), &alice).expect("flip");
        assert!(matches!(
            s.flip_second(p(0, 0), &alice),
            Err(BoardError::Controlled(_))
        ));
        let slot = s.slot(p(0, 0)).expect("slot");
        assert!(slot.is_face_up());
        assert_eq!(slot.controller(), None);
        assert_eq!(s.first_selection(&alice), None);
        assert_eq!(s.pending(&alice), None);
        s.check_rep().expect("consistent");
    }

    #[test]
    fn second_flip_out_of_bounds_releases_first() {
        let alice = PlayerId::from("alice");
        let mut s = state(1, 2, &["A", "A"]);
        s.try_flip_first(p(0, 0), &alice).expect("flip");
        assert!(matches!(
            s.flip_second(p(3, 0), &alice),
            Err(BoardError::EmptySpace(_))
        ));
        assert_eq!(s.slot(p(0, 0)).expect("slot").controller(), None);
        assert_eq!(s.first_selection(&alice), None);
    }

    #[test]
    fn match_is_removed_on_settle() {
        let alice = PlayerId::from("alice");
        let mut s = state(1, 3, &["A", "A", "B"]);
        s.try_flip_first(p(0, 0), &alice).expect("first");
        let outcome = s.flip_second(p(0, 1), &alice).expect("second");
        assert_eq!(outcome, Outcome::Matched { first: p(0, 0), second: p(0, 1) });
        assert!(s.slot(p(0, 1)).expect("slot").is_controlled_by(&alice));
        s.check_rep().expect("consistent");

        assert!(s.settle(&alice));
        assert!(s.slot(p(0, 0)).is_none());
        assert!(s.slot(p(0, 1)).is_none());
        assert!(s.slot(p(0, 2)).is_some());
        assert_eq!(s.pending(&alice), None);
        assert!(!s.settle(&alice));
    }

    #[test]
    fn mismatch_turns_down_only_uncontrolled_cards() {
        let alice = PlayerId::from("alice");
        let bob = PlayerId::from("bob");
        let mut s = state(1, 3, &["A", "B", "B"]);
        s.try_flip_first(p(0, 0), &alice).expect("first");
        let outcome = s.flip_second(p(0, 1), &alice).expect("second");
        assert!(matches!(outcome, Outcome::Mismatched { .. }));
        for pos in [p(0, 0), p(0, 1)] {
            let slot = s.slot(pos).expect("slot");
            assert!(slot.is_face_up());
            assert_eq!(slot.controller(), None);
        }

        s.try_flip_first(p(0, 1), &bob).expect("bob takes the B");
        s.settle(&alice);
        assert!(!s.slot(p(0, 0)).expect("slot").is_face_up());
        let taken = s.slot(p(0, 1)).expect("slot");
        assert!(taken.is_face_up());
        assert!(taken.is_controlled_by(&bob));
        s.check_rep().expect("consistent");
    }

    #[test]
    fn relabel_keeps_state() {
        let alice = PlayerId::from("alice");
        let mut s = state(1, 3, &["A", "A", "B"]);
        s.try_flip_first(p(0, 0), &alice).expect("first");
        let mut replacements = HashMap::new();
        replacements.insert(Label::parse("A").expect("label"), Label::parse("Z").expect("label"));
        s.relabel(&replacements);
        assert_eq!(s.render(&alice), "my Z\ndown\ndown\n");
        assert_eq!(
            s.distinct_labels(),
            vec![Label::parse("B").expect("label"), Label::parse("Z").expect("label")]
        );
    }

    #[test]
    fn check_rep_reports_stray_control() {
        let alice = PlayerId::from("alice");
        let mut s = state(1, 2, &["A", "B"]);
        s.try_flip_first(p(0, 0), &alice).expect("first");
        s.first_selection.clear();
        assert!(matches!(
            s.check_rep(),
            Err(BoardError::InvariantViolation(_))
        ));
    }
}
