use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use crate::errors::BoardError;
use crate::parse::BoardDefinition;
use crate::rules::{Attempt, BoardState, Outcome};
use crate::slot::{Label, PlayerId, Position};

/// A shared Memory board.
///
/// All state sits behind one async mutex. `changed` is signalled, while the
/// lock is still held, after every operation that modified a card, which is
/// the only thing a blocked [`Board::flip_first`] waits for.
///
/// # Examples
///
/// ```
/// use flipcard_engine::board::Board;
/// use flipcard_engine::slot::{PlayerId, Position};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let board = Board::parse("1x2\nA\nA\n").expect("valid board");
/// let alice = PlayerId::from("alice");
///
/// board.flip_first(Position::new(0, 0), &alice).await.expect("first flip");
/// board.flip_second(Position::new(0, 1), &alice).await.expect("second flip");
/// assert_eq!(board.snapshot(&alice).await, "my A\nmy A\n");
/// # }
/// ```
#[derive(Debug)]
pub struct Board {
    rows: usize,
    cols: usize,
    state: Mutex<BoardState>,
    changed: Notify,
}

impl Board {
    /// Builds a board of face-down cards from `rows * cols` labels in
    /// row-major order.
    pub fn new<I, S>(rows: usize, cols: usize, labels: I) -> Result<Self, BoardError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = labels
            .into_iter()
            .map(|label| Label::parse(label.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_state(BoardState::new(rows, cols, labels)?)
    }

    pub fn from_definition(definition: BoardDefinition) -> Result<Self, BoardError> {
        Self::from_state(BoardState::new(
            definition.rows,
            definition.cols,
            definition.labels,
        )?)
    }

    pub fn parse(text: &str) -> Result<Self, BoardError> {
        Self::from_definition(text.parse()?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BoardError> {
        let path = path.as_ref();
        let board = Self::from_definition(BoardDefinition::from_file(path)?)?;
        tracing::info!(
            path = %path.display(),
            rows = board.rows,
            cols = board.cols,
            "loaded board"
        );
        Ok(board)
    }

    fn from_state(state: BoardState) -> Result<Self, BoardError> {
        state.check_rep()?;
        Ok(Self {
            rows: state.rows(),
            cols: state.cols(),
            state: Mutex::new(state),
            changed: Notify::new(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Starts `player`'s turn by turning up the card at `pos`.
    ///
    /// The player's previous outcome is settled first. If another player
    /// controls the card, this waits until they give it up and then tries
    /// again; the card may be gone by then, which fails with
    /// [`BoardError::EmptySpace`].
    ///
    /// Dropping the returned future while it waits leaves the board as it was
    /// when the wait began.
    pub async fn flip_first(&self, pos: Position, player: &PlayerId) -> Result<(), BoardError> {
        let mut state = self.state.lock().await;

        let before = state.generation();
        if state.settle(player) {
            tracing::debug!(player = %player, "settled previous turn");
        }
        self.after_change(&state, before)?;

        loop {
            let before = state.generation();
            let attempt = state.try_flip_first(pos, player);
            self.after_change(&state, before)?;

            match attempt? {
                Attempt::Acquired => {
                    tracing::debug!(
                        player = %player,
                        row = pos.row,
                        col = pos.col,
                        "first card taken"
                    );
                    return Ok(());
                }
                Attempt::Contested => {
                    tracing::debug!(
                        player = %player,
                        row = pos.row,
                        col = pos.col,
                        "waiting for card held by another player"
                    );
                    // Registered before the lock is released so no signal is missed.
                    let notified = self.changed.notified();
                    drop(state);
                    notified.await;
                    state = self.state.lock().await;
                }
            }
        }
    }

    /// [`Board::flip_first`], abandoned with [`BoardError::Cancelled`] if
    /// `cancel` completes first.
    pub async fn flip_first_until<C>(
        &self,
        pos: Position,
        player: &PlayerId,
        cancel: C,
    ) -> Result<(), BoardError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            result = self.flip_first(pos, player) => result,
            () = cancel => {
                tracing::warn!(
                    player = %player,
                    row = pos.row,
                    col = pos.col,
                    "first flip cancelled"
                );
                Err(BoardError::Cancelled)
            }
        }
    }

    pub async fn flip_first_timeout(
        &self,
        pos: Position,
        player: &PlayerId,
        timeout: Duration,
    ) -> Result<(), BoardError> {
        self.flip_first_until(pos, player, tokio::time::sleep(timeout))
            .await
    }

    /// Finishes `player`'s turn with the card at `pos`. Never waits for
    /// another player.
    pub async fn flip_second(
        &self,
        pos: Position,
        player: &PlayerId,
    ) -> Result<Outcome, BoardError> {
        let mut state = self.state.lock().await;
        let before = state.generation();
        let result = state.flip_second(pos, player);
        self.after_change(&state, before)?;

        match &result {
            Ok(outcome) => tracing::debug!(
                player = %player,
                row = pos.row,
                col = pos.col,
                outcome = ?outcome,
                "second card turned"
            ),
            Err(err) => tracing::debug!(
                player = %player,
                row = pos.row,
                col = pos.col,
                error = %err,
                "second flip rejected"
            ),
        }
        result
    }

    pub async fn has_first_selection(&self, player: &PlayerId) -> bool {
        self.state.lock().await.first_selection(player).is_some()
    }

    /// The board as `player` sees it, one line per cell in row-major order.
    pub async fn snapshot(&self, player: &PlayerId) -> String {
        self.state.lock().await.render(player)
    }

    /// Replaces every label with `transform(label)`, all at once.
    ///
    /// `transform` runs once per distinct label while the board is locked, so
    /// no flip sees a partly transformed grid and equal labels stay equal.
    /// If any replacement is not a valid label nothing changes.
    pub async fn map<F, Fut>(&self, mut transform: F) -> Result<(), BoardError>
    where
        F: FnMut(Label) -> Fut,
        Fut: Future<Output = String>,
    {
        let mut state = self.state.lock().await;

        let mut replacements = HashMap::new();
        for label in state.distinct_labels() {
            let replacement = Label::parse(&transform(label.clone()).await)?;
            if replacement != label {
                replacements.insert(label, replacement);
            }
        }

        let before = state.generation();
        state.relabel(&replacements);
        self.after_change(&state, before)?;

        tracing::info!(replaced = replacements.len(), "relabelled board");
        Ok(())
    }

    /// Wakes waiters if `state` moved past `before`, then checks the invariant.
    fn after_change(&self, state: &BoardState, before: u64) -> Result<(), BoardError> {
        if state.generation() == before {
            return Ok(());
        }
        self.changed.notify_waiters();
        state.check_rep().inspect_err(|err| {
            tracing::error!(error = %err, "board invariant violated");
        })
    }
}
