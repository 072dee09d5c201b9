use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::BoardError;

/// Grid coordinates of a card, addressed by row then column from the top-left.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Opaque identity of a player, supplied by whoever calls into the board.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text printed on the face of a card.
/// Never empty and never contains whitespace.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn parse(raw: &str) -> Result<Self, BoardError> {
        if raw.is_empty() {
            return Err(BoardError::Format("card label must not be empty".into()));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(BoardError::Format(format!(
                "card label {raw:?} must not contain whitespace"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Label::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of one card that is still on the board.
/// A face-down card never has a controller.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Slot {
    label: Label,
    face_up: bool,
    controller: Option<PlayerId>,
}

impl Slot {
    pub fn new(label: Label) -> Self {
        Self {
            label,
            face_up: false,
            controller: None,
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn is_face_up(&self) -> bool {
        self.face_up
    }

    pub fn controller(&self) -> Option<&PlayerId> {
        self.controller.as_ref()
    }

    pub fn is_controlled_by(&self, player: &PlayerId) -> bool {
        self.controller.as_ref() == Some(player)
    }

    /// Face up and held by someone other than `player`.
    pub fn is_held_by_other(&self, player: &PlayerId) -> bool {
        self.face_up && self.controller.as_ref().is_some_and(|c| c != player)
    }

    pub(crate) fn turn_up(&mut self) {
        self.face_up = true;
    }

    pub(crate) fn turn_down(&mut self) {
        self.face_up = false;
        self.controller = None;
    }

    pub(crate) fn take(&mut self, player: &PlayerId) {
        self.controller = Some(player.clone());
    }

    pub(crate) fn release(&mut self) {
        self.controller = None;
    }

    pub(crate) fn relabel(&mut self, label: Label) {
        self.label = label;
    }

    /// How this card looks to `viewer`.
    pub fn view_for(&self, viewer: &PlayerId) -> SlotView {
        if !self.face_up {
            SlotView::Down
        } else if self.is_controlled_by(viewer) {
            SlotView::Mine(self.label.clone())
        } else {
            SlotView::Up(self.label.clone())
        }
    }
}

/// A single cell as seen by one player. `Display` yields the snapshot line.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "state", content = "label", rename_all = "snake_case")]
pub enum SlotView {
    None,
    Down,
    Mine(Label),
    Up(Label),
}

impl fmt::Display for SlotView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotView::None => f.write_str("none"),
            SlotView::Down => f.write_str("down"),
            SlotView::Mine(label) => write!(f, "my {label}"),
            SlotView::Up(label) => write!(f, "up {label}"),
        }
    }
}
