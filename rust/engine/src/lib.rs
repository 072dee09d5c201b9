//! # flipcard-engine: Shared Memory Board
//!
//! A concurrent "Memory" (match two face-down cards) board that many players
//! can flip cards on at the same time. Turning a first card waits while
//! another player holds it; turning a second card never waits.
//!
//! ## Core Modules
//!
//! - [`board`] - The shared board: locking, waiting and the public operations
//! - [`rules`] - Flip rules, settling of previous turns and the invariant check
//! - [`slot`] - Positions, player identities, labels and per-card state
//! - [`snapshot`] - Player-specific text rendering of the grid
//! - [`parse`] - Board definition files (`ROWSxCOLS` then one label per line)
//! - [`errors`] - Error types for board operations
//!
//! ## Quick Start
//!
//! ```rust
//! use flipcard_engine::board::Board;
//! use flipcard_engine::slot::{PlayerId, Position};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let board = Board::parse("2x2\nA\nB\nB\nA\n").expect("valid board");
//! let alice = PlayerId::from("alice");
//!
//! board.flip_first(Position::new(0, 0), &alice).await.expect("free card");
//! assert_eq!(board.snapshot(&alice).await, "my A\ndown\ndown\ndown\n");
//! # }
//! ```

pub mod board;
pub mod errors;
pub mod parse;
pub mod rules;
pub mod slot;
pub mod snapshot;

pub use board::Board;
pub use errors::BoardError;
pub use parse::BoardDefinition;
pub use rules::Outcome;
pub use slot::{Label, PlayerId, Position, SlotView};
