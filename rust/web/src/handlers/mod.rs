pub mod board;
pub mod health;

pub use board::{flip, index, look, replace};
pub use health::health;
