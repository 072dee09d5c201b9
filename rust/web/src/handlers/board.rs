use crate::errors::{ApiError, IntoErrorResponse};
use flipcard_engine::{Board, PlayerId, Position};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

#[derive(Serialize)]
struct RouteIndex {
    routes: [&'static str; 4],
}

/// Lists the available routes.
///
/// # HTTP Method and Path
/// - **Method**: GET
/// - **Path**: `/`
pub async fn index() -> Response {
    reply::json(&RouteIndex {
        routes: [
            "GET /look/{player}",
            "POST /flip/{player}/{row},{col}",
            "POST /replace/{player}/{from}/{to}",
            "GET /health",
        ],
    })
    .into_response()
}

/// Returns the board as `player` sees it.
///
/// # HTTP Method and Path
/// - **Method**: GET
/// - **Path**: `/look/{player}`
///
/// # Response Format
/// - **Success (200 OK)**: plain text, a `ROWSxCOLS` line followed by one line
///   per card in row-major order (`none`, `down`, `up LABEL` or `my LABEL`)
/// - **Error (400 Bad Request)**: `invalid_player`
pub async fn look(board: Arc<Board>, player: String) -> Response {
    match parse_player(&player) {
        Ok(player) => text_response(board_text(&board, &player).await),
        Err(err) => err.into_http_response(),
    }
}

/// Turns over the card at `{row},{col}` for `player`.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/flip/{player}/{row},{col}`
///
/// # Purpose
/// Acts as the second card of the player's turn when they already hold a first
/// card, otherwise as the first card. A first card held by another player makes
/// the request wait until it is released, up to the configured flip timeout.
/// Closing the connection while waiting abandons the flip.
///
/// # Response Format
/// - **Success (200 OK)**: the same text as `/look/{player}` after the flip
/// - **Error (409 Conflict)**: `empty_space`, `card_controlled` or `no_first_card`
/// - **Error (408 Request Timeout)**: `flip_cancelled` when the wait timed out
/// - **Error (400 Bad Request)**: `invalid_player` or `invalid_position`
pub async fn flip(
    board: Arc<Board>,
    player: String,
    position: String,
    wait: Duration,
) -> Response {
    match flip_card(&board, &player, &position, wait).await {
        Ok(text) => text_response(text),
        Err(err) => err.into_http_response(),
    }
}

async fn flip_card(
    board: &Board,
    player: &str,
    position: &str,
    wait: Duration,
) -> Result<String, ApiError> {
    let player = parse_player(player)?;
    let pos = parse_position(position)?;

    if board.has_first_selection(&player).await {
        board.flip_second(pos, &player).await?;
    } else {
        board.flip_first_timeout(pos, &player, wait).await?;
    }
    Ok(board_text(board, &player).await)
}

/// Renames every card labelled `from` to `to`.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/replace/{player}/{from}/{to}`
///
/// Labels are taken verbatim from the path. Face orientation and control are
/// unchanged.
///
/// # Response Format
/// - **Success (200 OK)**: the same text as `/look/{player}` after the change
/// - **Error (400 Bad Request)**: `invalid_player` or `invalid_label`
pub async fn replace(board: Arc<Board>, player: String, from: String, to: String) -> Response {
    match replace_label(&board, &player, from, to).await {
        Ok(text) => text_response(text),
        Err(err) => err.into_http_response(),
    }
}

async fn replace_label(
    board: &Board,
    player: &str,
    from: String,
    to: String,
) -> Result<String, ApiError> {
    let player = parse_player(player)?;
    board
        .map(|label| {
            let replacement = if label.as_str() == from {
                to.clone()
            } else {
                label.to_string()
            };
            async move { replacement }
        })
        .await?;
    Ok(board_text(board, &player).await)
}

async fn board_text(board: &Board, player: &PlayerId) -> String {
    format!(
        "{}x{}\n{}",
        board.rows(),
        board.cols(),
        board.snapshot(player).await
    )
}

fn text_response(text: String) -> Response {
    reply::with_status(text, StatusCode::OK).into_response()
}

/// Player ids are non-empty runs of ASCII letters, digits and underscores.
pub fn parse_player(raw: &str) -> Result<PlayerId, ApiError> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::InvalidPlayer(raw.to_string()));
    }
    Ok(PlayerId::from(raw))
}

/// Parses `ROW,COL`.
pub fn parse_position(raw: &str) -> Result<Position, ApiError> {
    let invalid = || ApiError::InvalidPosition(raw.to_string());
    let (row, col) = raw.split_once(',').ok_or_else(invalid)?;
    let row = row.parse().map_err(|_| invalid())?;
    let col = col.parse().map_err(|_| invalid())?;
    Ok(Position::new(row, col))
}
