use flipcard_engine::Board;
use serde::Serialize;
use warp::reply::Json;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    rows: usize,
    cols: usize,
}

pub fn health(board: &Board) -> Json {
    warp::reply::json(&HealthBody {
        status: "ok",
        rows: board.rows(),
        cols: board.cols(),
    })
}
