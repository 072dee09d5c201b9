use flipcard_engine::{Board, BoardDefinition, BoardError, PlayerId, Position};
use std::io::Write;

#[tokio::test]
async fn new_board_is_all_face_down_for_everyone() {
    let board = Board::parse("3x3\nA\nA\nB\nC\nD\nE\nF\nG\nH\n").expect("valid board");
    assert_eq!(board.rows(), 3);
    assert_eq!(board.cols(), 3);

    for name in ["alice", "bob", "carol"] {
        let snapshot = board.snapshot(&PlayerId::from(name)).await;
        let lines: Vec<&str> = snapshot.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines.iter().all(|line| *line == "down"));
    }
}

#[test]
fn malformed_definitions_are_format_errors() {
    let cases = [
        "",
        "2by2\nA\nA\nB\nB\n",
        "2x2\nA\nA\nB\n",
        "2x2\nA\nA\nB\nB\nC\n",
        "1x2\nA\n \n",
        "1x2\nA\nB B\n",
    ];
    for text in cases {
        assert!(
            matches!(Board::parse(text), Err(BoardError::Format(_))),
            "{text:?} should not parse"
        );
    }
}

#[test]
fn every_parsed_label_is_a_single_token() {
    let definition: BoardDefinition = "2x3\n🦄\n🌈\n🦄\nx-1\n🌈\nx-1\n"
        .parse()
        .expect("valid board");
    assert_eq!(definition.labels.len(), 6);
    assert!(definition
        .labels
        .iter()
        .all(|label| !label.as_str().is_empty() && !label.as_str().contains(char::is_whitespace)));
}

#[tokio::test]
async fn loads_board_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "1x2\nA\nA\n").expect("write board");

    let board = Board::from_file(file.path()).expect("load board");
    let alice = PlayerId::from("alice");
    board
        .flip_first(Position::new(0, 1), &alice)
        .await
        .expect("flip");
    assert_eq!(board.snapshot(&alice).await, "down\nmy A\n");
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = Board::from_file(dir.path().join("absent.txt"));
    assert!(matches!(result, Err(BoardError::Io(_))));
}
