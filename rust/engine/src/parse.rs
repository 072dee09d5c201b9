//! Board definition files.
//!
//! ```text
//! 3x3
//! A
//! B
//! ...
//! ```
//!
//! The first line is `ROWSxCOLS` with two positive integers. It is followed by
//! exactly `ROWS * COLS` lines, one card label per line, in row-major order.

use std::path::Path;
use std::str::FromStr;

use crate::errors::BoardError;
use crate::slot::Label;

/// A validated board definition, ready to build a [`crate::board::Board`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDefinition {
    pub rows: usize,
    pub cols: usize,
    pub labels: Vec<Label>,
}

impl BoardDefinition {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BoardError> {
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }
}

impl FromStr for BoardDefinition {
    type Err = BoardError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut lines = text.lines().map(|line| line.strip_suffix('\r').unwrap_or(line));

        let header = lines
            .next()
            .ok_or_else(|| BoardError::Format("expected `ROWSxCOLS` header, found empty input".into()))?;
        let (rows, cols) = parse_header(header)?;

        let mut body: Vec<&str> = lines.collect();
        while body.last().is_some_and(|line| line.is_empty()) {
            body.pop();
        }

        let expected = rows.checked_mul(cols).ok_or_else(|| {
            BoardError::Format(format!("a {rows}x{cols} board is too large"))
        })?;
        if body.len() != expected {
            return Err(BoardError::Format(format!(
                "expected {expected} card lines for a {rows}x{cols} board, found {}",
                body.len()
            )));
        }

        let labels = body
            .iter()
            .enumerate()
            .map(|(i, line)| {
                Label::parse(line).map_err(|err| {
                    BoardError::Format(format!("line {}: expected a single card label, {err}", i + 2))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rows, cols, labels })
    }
}

fn parse_header(header: &str) -> Result<(usize, usize), BoardError> {
    let bad = || {
        BoardError::Format(format!(
            "expected `ROWSxCOLS` header with positive integers, found {header:?}"
        ))
    };
    let (rows, cols) = header.split_once('x').ok_or_else(bad)?;
    let rows: usize = parse_dimension(rows).ok_or_else(bad)?;
    let cols: usize = parse_dimension(cols).ok_or_else(bad)?;
    Ok((rows, cols))
}

fn parse_dimension(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_labels_in_order() {
        let def: BoardDefinition = "2x2\nA\nB\nB\nA\n".parse().expect("valid board");
        assert_eq!(def.rows, 2);
        assert_eq!(def.cols, 2);
        let labels: Vec<&str> = def.labels.iter().map(Label::as_str).collect();
        assert_eq!(labels, vec!["A", "B", "B", "A"]);
    }

    #[test]
    fn accepts_crlf_and_missing_final_newline() {
        let def: BoardDefinition = "1x2\r\nX\r\nY".parse().expect("valid board");
        assert_eq!(def.labels.len(), 2);
        assert_eq!(def.labels[1].as_str(), "Y");
    }

    #[test]
    fn rejects_bad_headers() {
        for header in ["", "3", "3x", "x3", "0x3", "3x0", "-1x2", "3 x 3", "axb", "3x3x3"] {
            let text = format!("{header}\nA\n");
            assert!(
                matches!(text.parse::<BoardDefinition>(), Err(BoardError::Format(_))),
                "header {header:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_header_whose_area_overflows() {
        let err = format!("{}x2\nA\n", usize::MAX)
            .parse::<BoardDefinition>()
            .unwrap_err();
        assert!(matches!(err, BoardError::Format(_)));
        assert!(err.to_string().contains("too large"));

        assert!(matches!(
            "4294967296x4294967296\nA\n".parse::<BoardDefinition>(),
            Err(BoardError::Format(_))
        ));
    }

    #[test]
    fn rejects_wrong_card_count() {
        let err = "2x2\nA\nB\nA\n".parse::<BoardDefinition>().unwrap_err();
        assert!(err.to_string().contains("expected 4 card lines"));
        assert!(err.to_string().contains("found 3"));

        assert!("1x1\nA\nB\n".parse::<BoardDefinition>().is_err());
    }

    #[test]
    fn rejects_blank_and_spaced_labels() {
        assert!("1x2\nA\n\nB\n".parse::<BoardDefinition>().is_err());
        let err = "1x2\nA\nB C\n".parse::<BoardDefinition>().unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }
}
