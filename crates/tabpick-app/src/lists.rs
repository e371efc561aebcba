// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The two hidden-field encodings handed to the conversion script.
//!
//! Header list: `r{row}c{col};` per header cell. Popup list:
//! `a{anchorCol}b{bodyCol};` per complete popup. Every token is terminated by
//! `;`, including the last one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CellCoord;

pub const TOKEN_TERMINATOR: char = ';';

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PopupPair {
    pub anchor: usize,
    pub body: usize,
}

impl PopupPair {
    pub const fn new(anchor: usize, body: usize) -> Self {
        Self { anchor, body }
    }
}

/// Both lists as produced by one submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackedLists {
    pub headers: String,
    pub popups: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("{list} list must end with `;`, found trailing {token:?}")]
    Unterminated { list: &'static str, token: String },
    #[error("malformed {list} token {token:?}; expected {expected}")]
    Malformed {
        list: &'static str,
        token: String,
        expected: &'static str,
    },
}

pub fn encode_header_list<I>(cells: I) -> String
where
    I: IntoIterator<Item = CellCoord>,
{
    cells
        .into_iter()
        .map(|coord| format!("r{}c{}{TOKEN_TERMINATOR}", coord.row, coord.col))
        .collect()
}

pub fn encode_popup_list<I>(pairs: I) -> String
where
    I: IntoIterator<Item = PopupPair>,
{
    pairs
        .into_iter()
        .map(|pair| format!("a{}b{}{TOKEN_TERMINATOR}", pair.anchor, pair.body))
        .collect()
}

pub fn parse_header_list(raw: &str) -> Result<Vec<CellCoord>, ListError> {
    tokens("header", raw)?
        .into_iter()
        .map(|token| {
            split_pair(token, 'r', 'c')
                .map(|(row, col)| CellCoord::new(row, col))
                .ok_or_else(|| ListError::Malformed {
                    list: "header",
                    token: token.to_owned(),
                    expected: "r<row>c<col>",
                })
        })
        .collect()
}

pub fn parse_popup_list(raw: &str) -> Result<Vec<PopupPair>, ListError> {
    tokens("popup", raw)?
        .into_iter()
        .map(|token| {
            split_pair(token, 'a', 'b')
                .map(|(anchor, body)| PopupPair::new(anchor, body))
                .ok_or_else(|| ListError::Malformed {
                    list: "popup",
                    token: token.to_owned(),
                    expected: "a<anchor>b<body>",
                })
        })
        .collect()
}

fn tokens<'a>(list: &'static str, raw: &'a str) -> Result<Vec<&'a str>, ListError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut pieces = raw.split(TOKEN_TERMINATOR).collect::<Vec<_>>();
    let tail = pieces.pop().unwrap_or_default();
    if !tail.trim().is_empty() {
        return Err(ListError::Unterminated {
            list,
            token: tail.to_owned(),
        });
    }
    Ok(pieces.into_iter().map(str::trim).collect())
}

fn split_pair(token: &str, first: char, second: char) -> Option<(usize, usize)> {
    let rest = token.strip_prefix(first)?;
    let (left, right) = rest.split_once(second)?;
    if !is_digits(left) || !is_digits(right) {
        return None;
    }
    Some((left.parse().ok()?, right.parse().ok()?))
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::{
        ListError, PopupPair, encode_header_list, encode_popup_list, parse_header_list,
        parse_popup_list,
    };
    use crate::CellCoord;

    #[test]
    fn header_list_encodes_each_token_terminated() {
        let list = encode_header_list([CellCoord::new(1, 1), CellCoord::new(1, 12)]);
        assert_eq!(list, "r1c1;r1c12;");
        assert_eq!(encode_header_list([]), "");
    }

    #[test]
    fn popup_list_encodes_anchor_then_body() {
        let list = encode_popup_list([PopupPair::new(2, 3), PopupPair::new(5, 4)]);
        assert_eq!(list, "a2b3;a5b4;");
    }

    #[test]
    fn parse_accepts_empty_and_whitespace() {
        assert_eq!(parse_header_list(""), Ok(Vec::new()));
        assert_eq!(parse_popup_list("  \n"), Ok(Vec::new()));
    }

    #[test]
    fn parse_header_list_reads_tokens_in_order() {
        assert_eq!(
            parse_header_list("r2c1;r1c3;"),
            Ok(vec![CellCoord::new(2, 1), CellCoord::new(1, 3)])
        );
    }

    #[test]
    fn parse_rejects_missing_terminator() {
        let error = parse_popup_list("a1b2;a3b4").expect_err("unterminated list should fail");
        assert_eq!(
            error,
            ListError::Unterminated {
                list: "popup",
                token: "a3b4".to_owned(),
            }
        );
    }

    #[test]
    fn parse_rejects_wrong_prefix_and_signs() {
        let error = parse_header_list("a1b2;").expect_err("popup token in header list");
        assert!(error.to_string().contains("r<row>c<col>"));

        assert!(parse_header_list("r-1c2;").is_err());
        assert!(parse_header_list("r1c;").is_err());
        assert!(parse_popup_list("a1b2b3;").is_err());
        assert!(parse_popup_list(";").is_err());
    }
}
