// List file parsing
//
// A list file is a run of records shaped like
//
//     B"host"path"
//     W"host2"path2"
//     B"host3""
//
// where `W`/`w` marks a whitelist entry and anything else a blacklist entry.
// All whitespace is insignificant, including inside hosts and paths.

use crate::matcher::{ListKind, ListSet};
use tracing::{debug, warn};

const SEPARATOR: char = '"';

/// Parse the raw contents of a list file.
///
/// Tokens are consumed three at a time; a trailing partial record is dropped.
pub fn parse_list_file(data: &str) -> ListSet {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    let tokens: Vec<&str> = compact.split(SEPARATOR).collect();

    let mut lists = ListSet::new();
    let mut i = 0;
    while i + 2 < tokens.len() {
        let kind = record_kind(tokens[i]);
        let entry = format!("{}{}", tokens[i + 1], tokens[i + 2]);
        debug!("{} => {}", tokens[i], entry);
        lists.push(kind, entry);
        i += 3;
    }

    let leftover = tokens.len() - i;
    // A well-formed file ends with a separator, which leaves one empty token
    if leftover > 1 || (leftover == 1 && !tokens[i].is_empty()) {
        warn!("Ignoring {} trailing token(s) in list file", leftover);
    }

    lists
}

fn record_kind(token: &str) -> ListKind {
    match token {
        "W" | "w" => ListKind::White,
        _ => ListKind::Black,
    }
}
