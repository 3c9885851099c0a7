// ── Value diff ──
//
// Line-oriented comparison of a staged variable's original and edited
// values. Long values are split on a delimiter first so that a change to
// one `<record>` of a tuple list shows up as one changed line.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

use crate::model::VariableDelta;

/// Where to break a value into diff lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum DiffDelimiter {
    /// Whole value is one line.
    #[default]
    NoSplit,
    Comma,
    LessThan,
}

impl DiffDelimiter {
    pub fn as_char(self) -> Option<char> {
        match self {
            Self::NoSplit => None,
            Self::Comma => Some(','),
            Self::LessThan => Some('<'),
        }
    }

    /// Break `text` into non-empty fragments.
    pub fn split(self, text: &str) -> Vec<&str> {
        match self.as_char() {
            None => vec![text],
            Some(c) => text.split(c).filter(|s| !s.is_empty()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "text", rename_all = "lowercase")]
pub enum DiffLine {
    Unchanged(String),
    Removed(String),
    Added(String),
}

/// Diff of `original` against `edited` after splitting both on
/// `delimiter`. Removals are listed before additions at each change.
pub fn diff_lines(original: &str, edited: &str, delimiter: DiffDelimiter) -> Vec<DiffLine> {
    let old = delimiter.split(original);
    let new = delimiter.split(edited);

    // Longest-common-subsequence table, filled from the end.
    let mut lcs = vec![vec![0_usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(old.len().max(new.len()));
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            out.push(DiffLine::Unchanged(old[i].to_owned()));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(DiffLine::Removed(old[i].to_owned()));
            i += 1;
        } else {
            out.push(DiffLine::Added(new[j].to_owned()));
            j += 1;
        }
    }
    out.extend(old[i..].iter().map(|s| DiffLine::Removed((*s).to_owned())));
    out.extend(new[j..].iter().map(|s| DiffLine::Added((*s).to_owned())));
    out
}

/// [`diff_lines`] over a staged delta.
pub fn diff_delta(delta: &VariableDelta, delimiter: DiffDelimiter) -> Vec<DiffLine> {
    diff_lines(
        delta.original().original_value(),
        delta.edited().value_delta(),
        delimiter,
    )
}
