//! Reassembling documents from a template and per-hole fragments.
//!
//! Generated fragments often repeat a few tokens of the surrounding text
//! (a clause head, a trailing `.`). Splicing removes the longest run of
//! tokens that ends the left side and also starts the right side.

use regex::Regex;
use std::sync::LazyLock;

use crate::source::Template;

/// A token is the neck `:-`, a run of word characters, or one other symbol.
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":-|\w+|[^\w\s]").expect("Invalid token regex"));

/// Build a document from a template and fragments in hole order.
///
/// `None` (and any missing trailing entry) marks a pending hole: the
/// placeholder token is emitted as-is and the following segment is appended
/// verbatim. Resolved fragments are spliced on both sides.
pub fn reconstruct(template: &Template, fragments: &[Option<String>], placeholder: &str) -> String {
    let segments = template.segments();
    let mut out = segments[0].clone();

    for (i, segment) in segments.iter().enumerate().skip(1) {
        match fragments.get(i - 1).and_then(|f| f.as_deref()) {
            Some(fragment) => {
                out = splice(&out, fragment.trim_matches('\n'));
                out = splice(&out, segment);
            }
            None => {
                out.push_str(placeholder);
                out.push_str(segment);
            }
        }
    }

    out
}

/// Join `left` and `right`, dropping the overlapping tokens from `right`.
pub fn splice(left: &str, right: &str) -> String {
    let k = overlap(left, right);
    if k == 0 {
        return format!("{left}{right}");
    }

    let cut = TOKEN_REGEX
        .find_iter(right)
        .nth(k - 1)
        .map_or(0, |m| m.end());
    format!("{left}{}", &right[cut..])
}

/// Largest `k` such that the last `k` tokens of `left` equal the first `k`
/// tokens of `right`.
pub fn overlap(left: &str, right: &str) -> usize {
    let left_tokens = tokenize(left);
    let right_tokens = tokenize(right);
    let max = left_tokens.len().min(right_tokens.len());

    (1..=max)
        .rev()
        .find(|&k| left_tokens[left_tokens.len() - k..] == right_tokens[..k])
        .unwrap_or(0)
}

/// Split text into merge tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    TOKEN_REGEX.find_iter(text).map(|m| m.as_str()).collect()
}
