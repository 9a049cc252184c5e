//! Query rewriting applied before and during the geocoding cascade.

use std::sync::LazyLock;

use regex::Regex;

#[expect(clippy::expect_used, reason = "the pattern is a compile-time literal")]
static HANGUL_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("([가-힣])([0-9])").expect("valid regex"));

#[expect(clippy::expect_used, reason = "the pattern is a compile-time literal")]
static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)|（[^（）]*）").expect("valid regex"));

/// Normalise a free-text query: trim, collapse internal whitespace and
/// separate a Hangul syllable from a digit that directly follows it.
///
/// The result is the coordinate cache key.
///
/// # Examples
///
/// ```
/// use tourlane_data::normalise_query;
///
/// assert_eq!(normalise_query("  대전 엑스포로85 "), "대전 엑스포로 85");
/// assert_eq!(normalise_query("성심당\t 본점"), "성심당 본점");
/// ```
#[must_use]
pub fn normalise_query(query: &str) -> String {
    let collapsed = collapse_whitespace(query);
    HANGUL_DIGIT.replace_all(&collapsed, "$1 $2").into_owned()
}

/// Remove parenthesised segments, e.g. `"성심당 (본점)"` becomes `"성심당"`.
///
/// Returns `None` when the query has no parenthetical content or nothing
/// would remain.
#[must_use]
pub fn strip_parenthetical(query: &str) -> Option<String> {
    if !PARENTHETICAL.is_match(query) {
        return None;
    }
    let stripped = collapse_whitespace(&PARENTHETICAL.replace_all(query, " "));
    (!stripped.is_empty()).then_some(stripped)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
