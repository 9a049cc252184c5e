//! Ranking of keyword search hits.

use serde::{Deserialize, Serialize};

/// Weights used to rank keyword search hits.
///
/// Names are compared with all whitespace removed so `"대전 역"` and
/// `"대전역"` match exactly.
///
/// # Examples
///
/// ```
/// use tourlane_data::KeywordScoring;
///
/// let scoring = KeywordScoring::default();
/// let exact = scoring.score("성심당", "성심당", true);
/// let prefix = scoring.score("성심당", "성심당 본점", true);
/// assert!(exact > prefix);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordScoring {
    /// Added when the hit lies inside the service region.
    pub in_region_bonus: f64,
    /// Added when the name equals the query.
    pub exact_bonus: f64,
    /// Added when the name starts with the query (and is not equal).
    pub prefix_bonus: f64,
    /// Added when the name contains the query elsewhere.
    pub substring_bonus: f64,
    /// Subtracted per character of the name.
    pub length_penalty: f64,
    /// Added per query token contained in the name.
    pub token_bonus: f64,
}

impl Default for KeywordScoring {
    fn default() -> Self {
        Self {
            in_region_bonus: 100.0,
            exact_bonus: 200.0,
            prefix_bonus: 150.0,
            substring_bonus: 50.0,
            length_penalty: 1.0,
            token_bonus: 50.0,
        }
    }
}

impl KeywordScoring {
    /// Score a hit named `name` for `query`.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "scores are small sums of configured weights"
    )]
    pub fn score(&self, query: &str, name: &str, in_region: bool) -> f64 {
        let compact_query = compact(query);
        let compact_name = compact(name);

        let mut score = 0.0;
        if in_region {
            score += self.in_region_bonus;
        }
        if !compact_query.is_empty() {
            if compact_name == compact_query {
                score += self.exact_bonus;
            } else if compact_name.starts_with(&compact_query) {
                score += self.prefix_bonus;
            } else if compact_name.contains(&compact_query) {
                score += self.substring_bonus;
            }
        }
        score -= self.length_penalty * compact_name.chars().count() as f64;

        let matched_tokens = query
            .split_whitespace()
            .filter(|token| compact_name.contains(token))
            .count();
        score += self.token_bonus * matched_tokens as f64;
        score
    }
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn scoring() -> KeywordScoring {
        KeywordScoring::default()
    }

    #[rstest]
    fn exact_match_in_region(scoring: KeywordScoring) {
        // 100 region + 200 exact - 3 chars + 50 for the single token.
        let score = scoring.score("성심당", "성심당", true);
        assert!((score - 347.0).abs() < f64::EPSILON, "got {score}");
    }

    #[rstest]
    fn whitespace_is_ignored_for_exact_matches(scoring: KeywordScoring) {
        let spaced = scoring.score("대전 역", "대전역", false);
        // 200 exact - 3 chars + 50 for "대전" + 50 for "역".
        assert!((spaced - 297.0).abs() < f64::EPSILON, "got {spaced}");
    }

    #[rstest]
    #[case("성심당", "성심당 본점", "대전 성심당")]
    #[case("엑스포", "엑스포과학공원", "대전엑스포시민광장")]
    fn prefix_beats_substring(
        scoring: KeywordScoring,
        #[case] query: &str,
        #[case] prefix: &str,
        #[case] substring: &str,
    ) {
        assert!(scoring.score(query, prefix, true) > scoring.score(query, substring, true));
    }

    #[rstest]
    fn region_bonus_dominates_small_differences(scoring: KeywordScoring) {
        let inside = scoring.score("중앙시장", "중앙시장 입구", true);
        let outside = scoring.score("중앙시장", "중앙시장", false);
        assert!(inside > outside);
    }

    #[rstest]
    fn weights_are_tunable() {
        let scoring = KeywordScoring {
            length_penalty: 0.0,
            token_bonus: 0.0,
            ..KeywordScoring::default()
        };
        let score = scoring.score("한빛탑", "한빛탑", false);
        assert!((score - 200.0).abs() < f64::EPSILON);
    }
}
