//! Matching school-special route text to school names.
//!
//! Stop datasets do not name the school a stop serves; it has to be read out
//! of free-text headsigns and route names. Matching is a pure function of
//! that text and the known school names, so the graph core only ever sees
//! the resulting association records.

mod similarity;

pub use similarity::{partial_ratio, ratio, token_sort_ratio, weighted_ratio};

use crate::domain::SchoolId;

/// Words that carry no school information in a headsign.
pub const FILLER_WORDS: [&str; 7] = ["to", "via", "am", "pm", "from", "service", "route"];

/// Columns whose text is searched for a school name, in order.
pub const HEADSIGN_COLUMNS: [&str; 10] = [
    "trip_headsign",
    "headsign",
    "destination",
    "route_long_name",
    "route_short_name",
    "route_name",
    "trip_short_name",
    "school",
    "school_name",
    "stop_name",
];

/// Lowercase, replace anything outside `[a-z0-9 &'-]` with a space and
/// collapse whitespace.
///
/// ```
/// use school_access::matching::normalize_name;
///
/// assert_eq!(normalize_name("  St. Mary's  (Primary)"), "st mary's primary");
/// ```
pub fn normalize_name(s: &str) -> String {
    let cleaned: String = s
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '&' | '\'' | '-' => c,
            _ => ' ',
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalise a headsign and drop [`FILLER_WORDS`].
pub fn headsign_query(headsign: &str) -> String {
    normalize_name(headsign)
        .split(' ')
        .filter(|w| !w.is_empty() && !FILLER_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The school a piece of route text was matched to.
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolMatch {
    pub school: SchoolId,
    /// Whole-point similarity score, 0-100.
    pub confidence: f64,
}

/// Matches route text against a fixed set of school names.
#[derive(Debug, Clone)]
pub struct SchoolMatcher {
    /// Schools with their normalised names, ordered by id.
    targets: Vec<(SchoolId, String)>,
    cutoff: f64,
}

impl SchoolMatcher {
    /// Create a matcher accepting scores of at least `cutoff`.
    ///
    /// Duplicate schools and names that normalise to nothing are ignored.
    pub fn new(schools: impl IntoIterator<Item = SchoolId>, cutoff: f64) -> Self {
        let mut targets: Vec<(SchoolId, String)> = schools
            .into_iter()
            .map(|id| {
                let norm = normalize_name(id.as_str());
                (id, norm)
            })
            .filter(|(_, norm)| !norm.is_empty())
            .collect();
        targets.sort_by(|a, b| a.0.cmp(&b.0));
        targets.dedup_by(|a, b| a.0 == b.0);
        Self { targets, cutoff }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Best-scoring school for a headsign, if it reaches the cutoff.
    ///
    /// Ties go to the school that sorts first.
    pub fn match_text(&self, text: &str) -> Option<SchoolMatch> {
        let query = headsign_query(text);
        if query.is_empty() {
            return None;
        }

        let mut best: Option<(&SchoolId, f64)> = None;
        for (school, name) in &self.targets {
            let score = weighted_ratio(&query, name).floor();
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((school, score));
            }
        }

        best.filter(|(_, score)| *score >= self.cutoff)
            .map(|(school, confidence)| SchoolMatch {
                school: school.clone(),
                confidence,
            })
    }
}

/// Match one headsign against a list of school names.
///
/// Convenience wrapper over [`SchoolMatcher`] for one-off lookups.
pub fn match_school(headsign: &str, school_names: &[SchoolId], cutoff: f64) -> Option<SchoolMatch> {
    SchoolMatcher::new(school_names.iter().cloned(), cutoff).match_text(headsign)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schools(names: &[&str]) -> Vec<SchoolId> {
        names.iter().map(|n| SchoolId::new(n).unwrap()).collect()
    }

    #[test]
    fn normalizes_punctuation_and_case() {
        assert_eq!(normalize_name("Lyneham HIGH-School!"), "lyneham high-school");
        assert_eq!(normalize_name("Daramalan College / Dickson"), "daramalan college dickson");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn strips_filler_words() {
        assert_eq!(
            headsign_query("Route 42 to Lyneham High School via Dickson"),
            "42 lyneham high school dickson"
        );
        assert_eq!(headsign_query("To / From"), "");
    }

    #[test]
    fn matches_school_inside_headsign() {
        let names = schools(&["Lyneham High School", "Dickson College", "Canberra High School"]);
        let found = match_school("Route 42 to Lyneham High School via Dickson", &names, 82.0).unwrap();

        assert_eq!(found.school.as_str(), "Lyneham High School");
        assert_eq!(found.confidence, 90.0);
    }

    #[test]
    fn exact_name_scores_100() {
        let names = schools(&["Lyneham High School"]);
        let found = match_school("LYNEHAM HIGH SCHOOL", &names, 82.0).unwrap();
        assert_eq!(found.confidence, 100.0);
    }

    #[test]
    fn below_cutoff_is_no_match() {
        let names = schools(&["Lyneham High School"]);
        assert!(match_school("Gungahlin College", &names, 82.0).is_none());
    }

    #[test]
    fn filler_only_headsign_is_no_match() {
        let names = schools(&["Lyneham High School"]);
        assert!(match_school("to via from", &names, 0.0).is_none());
    }

    #[test]
    fn no_schools_is_no_match() {
        assert!(match_school("Lyneham High School", &[], 0.0).is_none());
    }

    #[test]
    fn ties_go_to_first_school() {
        let matcher = SchoolMatcher::new(schools(&["Twin B", "Twin A", "Twin A"]), 0.0);
        assert_eq!(matcher.len(), 2);

        let found = matcher.match_text("twin").unwrap();
        assert_eq!(found.school.as_str(), "Twin A");
    }
}
