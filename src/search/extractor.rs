//! Regex match extraction with capture-group preference
use crate::search::ExtractedMatch;
use regex::{Captures, Match, Regex};

/// Find every non-overlapping match of `pattern` in `text`, left to right.
///
/// With no preferred groups the whole match is emitted. Otherwise the first
/// listed group that participated in the match is emitted, falling back to the
/// whole match when none did.
///
/// A group's offset is located by searching for its text inside the whole
/// match, so a group whose text also occurs earlier in the whole match reports
/// that earlier position.
pub fn extract_matches(text: &str, pattern: &Regex, groups: Option<&[usize]>) -> Vec<ExtractedMatch> {
    if text.is_empty() {
        return Vec::new();
    }

    match groups.filter(|groups| !groups.is_empty()) {
        None => pattern.find_iter(text).map(whole_match).collect(),
        Some(groups) => pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(preferred_group(&caps, whole, groups).unwrap_or_else(|| whole_match(whole)))
            })
            .collect(),
    }
}

fn whole_match(m: Match<'_>) -> ExtractedMatch {
    ExtractedMatch {
        value: m.as_str().to_string(),
        start_index: m.start(),
        end_index: m.end(),
    }
}

fn preferred_group(caps: &Captures<'_>, whole: Match<'_>, groups: &[usize]) -> Option<ExtractedMatch> {
    let group = groups.iter().find_map(|&index| caps.get(index))?;
    let offset = whole
        .as_str()
        .find(group.as_str())
        .unwrap_or(group.start() - whole.start());
    let start = whole.start() + offset;

    Some(ExtractedMatch {
        value: group.as_str().to_string(),
        start_index: start,
        end_index: start + group.as_str().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use regex::RegexBuilder;

    const RAW_REQUEST: &str =
        "GET /path/to/resource HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n";
    const REQUEST_LINE: &str = r"(?:GET|POST)\s+(\S+)\s+HTTP.*?\nHost:\s*(\S+)";

    fn ci(pattern: &str) -> Regex {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_matches("", &ci("a"), None).is_empty());
    }

    #[test]
    fn test_whole_match_offsets() {
        let matches = extract_matches("token=abc; token=def", &ci(r"token=\w+"), None);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].value, "token=abc");
        assert_eq!((matches[0].start_index, matches[0].end_index), (0, 9));
        assert_eq!(matches[1].value, "token=def");
        assert_eq!((matches[1].start_index, matches[1].end_index), (11, 20));
    }

    #[test]
    fn test_case_insensitive_keeps_original_case() {
        let matches = extract_matches("Host: Example.COM", &ci(r"example\.com"), None);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].value, "Example.COM");
    }

    #[test]
    fn test_capture_groups() {
        let pattern = ci(REQUEST_LINE);

        let matches = extract_matches(RAW_REQUEST, &pattern, Some(&[1]));
        assert_eq!(matches[0].value, "/path/to/resource");
        assert_eq!(matches[0].start_index, 4);
        assert_eq!(matches[0].end_index, 4 + "/path/to/resource".len());

        let matches = extract_matches(RAW_REQUEST, &pattern, Some(&[2]));
        assert_eq!(matches[0].value, "example.com");
        assert_eq!(
            &RAW_REQUEST[matches[0].start_index..matches[0].end_index],
            "example.com"
        );

        let matches = extract_matches(RAW_REQUEST, &pattern, Some(&[1, 2]));
        assert_eq!(matches[0].value, "/path/to/resource");
    }

    #[test]
    fn test_non_participating_group_falls_back() {
        let pattern = ci(r"(a)|(b)");

        let matches = extract_matches("b", &pattern, Some(&[1]));
        assert_eq!(matches[0].value, "b");

        let matches = extract_matches("b", &pattern, Some(&[1, 2]));
        assert_eq!(matches[0].value, "b");
        assert_eq!(matches[0].start_index, 0);

        let matches = extract_matches("b", &pattern, Some(&[9]));
        assert_eq!(matches[0].value, "b");
    }

    #[test]
    fn test_empty_group_list_is_whole_match() {
        let pattern = ci(r"id=(\d+)");
        let matches = extract_matches("id=7", &pattern, Some(&[]));
        assert_eq!(matches[0].value, "id=7");
    }

    #[test]
    fn test_repeated_group_text_reports_first_occurrence() {
        let pattern = ci(r"ab(ab)");
        let matches = extract_matches("xabab", &pattern, Some(&[1]));
        assert_eq!(matches[0].value, "ab");
        // The group captured at 3, but the search inside the whole match finds 1.
        assert_eq!(matches[0].start_index, 1);
        assert_eq!(matches[0].end_index, 3);
    }

    proptest! {
        #[test]
        fn prop_extraction_is_deterministic(text in "[a-zA-Z0-9 =;\\n]{0,200}") {
            let pattern = ci(r"([a-z]+)=(\d+)");
            let first = extract_matches(&text, &pattern, Some(&[2, 1]));
            let second = extract_matches(&text, &pattern, Some(&[2, 1]));
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_offsets_stay_in_bounds(text in "[a-z0-9 =]{0,200}") {
            let pattern = ci(r"([a-z]+)=(\d*)");
            for m in extract_matches(&text, &pattern, Some(&[2])) {
                prop_assert!(m.start_index <= m.end_index);
                prop_assert!(m.end_index <= text.len());
                prop_assert_eq!(&text[m.start_index..m.end_index], m.value.as_str());
            }
        }
    }
}
