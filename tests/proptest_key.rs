//! Property tests for the issue key grammar.

use proptest::prelude::*;
use quarry::IssueKey;

proptest! {
    /// Any well-formed key survives a parse/format round trip.
    #[test]
    fn parse_format_roundtrip(
        project in "[A-Z][A-Z0-9]{1,9}",
        number in 1i64..=9_999_999,
    ) {
        let key = format!("{project}-{number}");
        let parsed = IssueKey::parse(&key).unwrap();
        prop_assert_eq!(parsed.project_key(), project.as_str());
        prop_assert_eq!(parsed.number(), number);
        prop_assert_eq!(parsed.to_string(), key);
    }

    /// Hyphenated project keys split at the last hyphen.
    #[test]
    fn hyphenated_projects_split_at_last_hyphen(
        left in "[A-Z]{2,5}",
        right in "[A-Z]{2,5}",
        number in 1i64..=99_999,
    ) {
        let key = format!("{left}-{right}-{number}");
        let parsed = IssueKey::parse(&key).unwrap();
        prop_assert_eq!(parsed.project_key(), format!("{left}-{right}"));
        prop_assert_eq!(parsed.number(), number);
    }

    /// Strings without a trailing number never parse.
    #[test]
    fn keys_without_numbers_rejected(text in "[A-Z]{1,10}") {
        prop_assert!(IssueKey::parse(&text).is_err());
    }
}
