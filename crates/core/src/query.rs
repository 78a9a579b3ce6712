//! Search query construction.
//!
//! Filters are appended as native platform search operators. Values are
//! passed through verbatim: dates are not parsed and language codes are not
//! checked, so the platform decides what it accepts.

/// Optional filters appended to a search query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilters<'a> {
    /// Lower date bound (`YYYY-MM-DD`).
    pub since: Option<&'a str>,
    /// Upper date bound (`YYYY-MM-DD`).
    pub until: Option<&'a str>,
    /// Language code (`en`, `ru`, ...).
    pub lang: Option<&'a str>,
}

/// Build the platform query string.
///
/// Appends ` since:`, ` until:` and ` lang:` in that order, each only when
/// the corresponding filter is present and non-empty.
#[must_use]
pub fn build_query(query: &str, filters: &QueryFilters<'_>) -> String {
    let mut search_query = query.to_string();

    let operators = [
        ("since", filters.since),
        ("until", filters.until),
        ("lang", filters.lang),
    ];

    for (operator, value) in operators {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            search_query.push(' ');
            search_query.push_str(operator);
            search_query.push(':');
            search_query.push_str(value);
        }
    }

    search_query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters_returns_text() {
        assert_eq!(build_query("rust", &QueryFilters::default()), "rust");
    }

    #[test]
    fn test_since_and_lang() {
        let filters = QueryFilters {
            since: Some("2024-01-01"),
            lang: Some("en"),
            ..Default::default()
        };
        assert_eq!(
            build_query("rust", &filters),
            "rust since:2024-01-01 lang:en"
        );
    }

    #[test]
    fn test_all_filters_in_fixed_order() {
        let filters = QueryFilters {
            since: Some("2024-01-01"),
            until: Some("2024-02-01"),
            lang: Some("ru"),
        };
        assert_eq!(
            build_query("bitcoin", &filters),
            "bitcoin since:2024-01-01 until:2024-02-01 lang:ru"
        );
    }

    #[test]
    fn test_empty_filters_are_skipped() {
        let filters = QueryFilters {
            since: Some(""),
            until: Some("2024-02-01"),
            lang: Some(""),
        };
        assert_eq!(build_query("rust", &filters), "rust until:2024-02-01");
    }

    #[test]
    fn test_values_pass_through_unvalidated() {
        let filters = QueryFilters {
            since: Some("yesterday"),
            until: None,
            lang: Some("not a code"),
        };
        assert_eq!(
            build_query("from:@x OR #y", &filters),
            "from:@x OR #y since:yesterday lang:not a code"
        );
    }

    #[test]
    fn test_every_combination_keeps_order() {
        let values = [None, Some("a")];
        for since in values {
            for until in values {
                for lang in values {
                    let filters = QueryFilters { since, until, lang };
                    let mut expected = "q".to_string();
                    if since.is_some() {
                        expected.push_str(" since:a");
                    }
                    if until.is_some() {
                        expected.push_str(" until:a");
                    }
                    if lang.is_some() {
                        expected.push_str(" lang:a");
                    }
                    assert_eq!(build_query("q", &filters), expected);
                }
            }
        }
    }
}
