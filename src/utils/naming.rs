use regex::Regex;
use std::sync::OnceLock;

fn capitalized_word() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("literal pattern is valid"))
}

fn lower_to_upper() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("literal pattern is valid"))
}

/// Normalise a statistic name from the service's CamelCase to snake_case.
///
/// A word boundary is inserted before every capitalised segment, then the whole
/// name is lower-cased: `FullLoadProgressPercent` → `full_load_progress_percent`.
pub fn camel_to_snake(name: &str) -> String {
    let spaced = capitalized_word().replace_all(name, "${1}_${2}");
    lower_to_upper()
        .replace_all(&spaced, "${1}_${2}")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_statistic_names() {
        assert_eq!(camel_to_snake("FullLoadProgressPercent"), "full_load_progress_percent");
        assert_eq!(camel_to_snake("ElapsedTimeMillis"), "elapsed_time_millis");
        assert_eq!(camel_to_snake("TablesLoaded"), "tables_loaded");
        assert_eq!(camel_to_snake("FreshStartDate"), "fresh_start_date");
    }

    #[test]
    fn test_acronyms() {
        assert_eq!(camel_to_snake("CDCLatencySource"), "cdc_latency_source");
        assert_eq!(camel_to_snake("HTTPResponse"), "http_response");
    }

    proptest! {
        #[test]
        fn prop_snake_case_is_fixed_point(name in "[a-z][a-z0-9_]{0,20}") {
            prop_assert_eq!(camel_to_snake(&name), name);
        }

        #[test]
        fn prop_output_has_no_uppercase(name in "[A-Za-z0-9]{1,24}") {
            let normalised = camel_to_snake(&name);
            prop_assert!(!normalised.chars().any(|c| c.is_ascii_uppercase()));
        }
    }
}
