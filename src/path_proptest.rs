//! Property-based tests for path manipulation functions.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{domain_from_url, full_path, relative};
    use proptest::prelude::*;

    // ============================================================================
    // full_path property tests
    // ============================================================================

    proptest! {
        /// Property: the result always has exactly one leading separator
        #[test]
        fn full_path_has_single_root(start in "[a-z/]{0,20}", end in "[a-z/]{0,20}") {
            let result = full_path(&start, &end);
            prop_assert!(result.starts_with('/'));
            prop_assert!(!result.starts_with("//"));
        }

        /// Property: no empty segments survive normalization
        #[test]
        fn full_path_has_no_empty_segments(start in "[a-z/]{0,20}", end in "[a-z/]{0,20}") {
            let result = full_path(&start, &end);
            prop_assert!(!result.contains("//"), "found empty segment in {}", result);
            if result != "/" {
                prop_assert!(!result.ends_with('/'));
            }
        }

        /// Property: normalizing an already-normalized path is a no-op
        #[test]
        fn full_path_is_idempotent(start in "[a-z./]{0,20}", end in "[a-z./]{0,20}") {
            let once = full_path(&start, &end);
            prop_assert_eq!(full_path(&once, ""), once.clone());
            prop_assert_eq!(full_path("", &once), once.clone());
            prop_assert_eq!(full_path("/", &once), once);
        }

        /// Property: the non-empty segments of both inputs are kept in order
        #[test]
        fn full_path_preserves_segments(
            a in proptest::collection::vec("[a-z0-9]{1,5}", 0..4),
            b in proptest::collection::vec("[a-z0-9]{1,5}", 0..4),
        ) {
            let start = format!("//{}/", a.join("//"));
            let end = format!("/{}//", b.join("/"));
            let expected: Vec<String> = a.iter().chain(b.iter()).cloned().collect();
            prop_assert_eq!(full_path(&start, &end), format!("/{}", expected.join("/")));
        }

        /// Property: relative() of a normalized path never starts with a separator
        #[test]
        fn relative_strips_root(start in "[a-z/]{0,20}", end in "[a-z/]{0,20}") {
            let normalized = full_path(&start, &end);
            prop_assert!(!relative(&normalized).starts_with('/'));
        }
    }

    // ============================================================================
    // domain_from_url property tests
    // ============================================================================

    proptest! {
        /// Property: https URLs yield their host
        #[test]
        fn https_url_yields_host(host in "[a-z]{1,10}\\.(com|org|io)", repo in "[a-z]{1,10}") {
            let url = format!("https://{}/team/{}.git", host, repo);
            prop_assert_eq!(domain_from_url(&url).unwrap(), host);
        }

        /// Property: scp-like remotes yield the part between '@' and ':'
        #[test]
        fn scp_remote_yields_host(host in "[a-z]{1,10}\\.(com|org|io)", repo in "[a-z]{1,10}") {
            let url = format!("git@{}:team/{}.git", host, repo);
            prop_assert_eq!(domain_from_url(&url).unwrap(), host);
        }

        /// Property: bare words are never accepted as repository URLs
        #[test]
        fn bare_words_are_invalid(word in "[a-z]{1,12}") {
            prop_assert!(domain_from_url(&word).is_err());
        }
    }
}
