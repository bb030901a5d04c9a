//! Mention extraction, §4.4. Pure text-scanning logic; resolution against
//! the agent directory and persistence of `Mention` rows is the store's job
//! (`Store::create_mentions`).

use std::collections::HashSet;

use regex::Regex;
use std::sync::OnceLock;

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@([A-Za-z0-9_.-]+)").expect("valid mention regex"))
}

/// Scan `body` for `@handle` tokens per §4.4 step 1. Handles are returned
/// lower-cased (matching is case-insensitive) and de-duplicated, preserving
/// first-seen order.
pub fn extract_handles(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut handles = Vec::new();
    for capture in mention_pattern().captures_iter(body) {
        let handle = capture[1].to_lowercase();
        if seen.insert(handle.clone()) {
            handles.push(handle);
        }
    }
    handles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_multiple_distinct_handles() {
        let handles = extract_handles("cc @dev_a @dev_b @ghost");
        assert_eq!(handles, vec!["dev_a", "dev_b", "ghost"]);
    }

    #[test]
    fn is_case_insensitive_and_deduplicates() {
        let handles = extract_handles("@Dev_A please review, cc @dev_a again");
        assert_eq!(handles, vec!["dev_a"]);
    }

    #[test]
    fn ignores_bare_at_signs_and_emails_without_handles() {
        let handles = extract_handles("email me @ the office, not a handle");
        assert!(handles.is_empty());
    }

    #[test]
    fn allows_dots_underscores_and_hyphens() {
        let handles = extract_handles("ping @qa.lead-2 now");
        assert_eq!(handles, vec!["qa.lead-2"]);
    }
}
