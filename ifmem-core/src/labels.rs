//! Fuzzy item-label matching.
//!
//! Engines and players rarely spell an object the same way twice ("lantern",
//! "brass lantern", "A brass  lantern"). Every comparison of item labels in
//! the store goes through this module so inventory diffs, item inference and
//! removal all share one notion of "the same item":
//!
//! - case-insensitive
//! - whitespace-normalized (runs collapse, edges trimmed)
//! - substring-tolerant in both directions

/// Lowercase and collapse whitespace.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether two labels refer to the same item. Blank labels never match.
#[must_use]
pub fn labels_match(a: &str, b: &str) -> bool {
    let a = normalize_label(a);
    let b = normalize_label(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

/// Index of the first label in `labels` matching `needle`.
#[must_use]
pub fn find_label(labels: &[String], needle: &str) -> Option<usize> {
    labels.iter().position(|label| labels_match(label, needle))
}

/// Remove the first label matching `needle`, returning it.
pub fn remove_label(labels: &mut Vec<String>, needle: &str) -> Option<String> {
    find_label(labels, needle).map(|index| labels.remove(index))
}

/// Compare two inventories as sets under fuzzy matching.
///
/// Every label on each side must match some label on the other side.
#[must_use]
pub fn same_label_set(a: &[String], b: &[String]) -> bool {
    a.iter().all(|label| find_label(b, label).is_some())
        && b.iter().all(|label| find_label(a, label).is_some())
}

/// Append `value` unless an exactly equal string is already present.
///
/// Returns `true` when the value was added. Used for the scene lists that
/// must never hold exact duplicates.
pub fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|existing| existing == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn normalize_collapses_case_and_space() {
        assert_eq!(normalize_label("  A  Brass\tLantern "), "a brass lantern");
    }

    #[test]
    fn match_is_substring_tolerant_both_ways() {
        assert!(labels_match("lantern", "brass lantern"));
        assert!(labels_match("Brass Lantern", "lantern"));
        assert!(labels_match("LEAFLET", "leaflet"));
        assert!(!labels_match("sword", "lantern"));
    }

    #[test]
    fn blank_labels_never_match() {
        assert!(!labels_match("", "lantern"));
        assert!(!labels_match("   ", "  "));
    }

    #[test]
    fn remove_label_takes_first_match() {
        let mut list = labels(&["a rope", "brass lantern", "lantern oil"]);
        let removed = remove_label(&mut list, "lantern");
        assert_eq!(removed.as_deref(), Some("brass lantern"));
        assert_eq!(list, labels(&["a rope", "lantern oil"]));
        assert!(remove_label(&mut list, "sword").is_none());
    }

    #[test]
    fn label_sets_compare_fuzzily() {
        let a = labels(&["brass lantern", "leaflet"]);
        let b = labels(&["Leaflet", "lantern"]);
        assert!(same_label_set(&a, &b));
        assert!(!same_label_set(&a, &labels(&["leaflet"])));
        assert!(same_label_set(&[], &[]));
    }

    #[test]
    fn push_unique_is_exact() {
        let mut list = Vec::new();
        assert!(push_unique(&mut list, "mailbox"));
        assert!(!push_unique(&mut list, "mailbox"));
        assert!(push_unique(&mut list, "Mailbox"));
        assert_eq!(list.len(), 2);
    }
}
