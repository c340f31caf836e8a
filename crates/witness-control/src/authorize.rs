//! Authorization set merging.

use std::collections::HashSet;

/// Merge tenant-authorized identities into the operator's fixed set.
///
/// Fixed entries keep their order; tenant entries not already present follow
/// in submission order. Nothing is ever removed.
#[must_use]
pub fn merge(fixed: &[String], tenant: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(fixed.len() + tenant.len());
    let mut merged = Vec::with_capacity(fixed.len() + tenant.len());

    for entry in fixed.iter().chain(tenant) {
        if seen.insert(entry.as_str()) {
            merged.push(entry.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn fixed_first_then_new_tenant_entries() {
        let merged = merge(&strings(&["a", "b"]), &strings(&["c", "a", "d"]));
        assert_eq!(merged, strings(&["a", "b", "c", "d"]));
    }

    #[test]
    fn empty_inputs() {
        assert!(merge(&[], &[]).is_empty());
        assert_eq!(merge(&[], &strings(&["x", "x"])), strings(&["x"]));
    }

    #[test]
    fn comparison_is_exact() {
        let merged = merge(&strings(&["Abc"]), &strings(&["abc", "Abc "]));
        assert_eq!(merged.len(), 3);
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(
            fixed in prop::collection::vec("[a-d]{1,2}", 0..8),
            tenant in prop::collection::vec("[a-d]{1,2}", 0..8),
        ) {
            let once = merge(&fixed, &tenant);
            prop_assert_eq!(merge(&once, &tenant), once);
        }

        #[test]
        fn merge_has_no_duplicates(
            fixed in prop::collection::vec("[a-d]{1,2}", 0..8),
            tenant in prop::collection::vec("[a-d]{1,2}", 0..8),
        ) {
            let merged = merge(&fixed, &tenant);
            let unique: HashSet<&String> = merged.iter().collect();
            prop_assert_eq!(unique.len(), merged.len());
            prop_assert!(merged.len() <= fixed.len() + tenant.len());
        }

        #[test]
        fn merge_never_removes(
            fixed in prop::collection::vec("[a-d]{1,2}", 0..8),
            tenant in prop::collection::vec("[a-d]{1,2}", 0..8),
        ) {
            let merged = merge(&fixed, &tenant);
            for entry in fixed.iter().chain(&tenant) {
                prop_assert!(merged.contains(entry));
            }
        }
    }
}
