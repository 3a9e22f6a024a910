//! Catalog filters.
//!
//! Every filter returns an order-preserving subsequence of its input and is
//! idempotent: filtering a filtered catalog with the same arguments returns
//! it unchanged.

use serde::{Deserialize, Serialize};

use fileshare_core::types::{Catalog, Identity};

/// Entries recorded by `owner`.
pub fn filter_by_owner(catalog: &Catalog, owner: &Identity) -> Catalog {
    catalog.filtered(|entry| &entry.owner == owner)
}

/// Entries whose name contains `substring`.
///
/// An empty substring matches every entry. Case-insensitive matching folds
/// both sides with Unicode lowercase.
pub fn filter_by_name_contains(catalog: &Catalog, substring: &str, case_insensitive: bool) -> Catalog {
    if substring.is_empty() {
        return catalog.clone();
    }

    if case_insensitive {
        let needle = substring.to_lowercase();
        catalog.filtered(|entry| entry.name.to_lowercase().contains(&needle))
    } else {
        catalog.filtered(|entry| entry.name.contains(substring))
    }
}

/// A combined owner and name query, as accepted by the outer surfaces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Restrict to this owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Identity>,
    /// Restrict to names containing this substring (case-insensitive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CatalogQuery {
    /// Query matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to an owner.
    pub fn with_owner(mut self, owner: Identity) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Restricts to a name substring.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Applies the owner filter, then the name filter.
    pub fn apply(&self, catalog: &Catalog) -> Catalog {
        let by_owner = match &self.owner {
            Some(owner) => filter_by_owner(catalog, owner),
            None => catalog.clone(),
        };
        match &self.name {
            Some(name) => filter_by_name_contains(&by_owner, name, true),
            None => by_owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshare_core::types::{ContentAddress, FileEntry};
    use proptest::prelude::*;
    use test_case::test_case;

    fn identity(n: u8) -> Identity {
        Identity::new(format!("0x{:040x}", n)).unwrap()
    }

    fn catalog_of(items: &[(u8, &str)]) -> Catalog {
        Catalog::from_entries(
            items
                .iter()
                .enumerate()
                .map(|(i, (owner, name))| {
                    FileEntry::new(
                        i as u64 + 1,
                        identity(*owner),
                        *name,
                        ContentAddress::parse(format!("bafk{}", i)).unwrap(),
                    )
                })
                .collect(),
        )
    }

    fn names(catalog: &Catalog) -> Vec<&str> {
        catalog.iter().map(|e| e.name.as_str()).collect()
    }

    fn sample() -> Catalog {
        catalog_of(&[(1, "doc.txt"), (2, "image.png"), (1, "Document.md")])
    }

    #[test_case("DOC", true, &["doc.txt", "Document.md"] ; "case insensitive upper")]
    #[test_case("doc", true, &["doc.txt", "Document.md"] ; "case insensitive lower")]
    #[test_case("doc", false, &["doc.txt"] ; "case sensitive")]
    #[test_case("", true, &["doc.txt", "image.png", "Document.md"] ; "empty matches all")]
    #[test_case("", false, &["doc.txt", "image.png", "Document.md"] ; "empty matches all sensitive")]
    #[test_case(".png", true, &["image.png"] ; "extension")]
    #[test_case("zip", true, &[] ; "no match")]
    fn test_filter_by_name(substring: &str, case_insensitive: bool, expected: &[&str]) {
        let result = filter_by_name_contains(&sample(), substring, case_insensitive);
        assert_eq!(names(&result), expected);
    }

    #[test]
    fn test_filter_by_owner_keeps_indices() {
        let result = filter_by_owner(&sample(), &identity(1));
        let indices: Vec<u64> = result.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(filter_by_owner(&sample(), &identity(7)).is_empty());
    }

    #[test]
    fn test_query_combines_filters() {
        let query = CatalogQuery::new().with_owner(identity(1)).with_name("MD");
        assert_eq!(names(&query.apply(&sample())), vec!["Document.md"]);
        assert_eq!(CatalogQuery::new().apply(&sample()), sample());
    }

    fn arb_catalog() -> impl Strategy<Value = Catalog> {
        prop::collection::vec((0u8..3, "[a-zA-Z.]{0,6}"), 0..24).prop_map(|items| {
            let borrowed: Vec<(u8, &str)> = items.iter().map(|(o, n)| (*o, n.as_str())).collect();
            catalog_of(&borrowed)
        })
    }

    proptest! {
        #[test]
        fn prop_name_filter_preserves_order(catalog in arb_catalog(), needle in "[a-zA-Z.]{0,2}") {
            let once = filter_by_name_contains(&catalog, &needle, true);
            prop_assert!(once.is_ascending());
            prop_assert!(once.iter().all(|e| catalog.get(e.index) == Some(e)));
            prop_assert_eq!(filter_by_name_contains(&once, &needle, true), once.clone());

            let expected = catalog
                .iter()
                .filter(|e| e.name.to_lowercase().contains(&needle.to_lowercase()))
                .count();
            prop_assert_eq!(once.len(), expected);
        }

        #[test]
        fn prop_owner_filter_preserves_order(catalog in arb_catalog(), owner in 0u8..3) {
            let owner = identity(owner);
            let once = filter_by_owner(&catalog, &owner);
            prop_assert!(once.is_ascending());
            prop_assert!(once.iter().all(|e| e.owner == owner));
            prop_assert_eq!(filter_by_owner(&once, &owner), once.clone());
        }
    }
}
