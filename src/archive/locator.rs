use crate::types::OwnedCollection;

/// Finds the archive playlist named `target_name` among `collections`.
///
/// Only playlists owned by `owner_id` match, and the name comparison is exact
/// and case-sensitive. The whole listing must be passed in. When several
/// owned playlists share the name, the first in listing order wins.
pub fn find_existing<'a>(
    collections: &'a [OwnedCollection],
    target_name: &str,
    owner_id: &str,
) -> Option<&'a str> {
    let mut matches = collections
        .iter()
        .filter(|c| c.owner_id == owner_id && c.name == target_name);

    let found = matches.next()?;
    let duplicates = matches.count();
    if duplicates > 0 {
        tracing::warn!(
            archive_name = target_name,
            chosen = %found.id,
            duplicates,
            "several owned playlists share the archive name, using the first"
        );
    }

    Some(found.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(id: &str, name: &str, owner: &str) -> OwnedCollection {
        OwnedCollection {
            id: id.to_string(),
            name: name.to_string(),
            owner_id: owner.to_string(),
            item_count: 0,
            is_public: false,
        }
    }

    #[test]
    fn ignores_playlists_of_other_owners() {
        let listing = vec![
            collection("theirs", "Mix (Cumulative)", "someone-else"),
            collection("mine", "Mix (Cumulative)", "me"),
        ];
        assert_eq!(find_existing(&listing, "Mix (Cumulative)", "me"), Some("mine"));
    }

    #[test]
    fn name_match_is_exact_and_case_sensitive() {
        let listing = vec![
            collection("a", "mix (cumulative)", "me"),
            collection("b", "Mix (Cumulative) ", "me"),
        ];
        assert_eq!(find_existing(&listing, "Mix (Cumulative)", "me"), None);
    }

    #[test]
    fn first_owned_match_wins() {
        let listing = vec![
            collection("other", "Something", "me"),
            collection("first", "Mix (Cumulative)", "me"),
            collection("second", "Mix (Cumulative)", "me"),
        ];
        assert_eq!(find_existing(&listing, "Mix (Cumulative)", "me"), Some("first"));
    }

    #[test]
    fn empty_listing_finds_nothing() {
        assert_eq!(find_existing(&[], "Mix (Cumulative)", "me"), None);
    }
}
