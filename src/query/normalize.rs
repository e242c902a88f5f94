//! Query normalization and label matching.

use crate::shard::record::SymbolEntry;

/// Trim surrounding whitespace and lowercase.
pub fn normalize_query(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Length in Unicode scalar values, the unit the minimum query length uses.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Whether the entry's label starts with an already-normalized query.
pub fn label_matches(entry: &SymbolEntry, normalized_query: &str) -> bool {
    entry.match_label().starts_with(normalized_query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::record::Occurrence;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  SiZe \t"), "size");
        assert_eq!(normalize_query("Ünï"), "ünï");
        assert_eq!(normalize_query("   "), "");
    }

    #[test]
    fn test_char_len_counts_scalars() {
        assert_eq!(char_len("ab"), 2);
        assert_eq!(char_len("é"), 1);
    }

    #[test]
    fn test_label_matches_is_prefix_only() {
        let entry = SymbolEntry::new(
            "size_5ftype_3",
            "size_type",
            vec![Occurrence::new("v.html#a", "tstl::vector::size_type()")],
        );

        assert!(label_matches(&entry, "size"));
        assert!(label_matches(&entry, "size_type"));
        assert!(!label_matches(&entry, "type"));
        assert!(!label_matches(&entry, "size_types"));
    }

    #[test]
    fn test_label_matches_ignores_case() {
        let entry = SymbolEntry::new("list_0", "List", vec![Occurrence::new("l.html", "")]);
        assert!(label_matches(&entry, &normalize_query("LI")));
    }
}
