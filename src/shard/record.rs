//! In-memory representation of a parsed shard.

use std::borrow::Cow;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::error::ShardLoadError;
use crate::shard::parser::quote;

/// How the renderer should open an occurrence's target.
///
/// Encoded on the wire as `1` (a page of the same documentation set) or `0`
/// (a page pulled in from an external tag file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Internal,
    External,
}

impl LinkKind {
    /// Decode the wire flag.
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            1 => Some(LinkKind::Internal),
            0 => Some(LinkKind::External),
            _ => None,
        }
    }

    /// Encode the wire flag.
    pub fn flag(self) -> u8 {
        match self {
            LinkKind::Internal => 1,
            LinkKind::External => 0,
        }
    }
}

/// One concrete location where a symbol appears.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    /// Page URL plus optional `#anchor`. Never interpreted by search.
    pub target: String,

    /// Fully-qualified owner and member, e.g. `tstl::vector::size()`.
    /// May be empty for file-level entries.
    pub qualified_label: String,

    pub link_kind: LinkKind,
}

impl Occurrence {
    pub fn new<T: Into<String>, Q: Into<String>>(target: T, qualified_label: Q) -> Self {
        Self {
            target: target.into(),
            qualified_label: qualified_label.into(),
            link_kind: LinkKind::Internal,
        }
    }

    pub fn with_link_kind(mut self, link_kind: LinkKind) -> Self {
        self.link_kind = link_kind;
        self
    }

    /// The page part of the target (everything before `#`).
    pub fn page(&self) -> &str {
        match self.target.split_once('#') {
            Some((page, _)) => page,
            None => &self.target,
        }
    }

    /// The in-page anchor, if the target has one.
    pub fn anchor(&self) -> Option<&str> {
        self.target.split_once('#').map(|(_, anchor)| anchor)
    }

    /// Qualified label with HTML entities decoded.
    pub fn display_qualified(&self) -> Cow<'_, str> {
        decode_entities(&self.qualified_label)
    }
}

/// One search-key record within a shard.
///
/// `key` is an opaque per-shard identifier (`size_2`). Its numeric suffix is
/// positional and must never be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolEntry {
    pub key: String,

    /// Display label as emitted by the generator (HTML entities intact).
    pub label: String,

    pub occurrences: Vec<Occurrence>,

    #[serde(skip)]
    match_label: String,
}

impl SymbolEntry {
    pub fn new<K: Into<String>, L: Into<String>>(
        key: K,
        label: L,
        occurrences: Vec<Occurrence>,
    ) -> Self {
        let label = label.into();
        let match_label = decode_entities(&label).to_lowercase();
        Self {
            key: key.into(),
            label,
            occurrences,
            match_label,
        }
    }

    /// Decoded, lowercased label used for prefix matching.
    pub fn match_label(&self) -> &str {
        &self.match_label
    }

    /// Label with HTML entities decoded.
    pub fn display_label(&self) -> Cow<'_, str> {
        decode_entities(&self.label)
    }
}

/// A parsed, immutable shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardRecord {
    shard_id: String,
    entries: Vec<SymbolEntry>,
}

impl ShardRecord {
    /// Build a record, enforcing the shard invariants: at least one entry,
    /// at least one occurrence per entry, and unique keys.
    pub fn new<S: Into<String>>(
        shard_id: S,
        entries: Vec<SymbolEntry>,
    ) -> std::result::Result<Self, ShardLoadError> {
        let shard_id = shard_id.into();

        if entries.is_empty() {
            return Err(ShardLoadError::parse(shard_id, "shard has no entries"));
        }

        let mut seen = AHashSet::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if entry.occurrences.is_empty() {
                return Err(ShardLoadError::parse(
                    shard_id,
                    format!("entry {index} ('{}') has no occurrences", entry.key),
                ));
            }
            if !seen.insert(entry.key.as_str()) {
                return Err(ShardLoadError::parse(
                    shard_id,
                    format!("duplicate key '{}' at entry {index}", entry.key),
                ));
            }
        }

        Ok(Self { shard_id, entries })
    }

    pub fn shard_id(&self) -> &str {
        &self.shard_id
    }

    /// Entries in generator emission order.
    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its key.
    pub fn get(&self, key: &str) -> Option<&SymbolEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Total number of occurrences across all entries.
    pub fn occurrence_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.occurrences.len()).sum()
    }

    /// Flatten into `(key, label, qualified_label, target)` tuples in order.
    pub fn tuples(&self) -> impl Iterator<Item = (&str, &str, &str, &str)> {
        self.entries.iter().flat_map(|entry| {
            entry.occurrences.iter().map(move |occurrence| {
                (
                    entry.key.as_str(),
                    entry.label.as_str(),
                    occurrence.qualified_label.as_str(),
                    occurrence.target.as_str(),
                )
            })
        })
    }

    /// Serialize back into the generator's `var searchData=[...]` layout.
    pub fn to_wire(&self) -> String {
        let mut out = String::from("var searchData=\n[\n");

        for (index, entry) in self.entries.iter().enumerate() {
            out.push_str("  [");
            out.push_str(&quote(&entry.key));
            out.push_str(",[");
            out.push_str(&quote(&entry.label));
            for occurrence in &entry.occurrences {
                out.push_str(",[");
                out.push_str(&quote(&occurrence.target));
                out.push(',');
                out.push_str(&occurrence.link_kind.flag().to_string());
                out.push(',');
                out.push_str(&quote(&occurrence.qualified_label));
                out.push(']');
            }
            out.push_str("]]");
            if index + 1 < self.entries.len() {
                out.push(',');
            }
            out.push('\n');
        }

        out.push_str("];\n");
        out
    }
}

/// Decode the HTML entities the generator emits in labels.
///
/// Unknown entities are left untouched.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let decoded = tail.find(';').and_then(|end| {
            let name = &tail[1..end];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => name
                    .strip_prefix("#x")
                    .or_else(|| name.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, end + 1))
        });

        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, label: &str, targets: &[&str]) -> SymbolEntry {
        SymbolEntry::new(
            key,
            label,
            targets
                .iter()
                .map(|target| Occurrence::new(*target, format!("tstl::{label}()")))
                .collect(),
        )
    }

    #[test]
    fn test_record_rejects_duplicate_keys() {
        let result = ShardRecord::new(
            "all_11",
            vec![
                entry("size_2", "size", &["a.html#1"]),
                entry("size_2", "size", &["b.html#2"]),
            ],
        );

        match result {
            Err(ShardLoadError::Parse { shard_id, message }) => {
                assert_eq!(shard_id, "all_11");
                assert!(message.contains("duplicate key 'size_2'"));
            }
            other => panic!("Expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_record_rejects_empty_shard() {
        assert!(ShardRecord::new("all_0", Vec::new()).is_err());
    }

    #[test]
    fn test_record_rejects_entry_without_occurrences() {
        let result = ShardRecord::new("all_0", vec![entry("abs_0", "abs", &[])]);
        assert!(result.is_err());
    }

    #[test]
    fn test_label_collisions_are_allowed() {
        let record = ShardRecord::new(
            "all_11",
            vec![
                entry("size_2", "size", &["vector.html#a1"]),
                entry("size_9", "size", &["stack.html#a2"]),
            ],
        )
        .unwrap();

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("size_9").unwrap().occurrences[0].page(), "stack.html");
    }

    #[test]
    fn test_occurrence_target_parts() {
        let occurrence = Occurrence::new("../clasststl_1_1vector.html#a1b8", "tstl::vector::size()");
        assert_eq!(occurrence.page(), "../clasststl_1_1vector.html");
        assert_eq!(occurrence.anchor(), Some("a1b8"));

        let file = Occurrence::new("../stack_8hpp.html", "");
        assert_eq!(file.page(), "../stack_8hpp.html");
        assert_eq!(file.anchor(), None);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_entities("tstl::stack&lt; T, Container &gt;"),
            "tstl::stack< T, Container >"
        );
        assert_eq!(decode_entities("list &amp;&amp;rhs"), "list &&rhs");
        assert_eq!(decode_entities("&#39;x&#x41;"), "'xA");
        assert_eq!(decode_entities("a & b &bogus;"), "a & b &bogus;");
        assert!(matches!(decode_entities("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_match_label_is_decoded_and_lowercased() {
        let entry = SymbolEntry::new(
            "operator_3c_0",
            "Operator&lt;",
            vec![Occurrence::new("x.html", "")],
        );
        assert_eq!(entry.match_label(), "operator<");
        assert_eq!(entry.display_label(), "Operator<");
    }

    #[test]
    fn test_tuples_follow_emission_order() {
        let record = ShardRecord::new(
            "all_11",
            vec![
                entry("swap_8", "swap", &["m.html#1", "r.html#2"]),
                entry("sort_4", "sort", &["n.html#3"]),
            ],
        )
        .unwrap();

        let targets: Vec<&str> = record.tuples().map(|(_, _, _, target)| target).collect();
        assert_eq!(targets, vec!["m.html#1", "r.html#2", "n.html#3"]);
        assert_eq!(record.occurrence_count(), 3);
    }
}
