//! Parser for the generator's shard payloads.
//!
//! A payload is a script fragment of the form
//!
//! ```text
//! var searchData=
//! [
//!   ['size_2',['size',['../clasststl_1_1vector.html#a1b82',1,'tstl::vector::size()']]]
//! ];
//! ```
//!
//! The array literal is read into a [`serde_json::Value`] by a small lexer
//! that understands the JavaScript subset the generator emits (single or
//! double quoted strings, integers, nested arrays, trailing commas), then
//! validated entry by entry. Any deviation fails the whole shard so that a
//! corrupt payload never yields a silently truncated record.

use serde_json::Value;

use crate::error::ShardLoadError;
use crate::shard::record::{LinkKind, Occurrence, ShardRecord, SymbolEntry};

const MAX_DEPTH: usize = 16;

/// Parse a shard payload into a validated [`ShardRecord`].
pub fn parse_shard(shard_id: &str, payload: &str) -> Result<ShardRecord, ShardLoadError> {
    let value = parse_payload(payload).map_err(|e| ShardLoadError::parse(shard_id, e))?;

    let Value::Array(items) = value else {
        return Err(ShardLoadError::parse(shard_id, "payload is not an array"));
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let entry = entry_from_value(index, item).map_err(|e| ShardLoadError::parse(shard_id, e))?;
        entries.push(entry);
    }

    ShardRecord::new(shard_id, entries)
}

/// Read the array literal out of a payload, skipping an optional
/// `var <ident> =` prefix and a trailing `;`.
pub fn parse_payload(payload: &str) -> Result<Value, String> {
    let mut cursor = Cursor::new(payload);
    cursor.skip_ws();
    cursor.skip_assignment()?;
    cursor.skip_ws();

    let value = cursor.parse_value(0)?;

    cursor.skip_ws();
    if cursor.peek() == Some(b';') {
        cursor.pos += 1;
        cursor.skip_ws();
    }
    if cursor.pos != cursor.bytes.len() {
        return Err(format!("unexpected trailing content at byte {}", cursor.pos));
    }

    Ok(value)
}

/// Decode a single quoted JavaScript string literal, quotes included.
pub(crate) fn parse_string_literal(literal: &str) -> Result<String, String> {
    let mut cursor = Cursor::new(literal);
    let quote = cursor
        .peek()
        .filter(|b| *b == b'\'' || *b == b'"')
        .ok_or_else(|| "expected a quoted string".to_string())?;
    let value = cursor.parse_string(quote)?;
    if cursor.pos != cursor.bytes.len() {
        return Err(format!("unexpected content after string at byte {}", cursor.pos));
    }
    Ok(value)
}

/// Quote a string the way the generator does.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

fn entry_from_value(index: usize, value: Value) -> Result<SymbolEntry, String> {
    let Value::Array(mut fields) = value else {
        return Err(format!("entry {index} is not an array"));
    };
    if fields.len() != 2 {
        return Err(format!(
            "entry {index} has {} fields, expected [key, [label, occurrences...]]",
            fields.len()
        ));
    }

    let body = fields.pop().unwrap_or(Value::Null);
    let key = match fields.pop() {
        Some(Value::String(key)) if !key.is_empty() => key,
        _ => return Err(format!("entry {index} has no string key")),
    };

    let Value::Array(body) = body else {
        return Err(format!("entry {index} ('{key}') body is not an array"));
    };
    let mut body = body.into_iter();

    let label = match body.next() {
        Some(Value::String(label)) => label,
        _ => return Err(format!("entry {index} ('{key}') has no string label")),
    };

    let mut occurrences = Vec::new();
    for (position, raw) in body.enumerate() {
        let occurrence = occurrence_from_value(raw)
            .map_err(|e| format!("entry {index} ('{key}') occurrence {position}: {e}"))?;
        occurrences.push(occurrence);
    }
    if occurrences.is_empty() {
        return Err(format!("entry {index} ('{key}') has no occurrences"));
    }

    Ok(SymbolEntry::new(key, label, occurrences))
}

fn occurrence_from_value(value: Value) -> Result<Occurrence, String> {
    let Value::Array(fields) = value else {
        return Err("not an array".to_string());
    };
    match fields.as_slice() {
        [Value::String(target), Value::Number(flag), Value::String(qualified)] => {
            let link_kind = flag
                .as_i64()
                .and_then(LinkKind::from_flag)
                .ok_or_else(|| format!("invalid link flag {flag}"))?;
            Ok(Occurrence::new(target.as_str(), qualified.as_str()).with_link_kind(link_kind))
        }
        _ => Err(format!(
            "expected [target, flag, qualified label], got {} fields",
            fields.len()
        )),
    }
}

struct Cursor<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn skip_assignment(&mut self) -> Result<(), String> {
        if !self.src[self.pos..].starts_with("var") {
            return Ok(());
        }
        let eq = self.src[self.pos..]
            .find('=')
            .ok_or_else(|| "assignment without '='".to_string())?;
        let ident = self.src[self.pos + 3..self.pos + eq].trim();
        if ident.is_empty() || !ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            return Err(format!("invalid assignment target '{ident}'"));
        }
        self.pos += eq + 1;
        Ok(())
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, String> {
        if depth > MAX_DEPTH {
            return Err(format!("nesting too deep at byte {}", self.pos));
        }
        self.skip_ws();
        match self.peek() {
            Some(b'[') => self.parse_array(depth),
            Some(q @ (b'\'' | b'"')) => self.parse_string(q).map(Value::String),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(b) => Err(format!("unexpected '{}' at byte {}", b as char, self.pos)),
            None => Err("unexpected end of payload".to_string()),
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, String> {
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_ws();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                None => return Err("unterminated array".to_string()),
                _ => {}
            }

            items.push(self.parse_value(depth + 1)?);

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {}
                Some(b) => {
                    return Err(format!(
                        "expected ',' or ']' but found '{}' at byte {}",
                        b as char, self.pos
                    ));
                }
                None => return Err("unterminated array".to_string()),
            }
        }
    }

    fn parse_string(&mut self, quote: u8) -> Result<String, String> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();

        loop {
            let rest = &self.src[self.pos..];
            let Some(ch) = rest.chars().next() else {
                return Err(format!("unterminated string starting at byte {start}"));
            };
            self.pos += ch.len_utf8();

            match ch {
                c if c as u32 == quote as u32 => return Ok(out),
                '\\' => out.push(self.parse_escape()?),
                '\n' => return Err(format!("newline inside string starting at byte {start}")),
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, String> {
        let Some(b) = self.peek() else {
            return Err("unterminated escape sequence".to_string());
        };
        self.pos += 1;
        match b {
            b'\\' => Ok('\\'),
            b'\'' => Ok('\''),
            b'"' => Ok('"'),
            b'/' => Ok('/'),
            b'n' => Ok('\n'),
            b'r' => Ok('\r'),
            b't' => Ok('\t'),
            b'b' => Ok('\u{8}'),
            b'f' => Ok('\u{c}'),
            b'u' => {
                let high = self.parse_hex4()?;
                if (0xD800..0xDC00).contains(&high) {
                    if !self.src[self.pos..].starts_with("\\u") {
                        return Err(format!("unpaired surrogate at byte {}", self.pos));
                    }
                    self.pos += 2;
                    let low = self.parse_hex4()?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(format!("invalid low surrogate at byte {}", self.pos));
                    }
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(code).ok_or_else(|| format!("invalid code point {code:#x}"))
                } else {
                    char::from_u32(high).ok_or_else(|| format!("invalid code point {high:#x}"))
                }
            }
            other => Err(format!(
                "unknown escape '\\{}' at byte {}",
                other as char,
                self.pos - 1
            )),
        }
    }

    fn parse_hex4(&mut self) -> Result<u32, String> {
        let digits = self
            .src
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| "truncated \\u escape".to_string())?;
        let code = u32::from_str_radix(digits, 16)
            .map_err(|_| format!("invalid \\u escape '{digits}' at byte {}", self.pos))?;
        self.pos += 4;
        Ok(code)
    }

    fn parse_number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        text.parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("invalid number '{text}' at byte {start}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE_SHARD: &str = "var searchData=\n[\n  ['size_2',['size',['../clasststl_1_1vector.html#a1b82',1,'tstl::vector::size()'],['../clasststl_1_1stack.html#a6c59',1,'tstl::stack::size()'],['../clasststl_1_1deque.html#abd7e',1,'tstl::deque::size()']]],\n  ['size_5ftype_3',['size_type',['../clasststl_1_1vector.html#abed8',1,'tstl::vector::size_type()']]],\n  ['stack_2ehpp_7',['stack.hpp',['../stack_8hpp.html',1,'']]]\n];\n";

    #[test]
    fn test_parse_generator_payload() {
        let record = parse_shard("all_11", SIZE_SHARD).unwrap();

        assert_eq!(record.shard_id(), "all_11");
        assert_eq!(record.len(), 3);

        let size = record.get("size_2").unwrap();
        assert_eq!(size.label, "size");
        assert_eq!(size.occurrences.len(), 3);
        assert_eq!(size.occurrences[1].qualified_label, "tstl::stack::size()");
        assert_eq!(size.occurrences[1].link_kind, LinkKind::Internal);

        let file = record.get("stack_2ehpp_7").unwrap();
        assert_eq!(file.occurrences[0].qualified_label, "");
        assert_eq!(file.occurrences[0].anchor(), None);
    }

    #[test]
    fn test_wire_round_trip_preserves_tuples() {
        let record = parse_shard("all_11", SIZE_SHARD).unwrap();
        let wire = record.to_wire();

        assert_eq!(wire, SIZE_SHARD);

        let reparsed = parse_shard("all_11", &wire).unwrap();
        let before: Vec<_> = record.tuples().collect();
        let after: Vec<_> = reparsed.tuples().collect();
        assert_eq!(before, after);
        assert_eq!(record, reparsed);
    }

    #[test]
    fn test_accepts_plain_json_array() {
        let payload = r#"[["abs_0",["abs",["../namespacetstl.html#a1",0,"tstl::abs()"]]]]"#;
        let record = parse_shard("all_1", payload).unwrap();
        assert_eq!(record.entries()[0].occurrences[0].link_kind, LinkKind::External);
    }

    #[test]
    fn test_escapes_and_trailing_commas() {
        let payload = "[['it_0',['it\\'s',['a.html#x',1,'ns::it\\u0027s()'],],],]";
        let record = parse_shard("all_8", payload).unwrap();
        let entry = &record.entries()[0];
        assert_eq!(entry.label, "it's");
        assert_eq!(entry.occurrences[0].qualified_label, "ns::it's()");

        let reparsed = parse_shard("all_8", &record.to_wire()).unwrap();
        assert_eq!(record, reparsed);
    }

    #[test]
    fn test_rejects_duplicate_key() {
        let payload = "[['swap_8',['swap',['a.html',1,'a::swap()']]],['swap_8',['swap',['b.html',1,'b::swap()']]]]";
        let err = parse_shard("all_11", payload).unwrap_err();
        assert!(matches!(err, ShardLoadError::Parse { .. }));
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let cases = [
            "[['swap_8']]",
            "[['swap_8',['swap',['a.html',1,'a::swap()']],'extra']]",
            "[['swap_8',['swap']]]",
            "[['swap_8',['swap',['a.html',1]]]]",
            "[['swap_8',['swap',['a.html','1','a::swap()']]]]",
            "[['swap_8',['swap',['a.html',7,'a::swap()']]]]",
            "[[1,['swap',['a.html',1,'a::swap()']]]]",
        ];
        for payload in cases {
            let result = parse_shard("all_11", payload);
            assert!(result.is_err(), "payload should fail: {payload}");
        }
    }

    #[test]
    fn test_rejects_empty_and_truncated_payloads() {
        assert!(parse_shard("all_0", "var searchData=\n[\n];").is_err());
        assert!(parse_shard("all_0", "var searchData=[['a_0',['a',['a.html',1,'a']]]").is_err());
        assert!(parse_shard("all_0", "[['a_0',['a',['a.html',1,'a']]]] trailing").is_err());
        assert!(parse_shard("all_0", "").is_err());
    }

    #[test]
    fn test_rejects_excessive_nesting() {
        let payload = format!("{}{}", "[".repeat(64), "]".repeat(64));
        assert!(parse_payload(&payload).is_err());
    }

    #[test]
    fn test_parse_string_literal() {
        assert_eq!(parse_string_literal("\"_abc~\"").unwrap(), "_abc~");
        assert_eq!(parse_string_literal("'\\u00e9'").unwrap(), "é");
        assert!(parse_string_literal("\"open").is_err());
        assert!(parse_string_literal("bare").is_err());
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("it's"), "'it\\'s'");
        assert_eq!(quote("a\\b"), "'a\\\\b'");
    }
}
