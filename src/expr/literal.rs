//! Depth-aware splitting of argument lists and object literals
//!
//! Directive arguments such as `'card', { title: user.name, tags: ['a', 'b'] }`
//! are split on top-level separators only; separators inside quotes or any
//! `()`, `[]` or `{}` nesting are kept with their fragment.

/// Split `input` on every `sep` that sits outside quotes and brackets
///
/// Fragments are trimmed. An empty or all-whitespace input yields no
/// fragments.
pub fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(input[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    let last = input[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

/// Split at the first top-level `sep`, returning the two trimmed halves
pub fn split_once_top_level(input: &str, sep: char) -> Option<(&str, &str)> {
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                return Some((input[..i].trim(), input[i + c.len_utf8()..].trim()));
            }
            _ => {}
        }
    }
    None
}

/// Return the contents of a quoted string literal, or `None` if `text` is
/// not exactly one quoted literal
pub fn string_literal(text: &str) -> Option<String> {
    let text = text.trim();
    let mut chars = text.chars();
    let open = chars.next()?;
    if (open != '\'' && open != '"') || text.len() < 2 || !text.ends_with(open) {
        return None;
    }
    // Reject `'a' + 'b'` style input: the closing quote must be the first
    // unescaped occurrence after the opening one.
    let inner = &text[1..text.len() - 1];
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == open {
            return None;
        }
    }
    if escaped {
        return None;
    }
    Some(crate::expr::lexer::unquote(text))
}

/// Entries of an object literal `{ key: expr, 'other key': expr }`
///
/// Keys are unquoted; values are returned as raw expression text. Returns
/// `None` when the text is not brace-delimited or an entry has no key.
pub fn object_entries(text: &str) -> Option<Vec<(String, &str)>> {
    let body = text.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut entries = Vec::new();
    for entry in split_top_level(body, ',') {
        if entry.is_empty() {
            continue;
        }
        let (key, value) = split_once_top_level(entry, ':')?;
        let key = string_literal(key).unwrap_or_else(|| key.to_string());
        if key.is_empty() || value.is_empty() {
            return None;
        }
        entries.push((key, value));
    }
    Some(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_respects_nesting() {
        let parts = split_top_level("'card', { a: 1, b: [2, 3] }, (x, y)", ',');
        assert_eq!(parts, vec!["'card'", "{ a: 1, b: [2, 3] }", "(x, y)"]);
    }

    #[test]
    fn test_split_respects_quotes() {
        let parts = split_top_level(r#"'a, b', "c\", d", e"#, ',');
        assert_eq!(parts, vec!["'a, b'", r#""c\", d""#, "e"]);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_top_level("   ", ',').is_empty());
        assert_eq!(split_top_level("a,", ','), vec!["a", ""]);
    }

    #[test]
    fn test_split_once() {
        assert_eq!(
            split_once_top_level("label: a ? 'x:y' : b", ':'),
            Some(("label", "a ? 'x:y' : b"))
        );
        assert_eq!(split_once_top_level("no separator", ':'), None);
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("'layout'"), Some("layout".to_string()));
        assert_eq!(string_literal(r#" "a.b" "#), Some("a.b".to_string()));
        assert_eq!(string_literal("'a' + 'b'"), None);
        assert_eq!(string_literal("name"), None);
        assert_eq!(string_literal("'"), None);
    }

    #[test]
    fn test_object_entries() {
        let entries = object_entries("{ title: user.name, 'css class': 'big', nested: {a: 1, b: 2} }")
            .expect("Should split");
        assert_eq!(
            entries,
            vec![
                ("title".to_string(), "user.name"),
                ("css class".to_string(), "'big'"),
                ("nested".to_string(), "{a: 1, b: 2}"),
            ]
        );
    }

    #[test]
    fn test_object_entries_rejects_malformed() {
        assert!(object_entries("title: x").is_none());
        assert!(object_entries("{ title }").is_none());
        assert_eq!(object_entries("{}"), Some(vec![]));
    }
}
