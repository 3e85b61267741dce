//! iCalendar (RFC 5545 subset) interchange
//!
//! - `export`: serialize stored events into a VCALENDAR document
//! - `import`: parse a VCALENDAR document back into events
//!
//! Only stored shapes are exchanged: plain events, recurring bases and
//! overrides. Synthesized occurrences are never written.

pub mod export;
pub mod import;

pub use export::export_calendar;
pub use import::parse_calendar;

/// Escape a TEXT value (RFC 5545 section 3.3.11).
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}

/// Reverse of [`escape_text`]; unknown escapes keep the escaped character.
pub fn unescape_text(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            unescaped.push(ch);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => unescaped.push('\n'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

/// Split a TEXT list on commas that are not escaped.
pub(crate) fn split_text_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in value.chars() {
        if escaped {
            current.push('\\');
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == ',' {
            items.push(unescape_text(&current));
            current.clear();
        } else {
            current.push(ch);
        }
    }
    if escaped {
        current.push('\\');
    }
    items.push(unescape_text(&current));
    items.retain(|item| !item.is_empty());
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(escape_text("a;b,c\\d\ne"), "a\\;b\\,c\\\\d\\ne");
        assert_eq!(unescape_text("a\\;b\\,c\\\\d\\ne"), "a;b,c\\d\ne");
    }

    #[test]
    fn splits_lists_on_unescaped_commas() {
        assert_eq!(split_text_list("room-a,Hall\\, east"), vec!["room-a", "Hall, east"]);
    }
}
