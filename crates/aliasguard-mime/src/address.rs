//! Bare address scanning.
//!
//! Display names, angle brackets and comments are not interpreted; the
//! scanner simply picks out every `local@label.rest` run, equivalent to the
//! pattern `[\w.+-]+@[\w-]+\.[\w.-]+`.

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_local(c: char) -> bool {
    is_word(c) || matches!(c, '.' | '+' | '-')
}

fn is_label(c: char) -> bool {
    is_word(c) || c == '-'
}

fn is_domain(c: char) -> bool {
    is_label(c) || c == '.'
}

/// Finds every address in `text`, left to right, without overlap.
#[must_use]
pub fn find_addresses(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let byte_at = |idx: usize| chars.get(idx).map_or(text.len(), |&(b, _)| b);

    let mut found = Vec::new();
    let mut consumed = 0;
    let mut i = 0;

    while i < chars.len() {
        if chars[i].1 != '@' {
            i += 1;
            continue;
        }

        let mut start = i;
        while start > consumed && is_local(chars[start - 1].1) {
            start -= 1;
        }

        let mut end = i + 1;
        while end < chars.len() && is_label(chars[end].1) {
            end += 1;
        }
        let has_label = end > i + 1;
        let has_dot = chars.get(end).is_some_and(|&(_, c)| c == '.');

        if start == i || !has_label || !has_dot {
            i += 1;
            continue;
        }

        let dot = end;
        end += 1;
        while end < chars.len() && is_domain(chars[end].1) {
            end += 1;
        }
        if end == dot + 1 {
            i += 1;
            continue;
        }

        found.push(text[byte_at(start)..byte_at(end)].to_string());
        consumed = end;
        i = end;
    }

    found
}

/// Returns the domain part of an address, if it has a non-empty one.
#[must_use]
pub fn domain_of(address: &str) -> Option<&str> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
}
