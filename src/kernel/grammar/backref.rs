//! `\1`..`\9` backreferences inside `end` patterns.

/// Whether `pattern` refers back to a begin capture (`\1`..`\9`, not an escaped backslash).
pub(crate) fn has_backreferences(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            continue;
        }
        if matches!(chars.next(), Some('1'..='9')) {
            return true;
        }
    }
    false
}

/// Substitutes every backreference with the regex-escaped text of the matching begin capture.
/// Groups that did not participate in the begin match resolve to the empty string.
pub(crate) fn resolve_backreferences(pattern: &str, captures: &[Option<&str>]) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some(d @ '1'..='9') => {
                let group = d as usize - '0' as usize;
                let text = captures.get(group).copied().flatten().unwrap_or("");
                out.push_str(&regex::escape(text));
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
