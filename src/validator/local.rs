const ATEXT_SPECIALS: &str = "!#$%&'*+-/=?^_`{|}~";

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || ATEXT_SPECIALS.contains(c)
}

/// ASCII dot-atom: no leading or trailing '.', no "..".
pub(crate) fn is_local_strict(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    s.split('.').all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

/// Relaxed also takes a quoted-string local part, with `\` escapes.
pub(crate) fn is_local_relaxed(s: &str) -> bool {
    match s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) => is_quoted_content(inner),
        None => is_local_strict(s),
    }
}

fn is_quoted_content(inner: &str) -> bool {
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' | '\r' | '\n' => return false,
            _ => {}
        }
    }
    !escaped
}
