//! Input sanitization for user-supplied text.
//!
//! Values are normalized before they are validated, so length limits apply to
//! the stored (escaped) form.

/// Trim, HTML-escape and strip NUL bytes from free-form text.
pub fn sanitize_text(value: &str) -> String {
    let trimmed = value.trim();
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '\0' => {}
            other => out.push(other),
        }
    }
    out
}

/// Normalize an email address: trimmed, lower-cased, NUL bytes removed.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase().replace('\0', "")
}

/// Loose `local@domain.tld` shape check (not full RFC 5322).
pub fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
    local_ok && host_ok && tld_ok
}
