pub mod admin_service;
pub mod auth_service;
pub mod book_service;
pub mod chat_service;
pub mod contact_service;
pub mod donation_service;
pub mod favourite_service;
pub mod user_service;

/// Trimmed value, or `None` when only whitespace was sent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed value or a 400 naming the missing field.
pub(crate) fn required(value: &str, field: &str) -> Result<String, crate::error::AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(crate::error::AppError::BadRequest(format!(
            "{field} is required"
        )));
    }
    Ok(value.to_string())
}

/// Escape `%`, `_` and `\` for use inside an ILIKE pattern.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_are_dropped() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" Pune ".into())), Some("Pune".into()));
        assert!(required("", "title").is_err());
        assert_eq!(required(" Dune ", "title").unwrap(), "Dune");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like("plain"), "plain");
    }
}
