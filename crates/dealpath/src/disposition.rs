//! Filename extraction from `Content-Disposition` headers.

use std::sync::LazyLock;

use regex::Regex;

static EXTENDED_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|;)\s*filename\*=UTF-8''([^;]+)").expect("pattern must compile"));

static PLAIN_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|;)\s*filename="?([^";]+)"?"#).expect("pattern must compile"));

/// Returns the filename announced by a `Content-Disposition` value.
///
/// The RFC 5987 `filename*=UTF-8''...` form wins over a plain `filename=`.
pub(crate) fn filename(header: &str) -> Option<String> {
    if let Some(captures) = EXTENDED_FILENAME.captures(header) {
        let encoded = captures[1].trim();

        if let Ok(decoded) = urlencoding::decode(encoded) {
            return Some(decoded.into_owned()).filter(|name| !name.is_empty());
        }
    }

    PLAIN_FILENAME
        .captures(header)
        .map(|captures| captures[1].trim().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::filename;

    #[test]
    fn plain_quoted() {
        assert_eq!(filename(r#"attachment; filename="report.pdf""#).as_deref(), Some("report.pdf"));
    }

    #[test]
    fn plain_unquoted() {
        assert_eq!(filename("attachment; filename=report.pdf").as_deref(), Some("report.pdf"));
    }

    #[test]
    fn extended_form_is_decoded_and_preferred() {
        let header = r#"attachment; filename="fallback.pdf"; filename*=UTF-8''Q3%20rent%20roll%20%E2%82%AC.xlsx"#;

        assert_eq!(filename(header).as_deref(), Some("Q3 rent roll €.xlsx"));
    }

    #[test]
    fn undecodable_extended_form_falls_back_to_plain() {
        let header = r#"attachment; filename*=UTF-8''bad%FF.pdf; filename="plain.pdf""#;
        assert_eq!(filename(header).as_deref(), Some("plain.pdf"));

        assert_eq!(filename("attachment; filename*=UTF-8''bad%FF.pdf"), None);
    }

    #[test]
    fn lookalike_parameters_are_ignored() {
        assert_eq!(filename(r#"attachment; original-filename="x.pdf""#), None);
        assert_eq!(filename(r#"attachment; xfilename=x.pdf; filename=y.pdf"#).as_deref(), Some("y.pdf"));
    }

    #[test]
    fn no_filename() {
        assert_eq!(filename("inline"), None);
    }
}
