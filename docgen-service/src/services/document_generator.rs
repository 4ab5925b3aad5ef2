use crate::services::docx::{self, DocxError, Paragraph};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("valid placeholder pattern"))
}

/// Substitute `{key}` placeholders with mapped values.
///
/// Curly quotes are straightened first. Placeholders without a mapped value
/// are logged and removed.
pub fn fill_template(template: &str, mapped_data: &BTreeMap<String, String>) -> String {
    let mut filled = template
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    for (key, value) in mapped_data {
        filled = filled.replace(&format!("{{{}}}", key), value);
    }

    let unreplaced: Vec<&str> = placeholder_pattern()
        .captures_iter(&filled)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if !unreplaced.is_empty() {
        tracing::warn!(
            placeholders = %unreplaced.join(", "),
            "Unreplaced placeholders removed"
        );
    }

    placeholder_pattern().replace_all(&filled, "").into_owned()
}

/// One paragraph per non-blank line; fully upper-case lines are bold.
pub fn to_paragraphs(text: &str) -> Vec<Paragraph> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Paragraph {
            text: line.to_string(),
            bold: is_heading(line),
        })
        .collect()
}

fn is_heading(line: &str) -> bool {
    line.chars().any(char::is_alphabetic) && line.to_uppercase() == line
}

/// Render the filled template as a `.docx` package.
pub fn generate_document(
    template: &str,
    mapped_data: &BTreeMap<String, String>,
) -> Result<Vec<u8>, DocxError> {
    let filled = fill_template(template, mapped_data);
    let paragraphs = to_paragraphs(&filled);
    tracing::info!(paragraphs = paragraphs.len(), "Generating document");
    docx::write_document(&paragraphs)
}
