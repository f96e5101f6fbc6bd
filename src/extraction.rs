use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

/// Extensions accepted for upload, lowercase with leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".txt", ".pdf", ".docx"];

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("No text could be extracted from {0}")]
    NoText(String),
    #[error("{format} extraction failed: {reason}")]
    Corrupt { format: &'static str, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static CONTROL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f-\x{9f}]").expect("valid regex")
});

// Text runs, tabs, breaks, and paragraph ends inside word/document.xml.
static DOCX_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab(?:\s[^>]*)?/>|<w:br(?:\s[^>]*)?/>|</w:p>|</w:tc>")
        .expect("valid regex")
});

static NUMERIC_CHAR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").expect("valid regex"));

/// Lowercased extension of `filename` including the leading dot, or "" if
/// there is none.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

pub fn validate_file_type(filename: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&file_extension(filename).as_str())
}

pub fn validate_file_size(size_bytes: usize, max_size_mb: u64) -> bool {
    (size_bytes as u64) <= max_size_mb * 1024 * 1024
}

/// Read `path` and extract its text according to `extension`.
pub fn extract(path: &Path, extension: &str) -> Result<String, ExtractionError> {
    let bytes = std::fs::read(path)?;
    extract_by_extension(&bytes, extension)
}

/// Extract text from an uploaded file's bytes, dispatching on its name.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractionError> {
    extract_by_extension(bytes, &file_extension(filename))
}

fn extract_by_extension(bytes: &[u8], extension: &str) -> Result<String, ExtractionError> {
    let normalized = extension.trim_start_matches('.').to_lowercase();
    let raw = match normalized.as_str() {
        "txt" => extract_txt(bytes),
        "pdf" => extract_pdf(bytes)?,
        "docx" => extract_docx(bytes)?,
        other => return Err(ExtractionError::UnsupportedFormat(format!(".{}", other))),
    };

    let text = clean_text(&raw);
    if text.is_empty() {
        return Err(ExtractionError::NoText(normalized.to_uppercase()));
    }

    info!(
        format = %normalized,
        input_bytes = bytes.len(),
        text_length = text.len(),
        "Extracted document text"
    );
    Ok(text)
}

/// UTF-8 first, Latin-1 otherwise. Latin-1 maps every byte, so this never fails.
fn extract_txt(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("Text file is not valid UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Corrupt {
        format: "PDF",
        reason: e.to_string(),
    })
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let corrupt = |reason: String| ExtractionError::Corrupt {
        format: "DOCX",
        reason,
    };

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| corrupt(e.to_string()))?;
    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|e| corrupt(format!("word/document.xml: {}", e)))?;

    let mut xml = String::new();
    document.read_to_string(&mut xml)?;

    Ok(docx_xml_to_text(&xml))
}

fn docx_xml_to_text(xml: &str) -> String {
    let mut text = String::new();
    for caps in DOCX_TOKEN.captures_iter(xml) {
        match caps.get(1) {
            Some(run) => text.push_str(&decode_xml_entities(run.as_str())),
            None => match caps.get(0).map(|m| m.as_str()) {
                Some(token) if token == "</w:p>" || token.starts_with("<w:br") => text.push('\n'),
                _ => text.push(' '),
            },
        }
    }
    text
}

fn decode_xml_entities(text: &str) -> String {
    // Unknown or out-of-range code points are left as written.
    let numeric = NUMERIC_CHAR_REF.replace_all(text, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        match code.and_then(char::from_u32) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    });
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapse whitespace runs, drop control characters, and trim.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    CONTROL_CHARS.replace_all(&collapsed, "").trim().to_string()
}

/// Strip path components and unsafe characters from an uploaded file name.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace() || *c == '.' || *c == '-')
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();

    let (stem, ext) = match cleaned.rfind('.') {
        Some(dot) if dot > 0 => cleaned.split_at(dot),
        _ => (cleaned.as_str(), ""),
    };
    let stem: String = stem.chars().take(100).collect();
    format!("{}{}", stem, ext)
}

/// Map an extraction failure to a message suitable for end users.
pub fn format_error_message(error: &ExtractionError) -> String {
    match error {
        ExtractionError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
            "File not found. Please check the file path.".to_string()
        }
        ExtractionError::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
            "Permission denied. Cannot access the file.".to_string()
        }
        ExtractionError::UnsupportedFormat(_) => {
            "Invalid file format. Please upload a valid TXT, PDF, or DOCX file.".to_string()
        }
        ExtractionError::NoText(_) | ExtractionError::Corrupt { .. } => {
            "Could not extract text from the file. The file might be corrupted or empty.".to_string()
        }
        ExtractionError::Io(io) => format!("Failed to read file: {}", io),
    }
}
