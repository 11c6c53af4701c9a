// Upload Preprocessing
// Turns uploaded files into model input: text for documents, inline media otherwise

use crate::models::ContentKind;
use crate::services::providers::MediaPart;
use docx_rs::{DocumentChild, ParagraphChild, RunChild};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Failed to read {format} document: {message}")]
    Parse { format: &'static str, message: String },
    #[error("Document contains no extractable text")]
    Empty,
}

/// Lowercased extension of `file_name`, if any.
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "bmp" => "image/bmp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "m4a" => "audio/mp4",
        "aiff" | "aif" => "audio/aiff",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mpeg" | "mpg" => "video/mpeg",
        "3gp" => "video/3gpp",
        _ => return None,
    };
    Some(mime)
}

fn mime_prefix(kind: ContentKind) -> Option<&'static str> {
    match kind {
        ContentKind::Image => Some("image/"),
        ContentKind::Audio => Some("audio/"),
        ContentKind::Video => Some("video/"),
        _ => None,
    }
}

/// MIME type for a media upload of `kind`. The declared content type wins when
/// it matches the kind; otherwise the file extension decides.
pub fn resolve_media_mime(
    kind: ContentKind,
    declared: Option<&str>,
    file_name: Option<&str>,
) -> Option<String> {
    let prefix = mime_prefix(kind)?;

    if let Some(declared) = declared {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence.starts_with(prefix) {
            return Some(essence);
        }
    }

    file_name
        .and_then(file_extension)
        .and_then(|ext| mime_from_extension(&ext))
        .filter(|mime| mime.starts_with(prefix))
        .map(str::to_string)
}

/// Wrap uploaded bytes as an inline media part.
pub fn media_from_upload(
    kind: ContentKind,
    declared: Option<&str>,
    file_name: Option<&str>,
    data: Vec<u8>,
) -> Result<MediaPart, DocumentError> {
    let mime_type = resolve_media_mime(kind, declared, file_name).ok_or_else(|| {
        DocumentError::UnsupportedType(
            declared
                .map(str::to_string)
                .or_else(|| file_name.map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string()),
        )
    })?;
    Ok(MediaPart { mime_type, data })
}

fn extract_pdf(bytes: &[u8]) -> Result<String, DocumentError> {
    // pdf-extract panics on some malformed files
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));
    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(DocumentError::Parse {
            format: "pdf",
            message: e.to_string(),
        }),
        Err(_) => Err(DocumentError::Parse {
            format: "pdf",
            message: "parser panicked".to_string(),
        }),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, DocumentError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| DocumentError::Parse {
        format: "docx",
        message: e.to_string(),
    })?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            let mut line = String::new();
            for part in &paragraph.children {
                if let ParagraphChild::Run(run) = part {
                    for item in &run.children {
                        match item {
                            RunChild::Text(t) => line.push_str(&t.text),
                            RunChild::Tab(_) => line.push('\t'),
                            _ => {}
                        }
                    }
                }
            }
            paragraphs.push(line);
        }
    }
    Ok(paragraphs.join("\n"))
}

fn extract_plain(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.trim_start_matches('\u{FEFF}').to_string()
}

/// Extract raw text from an uploaded document, dispatching on its extension.
pub fn extract_document_text(file_name: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    let ext = file_extension(file_name).unwrap_or_default();
    let text = match ext.as_str() {
        "pdf" => extract_pdf(bytes)?,
        "docx" => extract_docx(bytes)?,
        "txt" | "md" | "markdown" | "text" => extract_plain(bytes),
        other => {
            let label = if other.is_empty() { file_name } else { other };
            return Err(DocumentError::UnsupportedType(label.to_string()));
        }
    };

    debug!(
        "[DOCUMENT] {} -> {} chars extracted",
        file_name,
        text.chars().count()
    );

    if text.trim().is_empty() {
        return Err(DocumentError::Empty);
    }
    Ok(text)
}
