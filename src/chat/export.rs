//! Rendering a transcript into a downloadable artifact.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::error::{Error, Result};
use crate::types::{Turn, TurnContent};

/// Stylesheets linked from HTML exports.
pub const DEFAULT_STYLESHEETS: &[&str] = &["css/style.css", "css/chat.css"];

/// Output format of an export.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// `Label: content` blocks separated by blank lines.
    #[default]
    Text,
    /// A standalone HTML document.
    Html,
}

impl ExportFormat {
    /// File extension of the artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Html => "html",
        }
    }

    /// MIME type of the artifact.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain;charset=utf-8",
            ExportFormat::Html => "text/html;charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "txt" => Ok(ExportFormat::Text),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(Error::invalid_request(
                format!("unknown export format '{other}'; use text or html"),
                Some("format".to_string()),
            )),
        }
    }
}

/// A rendered transcript ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name, `chat_export_<timestamp>.<ext>`.
    pub file_name: String,
    /// Format of `body`.
    pub format: ExportFormat,
    /// Rendered transcript.
    pub body: String,
}

impl ExportArtifact {
    /// Write the artifact into `dir` under its file name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .map_err(|err| Error::io(format!("failed to create {}", dir.display()), err))?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.body)
            .map_err(|err| Error::io(format!("failed to write {}", path.display()), err))?;
        Ok(path)
    }
}

/// Render `turns` in `format`, naming the artifact after `now`.
pub fn export(
    turns: &[Turn],
    format: ExportFormat,
    now: OffsetDateTime,
) -> Result<ExportArtifact> {
    let body = match format {
        ExportFormat::Text => render_text(turns),
        ExportFormat::Html => render_html(turns, DEFAULT_STYLESHEETS),
    };
    Ok(ExportArtifact {
        file_name: export_file_name(format, now)?,
        format,
        body,
    })
}

/// `chat_export_<UTC timestamp with milliseconds>.<ext>`.
pub fn export_file_name(format: ExportFormat, now: OffsetDateTime) -> Result<String> {
    let timestamp = now
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .map_err(|err| {
            Error::serialization(
                format!("failed to format timestamp: {err}"),
                Some(Box::new(err)),
            )
        })?;
    Ok(format!("chat_export_{timestamp}.{}", format.extension()))
}

/// Plain-text rendering. An empty transcript renders as the empty string.
pub fn render_text(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| {
            format!(
                "{}: {}",
                turn.role.display_label(),
                turn.content.to_plain_text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// HTML rendering. Text is escaped; PDF turns are embedded as data URIs.
pub fn render_html(turns: &[Turn], stylesheets: &[&str]) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Chat export</title>\n");
    for href in stylesheets {
        let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{}\">", escape_html(href));
    }
    html.push_str("</head>\n<body>\n<div class=\"chat-messages\">\n");
    for turn in turns {
        let _ = writeln!(
            html,
            "<div class=\"message {}\" id=\"{}\">",
            turn.role.as_str(),
            turn.id
        );
        let _ = writeln!(
            html,
            "<div class=\"message-label\">{}</div>",
            turn.role.display_label()
        );
        match &turn.content {
            TurnContent::Text { text } => {
                let _ = writeln!(
                    html,
                    "<div class=\"message-content\">{}</div>",
                    escape_html(text)
                );
            }
            TurnContent::Pdf { document } => {
                let _ = writeln!(
                    html,
                    "<div class=\"message-content pdf\"><iframe title=\"{}\" src=\"{}\"></iframe></div>",
                    escape_html(&document.file_name),
                    document.data_uri()
                );
            }
        }
        html.push_str("</div>\n");
    }
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
