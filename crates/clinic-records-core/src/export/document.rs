//! Patient detail document export.

use std::fs;
use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, Mm, PdfDocument};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::models::PatientRecord;

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("PDF rendering error: {0}")]
    Pdf(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Document title.
pub const DOCUMENT_TITLE: &str = "Patient Details";

/// A4 page size in millimetres.
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;

const MARGIN: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 12.0;
/// Distance between baselines of consecutive lines.
const LINE_HEIGHT: f32 = 10.0;

/// One labelled field of the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentField {
    pub label: String,
    pub value: String,
}

impl DocumentField {
    /// `Label: value`, as printed.
    pub fn line(&self) -> String {
        format!("{}: {}", self.label, self.value)
            .trim_end()
            .to_string()
    }
}

/// Printable patient details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDocument {
    pub title: String,
    /// Export timestamp
    pub exported_at: String,
    pub fields: Vec<DocumentField>,
}

impl PatientDocument {
    /// Build a document from a record. Absent fields print as empty.
    pub fn from_record(record: &PatientRecord) -> Self {
        let field = |label: &str, value: Option<&str>| DocumentField {
            label: label.to_string(),
            value: value.unwrap_or_default().to_string(),
        };

        Self {
            title: DOCUMENT_TITLE.to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            fields: vec![
                field("Name", Some(record.name.as_str())),
                field("Date", Some(record.date.as_str())),
                field("Complaint", record.complaint.as_deref()),
                field("Diagnosis", record.diagnosis.as_deref()),
                field("Treatment", record.treatment.as_deref()),
                field("Next Visit", record.next_visit.as_deref()),
            ],
        }
    }

    /// File name for this document, e.g. `patient_Ali_Khan.pdf`.
    pub fn default_file_name(&self) -> String {
        let name = self
            .fields
            .first()
            .map(|f| f.value.as_str())
            .unwrap_or_default();
        let safe: String = name
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '/' | '\\' => '_',
                c => c,
            })
            .collect();
        format!("patient_{}.pdf", safe)
    }

    /// Export to JSON.
    pub fn to_json(&self) -> ExportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Title followed by one `Label: value` line per field.
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n\n", self.title);
        for field in &self.fields {
            out.push_str(&field.line());
            out.push('\n');
        }
        out
    }

    /// Render a single A4 page: the title, then one line per field.
    pub fn to_pdf(&self) -> ExportResult<Vec<u8>> {
        let (doc, page, layer) =
            PdfDocument::new(&self.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let title_font = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let body_font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;

        let layer = doc.get_page(page).get_layer(layer);
        let mut y = PAGE_HEIGHT - MARGIN - LINE_HEIGHT;
        layer.use_text(self.title.as_str(), TITLE_SIZE, Mm(MARGIN), Mm(y), &title_font);
        for field in &self.fields {
            y -= LINE_HEIGHT;
            layer.use_text(field.line(), BODY_SIZE, Mm(MARGIN), Mm(y), &body_font);
        }

        doc.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))
    }

    /// Write the PDF rendering to `path`, returning the path written.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> ExportResult<PathBuf> {
        let path = path.as_ref().to_path_buf();
        let bytes = self.to_pdf()?;
        fs::write(&path, bytes).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "patient document exported");
        Ok(path)
    }

    /// Write into `dir` under [`PatientDocument::default_file_name`].
    pub fn write_into<P: AsRef<Path>>(&self, dir: P) -> ExportResult<PathBuf> {
        self.write_to(dir.as_ref().join(self.default_file_name()))
    }
}
