use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::request::MultiPart;
use crate::collab::UploadPolicy;

/// Whether a form-data item is a plain field or a file upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataKind {
    Field,
    File,
}

/// Where a form-data payload lives after the upload policy ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FormPayload {
    Inline(Vec<u8>),
    File(PathBuf),
}

impl FormPayload {
    /// Inline bytes, if the payload was not persisted.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            FormPayload::Inline(b) => Some(b),
            FormPayload::File(_) => None,
        }
    }
}

/// One decoded `multipart/form-data` item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormDataItem {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub kind: DataKind,
    pub payload: FormPayload,
}

/// Convert raw multipart parts into form-data items, consulting the upload
/// policy once per file-bearing part. Parts without a usable
/// `Content-Disposition` are skipped.
pub fn items_from_parts(parts: &[MultiPart], policy: &dyn UploadPolicy) -> Vec<FormDataItem> {
    let mut items = Vec::with_capacity(parts.len());
    for part in parts {
        let Some(disposition) = part.headers.get("content-disposition") else {
            warn!("multipart part without content-disposition skipped");
            continue;
        };
        let Some((name, filename)) = parse_content_disposition(disposition) else {
            warn!(disposition, "unparsable content-disposition skipped");
            continue;
        };
        let content_type = part.headers.get("content-type").map(str::to_string);

        let (kind, payload) = match &filename {
            None => (DataKind::Field, FormPayload::Inline(part.data.clone())),
            Some(fname) => (DataKind::File, file_payload(fname, &part.data, policy)),
        };

        items.push(FormDataItem {
            name,
            filename,
            content_type,
            kind,
            payload,
        });
    }
    items
}

/// Run the persistence decision for one file payload. A failed disk write
/// falls back to keeping the bytes inline.
fn file_payload(filename: &str, data: &[u8], policy: &dyn UploadPolicy) -> FormPayload {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    let size_kb = data.len().div_ceil(1024);

    if !policy.persist(extension, size_kb) {
        return FormPayload::Inline(data.to_vec());
    }

    let path = policy.temp_path(filename);
    match fs::write(&path, data) {
        Ok(()) => {
            debug!(file = %path.display(), size_kb, "upload persisted");
            FormPayload::File(path)
        }
        Err(err) => {
            warn!(file = %path.display(), error = %err, "upload persist failed; keeping inline");
            FormPayload::Inline(data.to_vec())
        }
    }
}

/// Extract `name` and `filename` from a `form-data` content disposition.
fn parse_content_disposition(value: &str) -> Option<(String, Option<String>)> {
    let mut segments = value.split(';');
    if segments.next().map(str::trim)? != "form-data" {
        return None;
    }

    let mut name = None;
    let mut filename = None;
    for segment in segments {
        let Some((key, raw)) = segment.trim().split_once('=') else {
            continue;
        };
        let unquoted = raw.trim().trim_matches('"').to_string();
        match key.trim() {
            "name" => name = Some(unquoted),
            "filename" => filename = Some(unquoted),
            _ => {}
        }
    }
    name.map(|n| (n, filename))
}
