//! Image uploads for item galleries and avatars.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::Multipart;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
pub const MAX_ITEM_IMAGES: usize = 5;

/// Room for a full gallery plus the text fields.
pub const MULTIPART_BODY_LIMIT: usize = MAX_ITEM_IMAGES * MAX_FILE_SIZE + 1024 * 1024;

const ALLOWED: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ItemImage,
    Avatar,
}

impl UploadKind {
    pub fn field(self) -> &'static str {
        match self {
            UploadKind::ItemImage => "images",
            UploadKind::Avatar => "avatar",
        }
    }

    fn dir(self) -> &'static str {
        match self {
            UploadKind::ItemImage => "items",
            UploadKind::Avatar => "avatars",
        }
    }

    fn max_files(self) -> usize {
        match self {
            UploadKind::ItemImage => MAX_ITEM_IMAGES,
            UploadKind::Avatar => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Text fields and files from a multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Drain a multipart body, keeping files only from the field `kind` expects.
pub async fn read_multipart(mut multipart: Multipart, kind: UploadKind) -> AppResult<MultipartForm> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                if name != kind.field() || form.files.len() >= kind.max_files() {
                    return Err(AppError::bad_request(
                        "Too many files uploaded or unexpected field name.",
                    ));
                }
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(e.body_text()))?;
                validate_image(&file_name, &content_type, bytes.len())?;
                form.files.push(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(e.body_text()))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Accepts jpeg/jpg/png/gif only when extension and MIME type agree on it; returns the extension.
pub fn validate_image(file_name: &str, content_type: &str, size: usize) -> AppResult<String> {
    if size > MAX_FILE_SIZE {
        return Err(AppError::bad_request("File size too large. Max 5MB allowed."));
    }

    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let mime = content_type.to_lowercase();

    let ext_ok = ALLOWED.contains(&ext.as_str());
    let mime_ok = mime
        .strip_prefix("image/")
        .is_some_and(|sub| ALLOWED.contains(&sub));

    if ext_ok && mime_ok {
        Ok(ext)
    } else {
        Err(AppError::bad_request("Images only (jpeg, jpg, png, gif)."))
    }
}

/// Write each file under `{upload_dir}/{items|avatars}/` and return its public URL.
pub async fn store_files(
    upload_dir: &str,
    kind: UploadKind,
    files: &[UploadedFile],
) -> AppResult<Vec<String>> {
    let dir = PathBuf::from(upload_dir).join(kind.dir());
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        let ext = validate_image(&file.file_name, &file.content_type, file.bytes.len())?;
        let name = stored_name(kind, &ext);
        tokio::fs::write(dir.join(&name), &file.bytes)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        urls.push(format!("/uploads/{}/{}", kind.dir(), name));
    }

    tracing::debug!(count = urls.len(), dir = %dir.display(), "stored uploads");
    Ok(urls)
}

fn stored_name(kind: UploadKind, ext: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}.{}",
        kind.field(),
        Utc::now().timestamp_millis(),
        &suffix[..8],
        ext
    )
}
