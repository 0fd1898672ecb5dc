// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant file persistence: message attachments and history-sync dumps.
//!
//! Layout under the configured root:
//!
//! ```text
//! <root>/user_<id>/<message id><ext>
//! <root>/user_<id>/history-<n>.json
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use hookwire_core::{HookwireError, MediaKind, MediaRef, TenantId};

/// Process-wide sequence for history dump file names.
static HISTORY_SEQ: AtomicU64 = AtomicU64::new(0);

const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("audio/ogg", ".ogg"),
    ("audio/mpeg", ".mp3"),
    ("audio/mp4", ".m4a"),
    ("audio/aac", ".aac"),
    ("audio/amr", ".amr"),
    ("video/mp4", ".mp4"),
    ("video/3gpp", ".3gp"),
    ("video/quicktime", ".mov"),
    ("application/pdf", ".pdf"),
    ("application/zip", ".zip"),
    ("application/msword", ".doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    ("application/vnd.ms-excel", ".xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
    ("application/vnd.ms-powerpoint", ".ppt"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".pptx",
    ),
    ("text/plain", ".txt"),
    ("text/csv", ".csv"),
];

/// Directory holding one tenant's files.
pub fn tenant_dir(root: &Path, tenant: TenantId) -> PathBuf {
    root.join(format!("user_{tenant}"))
}

/// Creates the tenant directory (mode 0751 on unix) if it does not exist.
pub async fn ensure_tenant_dir(root: &Path, tenant: TenantId) -> Result<PathBuf, HookwireError> {
    let dir = tenant_dir(root, tenant);
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o751);
    builder
        .create(&dir)
        .await
        .map_err(|e| HookwireError::io(&dir, e))?;
    Ok(dir)
}

/// Picks a file extension for an attachment.
///
/// The declared MIME type is looked up first (parameters such as
/// `; codecs=opus` are ignored). Documents then fall back to the extension of
/// their original file name; everything else gets a per-kind default.
pub fn extension_for(media: &MediaRef) -> String {
    let essence = media
        .mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if let Some((_, ext)) = MIME_EXTENSIONS.iter().find(|(mime, _)| *mime == essence) {
        return (*ext).to_string();
    }

    if media.kind == MediaKind::Document
        && let Some(ext) = media
            .file_name
            .as_deref()
            .map(Path::new)
            .and_then(Path::extension)
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
    {
        return format!(".{ext}");
    }

    match media.kind {
        MediaKind::Image => ".jpg",
        MediaKind::Audio => ".ogg",
        MediaKind::Video => ".mp4",
        MediaKind::Document => ".bin",
    }
    .to_string()
}

/// Keeps only characters that are safe in a single path component.
fn sanitize_component(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}

/// Writes `bytes` to `path`, owner read/write only on unix.
async fn write_private(path: &Path, bytes: &[u8]) -> Result<(), HookwireError> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options
        .open(path)
        .await
        .map_err(|e| HookwireError::io(path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| HookwireError::io(path, e))?;
    file.flush().await.map_err(|e| HookwireError::io(path, e))
}

/// Saves a downloaded attachment as `<dir>/<message id><ext>`.
pub async fn save_attachment(
    dir: &Path,
    message_id: &str,
    media: &MediaRef,
    bytes: &[u8],
) -> Result<PathBuf, HookwireError> {
    let path = dir.join(format!(
        "{}{}",
        sanitize_component(message_id),
        extension_for(media)
    ));
    write_private(&path, bytes).await?;
    info!(path = %path.display(), kind = ?media.kind, size = bytes.len(), "attachment saved");
    Ok(path)
}

/// Dumps a history-sync blob as pretty JSON to `<dir>/history-<n>.json`.
pub async fn dump_history(dir: &Path, data: &serde_json::Value) -> Result<PathBuf, HookwireError> {
    let n = HISTORY_SEQ.fetch_add(1, Ordering::SeqCst) + 1;
    let path = dir.join(format!("history-{n}.json"));
    let mut body = serde_json::to_vec_pretty(data)
        .map_err(|e| HookwireError::Internal(format!("failed to encode history sync: {e}")))?;
    body.push(b'\n');
    write_private(&path, &body).await?;
    debug!(path = %path.display(), "wrote history sync");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn media(kind: MediaKind, mime: &str, file_name: Option<&str>) -> MediaRef {
        MediaRef {
            kind,
            mime_type: mime.to_string(),
            file_name: file_name.map(str::to_string),
            handle: serde_json::Value::Null,
        }
    }

    #[test]
    fn known_mime_types_use_the_table() {
        assert_eq!(extension_for(&media(MediaKind::Image, "image/jpeg", None)), ".jpg");
        assert_eq!(
            extension_for(&media(MediaKind::Audio, "audio/ogg; codecs=opus", None)),
            ".ogg"
        );
        assert_eq!(
            extension_for(&media(MediaKind::Document, "application/pdf", Some("a.doc"))),
            ".pdf"
        );
    }

    #[test]
    fn documents_fall_back_to_original_name() {
        assert_eq!(
            extension_for(&media(MediaKind::Document, "application/x-odd", Some("report.odt"))),
            ".odt"
        );
        assert_eq!(
            extension_for(&media(MediaKind::Document, "application/x-odd", Some("README"))),
            ".bin"
        );
    }

    #[test]
    fn unknown_types_use_kind_defaults() {
        assert_eq!(extension_for(&media(MediaKind::Video, "video/x-weird", None)), ".mp4");
        assert_eq!(extension_for(&media(MediaKind::Audio, "", None)), ".ogg");
    }

    #[test]
    fn message_ids_cannot_escape_the_directory() {
        assert_eq!(sanitize_component("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_component("3EB0C431"), "3EB0C431");
        assert_eq!(sanitize_component("/.."), "attachment");
    }

    #[tokio::test]
    async fn attachment_is_written_under_tenant_dir() {
        let root = tempdir().unwrap();
        let dir = ensure_tenant_dir(root.path(), TenantId(3)).await.unwrap();
        assert!(dir.ends_with("user_3"));

        let image = media(MediaKind::Image, "image/jpeg", None);
        let path = save_attachment(&dir, "MSG1", &image, b"jpeg").await.unwrap();
        assert_eq!(path, root.path().join("user_3").join("MSG1.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn history_dumps_get_increasing_numbers() {
        let root = tempdir().unwrap();
        let dir = ensure_tenant_dir(root.path(), TenantId(1)).await.unwrap();
        let first = dump_history(&dir, &serde_json::json!({"a": 1})).await.unwrap();
        let second = dump_history(&dir, &serde_json::json!({"b": 2})).await.unwrap();
        assert_ne!(first, second);

        let content = std::fs::read_to_string(&first).unwrap();
        assert!(content.contains("\n  \"a\": 1"));
        let parse = |p: &Path| -> u64 {
            p.file_stem().unwrap().to_str().unwrap()["history-".len()..].parse().unwrap()
        };
        assert!(parse(&second) > parse(&first));
    }
}
