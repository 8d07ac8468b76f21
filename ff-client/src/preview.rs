use std::path::Path;

use base64::Engine;
use ff::basic_models::ImageForUpload;

/// Convert image bytes to a data URL for previewing before upload.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        // Data URLs use the standard alphabet, not URL_SAFE
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Best guess at an image's MIME type from its first bytes.
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// A local file picked for upload, with its preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedPhoto {
    pub upload: ImageForUpload,
    pub preview: String,
}

/// Read a picked file into an upload and a previewable data URL.
///
/// The file is not checked for being an image; the picker decides what can be chosen.
pub async fn read_photo(path: impl AsRef<Path>) -> std::io::Result<AttachedPhoto> {
    let path = path.as_ref();
    let content_bytes = tokio::fs::read(path).await?;
    let mime_type = sniff_mime_type(&content_bytes).to_string();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    tracing::debug!(%file_name, %mime_type, bytes = content_bytes.len(), "Read photo");
    Ok(AttachedPhoto {
        preview: to_data_url(&mime_type, &content_bytes),
        upload: ImageForUpload {
            file_name,
            mime_type,
            content_bytes,
        },
    })
}
