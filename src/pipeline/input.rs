//! Input resolution: turn a user-supplied path or URL into a [`SubmittedFile`].
//!
//! Everything is held in memory: identity documents are small and the
//! 20 MiB default limit is enforced before and after download. The MIME type
//! comes from the `Content-Type` header for URLs, otherwise from the file
//! signature, falling back to the extension.

use crate::config::IntakeConfig;
use crate::error::IntakeError;
use crate::model::{has_pdf_signature, SubmittedFile, PDF_MIME};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory file.
pub async fn resolve_input(input: &str, config: &IntakeConfig) -> Result<SubmittedFile, IntakeError> {
    let file = if is_url(input) {
        download_url(input, config).await?
    } else {
        read_local(input, config.max_file_bytes).await?
    };
    validate(&file, config.max_file_bytes)?;
    Ok(file)
}

/// True for documents that may carry several pages (PDFs).
pub fn is_multi_page_format(file: &SubmittedFile) -> bool {
    file.is_pdf()
}

/// True for image types the compiled-in decoders can read.
pub fn is_decodable_image(mime_type: &str) -> bool {
    image::ImageFormat::from_mime_type(mime_type).is_some_and(|f| f.reading_enabled())
}

/// Only decodable images and PDFs within the size limit are accepted.
pub fn validate(file: &SubmittedFile, limit: usize) -> Result<(), IntakeError> {
    if !(file.mime_type == PDF_MIME || is_decodable_image(&file.mime_type)) {
        return Err(IntakeError::UnsupportedType {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
        });
    }
    if file.len() > limit {
        return Err(IntakeError::FileTooLarge {
            name: file.name.clone(),
            size: file.len(),
            limit,
        });
    }
    Ok(())
}

/// MIME type from the leading bytes, if recognisable.
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    if has_pdf_signature(data) {
        return Some(PDF_MIME);
    }
    image::guess_format(data).ok().map(|f| f.to_mime_type())
}

/// MIME type from the file extension.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "pdf" => PDF_MIME,
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        _ => return None,
    })
}

async fn read_local(path_str: &str, limit: usize) -> Result<SubmittedFile, IntakeError> {
    let path = PathBuf::from(path_str);
    let map_io = |e: std::io::Error, path: &Path| match e.kind() {
        std::io::ErrorKind::NotFound => IntakeError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => IntakeError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => IntakeError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    let meta = tokio::fs::metadata(&path).await.map_err(|e| map_io(e, &path))?;
    if !meta.is_file() {
        return Err(IntakeError::FileNotFound { path });
    }
    if meta.len() as usize > limit {
        return Err(IntakeError::FileTooLarge {
            name,
            size: meta.len() as usize,
            limit,
        });
    }

    let data = tokio::fs::read(&path).await.map_err(|e| map_io(e, &path))?;
    let mime = sniff_mime(&data)
        .or_else(|| mime_from_extension(&path))
        .unwrap_or("application/octet-stream");

    debug!("Read local file {} ({}, {} bytes)", path.display(), mime, data.len());
    Ok(SubmittedFile::new(name, mime, data))
}

async fn download_url(url: &str, config: &IntakeConfig) -> Result<SubmittedFile, IntakeError> {
    info!("Downloading document from: {}", url);
    let timeout_secs = config.download_timeout_secs;
    let failed = |reason: String| IntakeError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            IntakeError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(classify)?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let name = extract_filename(response.url().as_str());
    if let Some(len) = response.content_length() {
        if len as usize > config.max_file_bytes {
            return Err(IntakeError::FileTooLarge {
                name,
                size: len as usize,
                limit: config.max_file_bytes,
            });
        }
    }

    let header_mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty() && v != "application/octet-stream");

    let bytes = response.bytes().await.map_err(classify)?;
    let mime = header_mime
        .or_else(|| sniff_mime(&bytes).map(str::to_string))
        .or_else(|| mime_from_extension(Path::new(&name)).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    info!("Downloaded {} ({}, {:.1} KB)", name, mime, bytes.len() as f64 / 1024.0);
    Ok(SubmittedFile::new(name, mime, bytes.to_vec()))
}

/// Last non-empty path segment of the URL, or `"download"`.
fn extract_filename(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty())
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/front.jpg"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/front.jpg"));
        assert!(!is_url(""));
    }

    #[test]
    fn sniffs_pdf_and_images() {
        assert_eq!(sniff_mime(b"%PDF-1.7\n"), Some(PDF_MIME));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some("image/jpeg"));
        assert_eq!(
            sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            Some("image/png")
        );
        assert_eq!(sniff_mime(b"hello world"), None);
    }

    #[test]
    fn extension_fallback() {
        assert_eq!(mime_from_extension(Path::new("a/Front.JPG")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("doc.pdf")), Some(PDF_MIME));
        assert_eq!(mime_from_extension(Path::new("notes.txt")), None);
    }

    #[test]
    fn validate_rejects_other_types_and_large_files() {
        let text = SubmittedFile::new("notes.txt", "text/plain", b"hi".to_vec());
        assert!(matches!(
            validate(&text, 100),
            Err(IntakeError::UnsupportedType { .. })
        ));

        let big = SubmittedFile::new("big.jpg", "image/jpeg", vec![0u8; 11]);
        assert!(matches!(
            validate(&big, 10),
            Err(IntakeError::FileTooLarge { size: 11, .. })
        ));
        assert!(validate(&big, 11).is_ok());
    }

    #[test]
    fn undecodable_image_types_are_refused() {
        let heic = SubmittedFile::new("photo.heic", "image/heic", vec![0u8; 4]);
        assert!(matches!(
            validate(&heic, 100),
            Err(IntakeError::UnsupportedType { ref mime_type, .. }) if mime_type == "image/heic"
        ));
        for mime in ["image/jpeg", "image/png", "image/gif", "image/webp", "image/bmp", "image/tiff"] {
            assert!(is_decodable_image(mime), "{mime}");
        }
    }

    #[test]
    fn filename_from_url() {
        assert_eq!(extract_filename("https://x.test/docs/front.jpg?sig=1"), "front.jpg");
        assert_eq!(extract_filename("https://x.test/"), "download");
    }

    #[tokio::test]
    async fn local_file_is_read_and_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.bin");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();

        let config = IntakeConfig::default();
        let file = resolve_input(path.to_str().unwrap(), &config).await.unwrap();
        assert_eq!(file.name, "scan.bin");
        assert_eq!(file.mime_type, PDF_MIME);
        assert!(is_multi_page_format(&file));
    }

    #[tokio::test]
    async fn missing_local_file() {
        let config = IntakeConfig::default();
        let err = resolve_input("/definitely/not/here.jpg", &config).await.unwrap_err();
        assert!(matches!(err, IntakeError::FileNotFound { .. }));
    }
}
