//! Conversion between binary files and transport-safe [`Attachment`] payloads.
//!
//! Sources larger than [`MAX_ATTACHMENT_BYTES`] are rejected before any bytes
//! are encoded. MIME types are sniffed from well-known magic numbers first and
//! fall back to the file extension.

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use chat_provider::Attachment;
use tokio::fs;
use tokio::io::AsyncReadExt;

mod error;

pub use error::EncodingError;

/// Upload ceiling: 5 MiB.
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

const OCTET_STREAM: &str = "application/octet-stream";

/// Reads `path` without blocking the runtime and encodes it as an attachment
/// named after the file.
pub async fn encode_path(path: &Path) -> Result<Attachment, EncodingError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| EncodingError::MissingFileName {
            path: path.to_path_buf(),
        })?
        .to_string();

    let metadata = fs::metadata(path)
        .await
        .map_err(|source| EncodingError::io("reading attachment metadata", path, source))?;
    ensure_within_limit(&name, metadata.len())?;

    let mut bytes = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or_default());
    fs::File::open(path)
        .await
        .map_err(|source| EncodingError::io("opening attachment", path, source))?
        // Bound the read in case the file grew after the metadata check.
        .take(MAX_ATTACHMENT_BYTES + 1)
        .read_to_end(&mut bytes)
        .await
        .map_err(|source| EncodingError::io("reading attachment", path, source))?;

    encode_bytes(&name, &bytes)
}

/// Encodes an in-memory source.
pub fn encode_bytes(name: &str, bytes: &[u8]) -> Result<Attachment, EncodingError> {
    ensure_within_limit(name, bytes.len() as u64)?;

    let mime_type = sniff_mime_type(name, bytes);
    tracing::debug!(name, mime_type = %mime_type, size = bytes.len(), "encoded attachment");

    Ok(Attachment::new(
        name,
        mime_type,
        general_purpose::STANDARD.encode(bytes),
    ))
}

/// Recovers the raw bytes carried by an attachment.
pub fn decode(attachment: &Attachment) -> Result<Vec<u8>, EncodingError> {
    general_purpose::STANDARD
        .decode(attachment.data())
        .map_err(|source| EncodingError::Decode {
            name: attachment.name().to_string(),
            source,
        })
}

/// Determines a MIME type from content signatures, then from the file name.
#[must_use]
pub fn sniff_mime_type(name: &str, bytes: &[u8]) -> String {
    if let Some(mime) = sniff_magic(bytes) {
        return mime.to_string();
    }

    let guessed = mime_guess::from_path(name).first_or_octet_stream();
    if guessed.essence_str() == OCTET_STREAM && looks_like_text(bytes) {
        return "text/plain".to_string();
    }
    guessed.to_string()
}

fn ensure_within_limit(name: &str, size: u64) -> Result<(), EncodingError> {
    if size > MAX_ATTACHMENT_BYTES {
        return Err(EncodingError::TooLarge {
            name: name.to_string(),
            size,
            limit: MAX_ATTACHMENT_BYTES,
        });
    }

    Ok(())
}

fn sniff_magic(bytes: &[u8]) -> Option<&'static str> {
    const SIGNATURES: [(&[u8], &str); 5] = [
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
    ];

    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    SIGNATURES
        .iter()
        .find(|(signature, _)| bytes.starts_with(signature))
        .map(|(_, mime)| *mime)
}

fn looks_like_text(bytes: &[u8]) -> bool {
    !bytes.is_empty() && !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_numbers_win_over_misleading_extensions() {
        assert_eq!(
            sniff_mime_type("screenshot.txt", b"\x89PNG\r\n\x1a\n\0\0"),
            "image/png"
        );
        assert_eq!(sniff_mime_type("scan", b"%PDF-1.7 ..."), "application/pdf");
        assert_eq!(
            sniff_mime_type("anim.bin", b"RIFF\x10\0\0\0WEBPVP8 "),
            "image/webp"
        );
    }

    #[test]
    fn extension_is_used_when_no_signature_matches() {
        assert_eq!(sniff_mime_type("index.html", b"<p>hi</p>"), "text/html");
        assert_eq!(sniff_mime_type("data.json", b"{}"), "application/json");
    }

    #[test]
    fn unknown_utf8_sources_fall_back_to_plain_text() {
        assert_eq!(sniff_mime_type("Makefile", b"all:\n\tcargo build\n"), "text/plain");
        assert_eq!(sniff_mime_type("blob", b"\0\x01\x02"), OCTET_STREAM);
    }

    #[test]
    fn encode_bytes_rejects_oversized_sources_before_encoding() {
        let oversized = vec![b'a'; (MAX_ATTACHMENT_BYTES + 1) as usize];
        let error = encode_bytes("huge.txt", &oversized).expect_err("limit must apply");

        assert!(matches!(
            error,
            EncodingError::TooLarge { size, limit, .. }
                if size == MAX_ATTACHMENT_BYTES + 1 && limit == MAX_ATTACHMENT_BYTES
        ));
    }

    #[test]
    fn encode_then_decode_recovers_source_bytes() {
        let source = b"\x89PNG\r\n\x1a\nrest-of-image";
        let attachment = encode_bytes("logo.png", source).expect("encode");

        assert_eq!(attachment.name(), "logo.png");
        assert_eq!(attachment.mime_type(), "image/png");
        assert!(attachment.data().is_ascii());
        assert_eq!(decode(&attachment).expect("decode"), source.to_vec());
    }

    #[test]
    fn decode_reports_corrupt_payloads() {
        let attachment = Attachment::new("broken.png", "image/png", "***not base64***");
        let error = decode(&attachment).expect_err("corrupt payload must fail");
        assert!(matches!(error, EncodingError::Decode { ref name, .. } if name == "broken.png"));
    }
}
