//! `multipart/form-data` body writer.
//!
//! Each field becomes one boundary-delimited section:
//!
//! ```text
//! --<boundary>\r\n
//! Content-Disposition: form-data; name="<key>"\r\n
//! \r\n
//! <value>\r\n
//! ```
//!
//! File parts additionally carry `filename="..."` and a `Content-Type` line.
//! The body is closed by `--<boundary>--\r\n`.

use crate::collections::{PostData, PostValue};
use bytes::{BufMut, Bytes, BytesMut};

const DEFAULT_PART_CONTENT_TYPE: &str = "application/octet-stream";

/// Generate a random boundary token (UUIDv4, hyphens stripped)
///
/// The token only needs to be unique within one request body; it is not a
/// security boundary.
#[must_use]
pub fn generate_boundary() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// `Content-Type` header value announcing `boundary`
#[must_use]
pub fn content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Serialize every post data entry as a multipart section
///
/// Text values and file parts are both accepted; entries keep their
/// insertion order.
#[must_use]
pub fn encode(post_data: &PostData, boundary: &str) -> Bytes {
    let mut buf = BytesMut::new();
    for (key, value) in post_data.iter() {
        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"\r\n");
        buf.put_slice(b"Content-Disposition: form-data; name=\"");
        buf.put_slice(escape_quoted(key).as_bytes());
        buf.put_u8(b'"');

        match value {
            PostValue::Text(text) => {
                buf.put_slice(b"\r\n\r\n");
                buf.put_slice(text.as_bytes());
            }
            PostValue::File(file) => {
                if let Some(file_name) = &file.file_name {
                    buf.put_slice(b"; filename=\"");
                    buf.put_slice(escape_quoted(file_name).as_bytes());
                    buf.put_u8(b'"');
                }
                buf.put_slice(b"\r\nContent-Type: ");
                buf.put_slice(
                    file.content_type
                        .as_deref()
                        .unwrap_or(DEFAULT_PART_CONTENT_TYPE)
                        .as_bytes(),
                );
                buf.put_slice(b"\r\n\r\n");
                buf.put_slice(&file.data);
            }
        }
        buf.put_slice(b"\r\n");
    }
    buf.put_slice(b"--");
    buf.put_slice(boundary.as_bytes());
    buf.put_slice(b"--\r\n");
    buf.freeze()
}

/// Percent-escape the characters that would break a quoted header parameter
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::collections::FilePart;

    #[test]
    fn test_boundary_is_hyphen_free_and_unique() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert_eq!(a.len(), 32);
        assert!(!a.contains('-'));
        assert_ne!(a, b);
    }

    #[test]
    fn test_content_type_carries_boundary() {
        assert_eq!(
            content_type("abc123"),
            "multipart/form-data; boundary=abc123"
        );
    }

    #[test]
    fn test_encode_text_and_file_sections() {
        let data = PostData::new().with("title", "Report").with(
            "file",
            FilePart::new(&b"PDF"[..])
                .file_name("q3.pdf")
                .content_type("application/pdf"),
        );

        let body = encode(&data, "XYZ");
        let expected = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\
            \r\n\
            Report\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"q3.pdf\"\r\n\
            Content-Type: application/pdf\r\n\
            \r\n\
            PDF\r\n\
            --XYZ--\r\n";
        assert_eq!(std::str::from_utf8(&body).unwrap(), expected);
    }

    #[test]
    fn test_file_without_metadata_defaults_to_octet_stream() {
        let data = PostData::new().with("blob", FilePart::new(vec![0xFFu8, 0x00]));

        let body = encode(&data, "B");
        let mut expected = b"--B\r\nContent-Disposition: form-data; name=\"blob\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n"
            .to_vec();
        expected.extend_from_slice(&[0xFF, 0x00]);
        expected.extend_from_slice(b"\r\n--B--\r\n");
        assert_eq!(body.to_vec(), expected);
    }

    #[test]
    fn test_field_names_are_escaped() {
        let data = PostData::new().with("a\"b", "v");
        let body = encode(&data, "B");
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("name=\"a%22b\""));
    }
}
