//! `multipart/form-data` decomposition of a fully buffered request body.
//!
//! Decoding is split in two steps. [`parse_parts`] walks the body line by line and returns every
//! part it finds, with file contents described as byte ranges into the body computed from the
//! boundary scan; it never touches the filesystem. The request decoder then stores text fields
//! as parameters and copies each file range into its own temporary file.
//!
//! Text fields are reassembled from their lines without line separators, so a multi-line text
//! value comes back joined.

use std::collections::HashMap;
use std::ops::Range;

use mime::Mime;
use tracing::trace;

use crate::codec::scanner::{Lines, boundary_positions, find_header_end};
use crate::ensure;
use crate::protocol::ParseError;

/// One named part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub content: PartContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    /// A part without its own `Content-Type`.
    Text(String),
    /// A part with a `Content-Type`; `range` locates its bytes inside the body.
    File { filename: String, range: Range<usize> },
}

/// Extracts the boundary token from a `Content-Type` header value.
///
/// Returns `Ok(None)` for anything that is not `multipart/form-data`.
///
/// # Errors
///
/// [`ParseError::MissingBoundary`] when the type is multipart but the boundary parameter is
/// absent or empty.
pub fn multipart_boundary(content_type: &str) -> Result<Option<String>, ParseError> {
    let boundary = match content_type.parse::<Mime>() {
        Ok(mime) => {
            if mime.type_() != mime::MULTIPART || mime.subtype() != mime::FORM_DATA {
                return Ok(None);
            }
            mime.get_param(mime::BOUNDARY).map(|name| unquote(name.as_str()).to_string())
        }
        // boundaries may use characters the mime grammar rejects, such as `:`
        Err(_) => {
            let mut fields = content_type.split(';');
            let essence = fields.next().unwrap_or_default().trim();
            if !essence.eq_ignore_ascii_case("multipart/form-data") {
                return Ok(None);
            }
            fields
                .filter_map(|field| field.split_once('='))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
                .map(|(_, value)| unquote(value.trim()).to_string())
        }
    };

    match boundary {
        Some(boundary) if !boundary.is_empty() => Ok(Some(boundary)),
        _ => Err(ParseError::MissingBoundary),
    }
}

/// Splits `body` into its parts.
///
/// Every part must open with a line containing `boundary`, followed by header lines up to a blank
/// line. Parts that end before their blank line are dropped.
///
/// # Errors
///
/// - [`ParseError::BoundaryMismatch`] when a part does not start on a boundary line
/// - [`ParseError::MissingDisposition`] when a part has no `Content-Disposition`
/// - [`ParseError::MissingFieldName`] when the disposition carries no `name`
/// - [`ParseError::BoundaryOverflow`] when a file part has no closing boundary in the body
pub fn parse_parts(body: &[u8], boundary: &str) -> Result<Vec<Part>, ParseError> {
    let positions = boundary_positions(body, boundary.as_bytes());
    trace!(boundaries = positions.len(), "scanned multipart body");

    let mut parts = Vec::new();
    let mut lines = Lines::new(body);
    let mut boundary_count = 1;
    let mut line = lines.next();

    while let Some(current) = line {
        ensure!(current.contains(boundary), ParseError::BoundaryMismatch);
        boundary_count += 1;

        let mut fields = HashMap::new();
        line = lines.next();
        while let Some(field) = line.as_deref().filter(|field| !field.trim().is_empty()) {
            if let Some((name, value)) = field.split_once(':') {
                fields.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
            line = lines.next();
        }

        if line.is_none() {
            break;
        }

        let disposition = fields.get("content-disposition").ok_or(ParseError::MissingDisposition)?;
        let disposition = parse_disposition(disposition);
        let name = disposition.get("name").map(|name| unquote(name).to_string()).ok_or(ParseError::MissingFieldName)?;

        if fields.contains_key("content-type") {
            ensure!(boundary_count <= positions.len(), ParseError::boundary_overflow(boundary_count - 1, positions.len()));

            let start = positions[boundary_count - 2];
            let data_start = find_header_end(&body[start..]).map_or(body.len(), |end| start + end);
            let data_end = positions[boundary_count - 1].saturating_sub(4).max(data_start);
            let filename = disposition.get("filename").map(|filename| unquote(filename).to_string()).unwrap_or_default();

            parts.push(Part { name, content: PartContent::File { filename, range: data_start..data_end } });

            line = lines.next();
            while line.as_deref().is_some_and(|l| !l.contains(boundary)) {
                line = lines.next();
            }
        } else {
            let mut value = String::new();
            while line.as_deref().is_some_and(|l| !l.contains(boundary)) {
                line = lines.next();
                if let Some(l) = line.as_deref() {
                    match l.find(boundary) {
                        None => value.push_str(l),
                        // drop the "--" preceding the boundary token
                        Some(d) => value.push_str(l.get(..d.saturating_sub(2)).unwrap_or_default()),
                    }
                }
            }

            parts.push(Part { name, content: PartContent::Text(value) });
        }
    }

    Ok(parts)
}

/// `form-data; name="a"; filename="b"` into `{name: "\"a\"", filename: "\"b\""}`; tokens without
/// `=` are skipped and keys are lowercased.
fn parse_disposition(disposition: &str) -> HashMap<String, String> {
    disposition
        .split(';')
        .filter_map(|token| token.split_once('='))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect()
}

/// Strips one pair of surrounding double quotes, if present.
pub(crate) fn unquote(value: &str) -> &str {
    value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crlf(str: &str) -> Vec<u8> {
        str.replace('\n', "\r\n").into_bytes()
    }

    fn text(name: &str, value: &str) -> Part {
        Part { name: name.to_string(), content: PartContent::Text(value.to_string()) }
    }

    #[test]
    fn boundary_from_content_type() {
        assert_eq!(multipart_boundary("multipart/form-data; boundary=BOUND").unwrap().as_deref(), Some("BOUND"));
        assert_eq!(multipart_boundary("Multipart/Form-Data; boundary=\"quoted-bound\"").unwrap().as_deref(), Some("quoted-bound"));
        assert_eq!(multipart_boundary("multipart/form-data; charset=utf-8; boundary=x1").unwrap().as_deref(), Some("x1"));
    }

    #[test]
    fn boundary_outside_mime_token_grammar() {
        assert_eq!(multipart_boundary("multipart/form-data; boundary=ab:cd").unwrap().as_deref(), Some("ab:cd"));
        assert_eq!(multipart_boundary("multipart/form-data; charset=utf-8; Boundary=(x/y)").unwrap().as_deref(), Some("(x/y)"));
        assert_eq!(multipart_boundary("text/plain; boundary=ab:cd").unwrap(), None);
        assert!(matches!(multipart_boundary("multipart/form-data; name=a:b"), Err(ParseError::MissingBoundary)));
    }

    #[test]
    fn non_multipart_has_no_boundary() {
        assert_eq!(multipart_boundary("text/plain").unwrap(), None);
        assert_eq!(multipart_boundary("application/x-www-form-urlencoded").unwrap(), None);
        assert_eq!(multipart_boundary("multipart/mixed; boundary=x").unwrap(), None);
        assert_eq!(multipart_boundary("not a mime type").unwrap(), None);
    }

    #[test]
    fn multipart_without_boundary() {
        assert!(matches!(multipart_boundary("multipart/form-data"), Err(ParseError::MissingBoundary)));
        assert!(matches!(multipart_boundary("multipart/form-data; charset=utf-8"), Err(ParseError::MissingBoundary)));
    }

    #[test]
    fn text_and_file_parts() {
        let body = crlf(concat!(
            "--BOUND\n",
            "Content-Disposition: form-data; name=\"title\"\n",
            "\n",
            "hello world\n",
            "--BOUND\n",
            "Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\n",
            "Content-Type: text/plain\n",
            "\n",
            "file-bytes\n",
            "more\n",
            "--BOUND--\n",
        ));

        let parts = parse_parts(&body, "BOUND").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], text("title", "hello world"));

        match &parts[1].content {
            PartContent::File { filename, range } => {
                assert_eq!(parts[1].name, "upload");
                assert_eq!(filename, "a.txt");
                assert_eq!(&body[range.clone()], b"file-bytes\r\nmore");
            }
            other => panic!("expected a file part, got {other:?}"),
        }
    }

    #[test]
    fn multi_line_text_is_joined() {
        let body = crlf("--b\nContent-Disposition: form-data; name=\"note\"\n\nline one\nline two\n--b--\n");

        let parts = parse_parts(&body, "b").unwrap();
        assert_eq!(parts, vec![text("note", "line oneline two")]);
    }

    #[test]
    fn binary_file_range_is_exact() {
        let mut body = crlf("--XyZ\nContent-Disposition: form-data; name=\"bin\"; filename=\"b.dat\"\nContent-Type: application/octet-stream\n\n");
        let data_start = body.len();
        body.extend_from_slice(&[0, 159, 146, 150, 13, 10, 255]);
        let data_end = body.len();
        body.extend_from_slice(b"\r\n--XyZ--\r\n");

        let parts = parse_parts(&body, "XyZ").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].content, PartContent::File { filename: "b.dat".to_string(), range: data_start..data_end });
    }

    #[test]
    fn empty_body_has_no_parts() {
        assert!(parse_parts(b"", "BOUND").unwrap().is_empty());
    }

    #[test]
    fn must_start_with_boundary() {
        let body = crlf("preamble\n--BOUND\n");
        assert!(matches!(parse_parts(&body, "BOUND"), Err(ParseError::BoundaryMismatch)));
    }

    #[test]
    fn missing_disposition() {
        let body = crlf("--BOUND\nX-Other: 1\n\nvalue\n--BOUND--\n");
        assert!(matches!(parse_parts(&body, "BOUND"), Err(ParseError::MissingDisposition)));
    }

    #[test]
    fn missing_field_name() {
        let body = crlf("--BOUND\nContent-Disposition: form-data; filename=\"x\"\n\nvalue\n--BOUND--\n");
        assert!(matches!(parse_parts(&body, "BOUND"), Err(ParseError::MissingFieldName)));
    }

    #[test]
    fn file_without_closing_boundary() {
        let body = crlf("--BOUND\nContent-Disposition: form-data; name=\"f\"; filename=\"x\"\nContent-Type: a/b\n\ndata");
        let result = parse_parts(&body, "BOUND");
        assert!(matches!(result, Err(ParseError::BoundaryOverflow { part: 1, found: 1 })));
        assert_eq!(result.unwrap_err().status(), Some(http::StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn part_cut_off_in_headers_is_dropped() {
        let body = crlf("--BOUND\nContent-Disposition: form-data; name=\"a\"\n\nx\n--BOUND\nContent-Disposition: form-data; name=\"b\"");
        assert_eq!(parse_parts(&body, "BOUND").unwrap(), vec![text("a", "x")]);
    }

    #[test]
    fn disposition_tokens() {
        let disposition = parse_disposition("form-data; NAME=\"field\";filename=\"my file.txt\"");
        assert_eq!(disposition.len(), 2);
        assert_eq!(disposition["name"], "\"field\"");
        assert_eq!(unquote(&disposition["filename"]), "my file.txt");
    }

    #[test]
    fn unquote_only_strips_a_matched_pair() {
        assert_eq!(unquote("\"a\""), "a");
        assert_eq!(unquote("\"a"), "\"a");
        assert_eq!(unquote("a"), "a");
        assert_eq!(unquote("\"\""), "");
    }
}
