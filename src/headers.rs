// Upload URL scraping from a raw response header block.
//
// The transport hands over the header section as text (status line plus
// `name: value\r\n` lines), so a line scanner is all that is needed here.

/// Marker that introduces the session URL. Matched case-sensitively.
pub const UPLOAD_URL_MARKER: &str = "x-goog-upload-url:";

/// Find the resumable-upload session URL in a header block.
///
/// Only the first line carrying the marker is considered. The URL starts at
/// the first `https://` after the marker and runs to the carriage return
/// (or the end of the line if there is none). Returns `None` for empty
/// input, when no line has the marker, or when the marked line has no
/// `https://` URL.
pub fn extract_upload_url(header_blob: &str) -> Option<&str> {
    if header_blob.is_empty() {
        return None;
    }

    let line = header_blob.split('\n').find(|line| line.contains(UPLOAD_URL_MARKER))?;
    let after_marker = &line[line.find(UPLOAD_URL_MARKER)? + UPLOAD_URL_MARKER.len()..];
    let url = &after_marker[after_marker.find("https://")?..];
    let end = url.find('\r').unwrap_or(url.len());
    Some(&url[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_url_up_to_carriage_return() {
        let blob = "x-goog-upload-url: https://up.example.com/abc\r\nOther: x\r\n";
        assert_eq!(extract_upload_url(blob), Some("https://up.example.com/abc"));
    }

    #[test]
    fn finds_marker_after_other_headers() {
        let blob = "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\nx-goog-upload-url: https://u/1\r\n\r\n";
        assert_eq!(extract_upload_url(blob), Some("https://u/1"));
    }

    #[test]
    fn missing_marker_is_not_found() {
        let blob = "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\n\r\n";
        assert_eq!(extract_upload_url(blob), None);
    }

    #[test]
    fn empty_input_is_not_found() {
        assert_eq!(extract_upload_url(""), None);
    }

    #[test]
    fn marker_without_https_url_is_not_found() {
        let blob = "x-goog-upload-url: http://plain.example.com/abc\r\nx-goog-upload-url: https://later/\r\n";
        // Only the first marked line counts.
        assert_eq!(extract_upload_url(blob), None);
    }

    #[test]
    fn marker_is_case_sensitive() {
        let blob = "X-Goog-Upload-URL: https://up.example.com/abc\r\n";
        assert_eq!(extract_upload_url(blob), None);
    }

    #[test]
    fn unterminated_last_line_still_matches() {
        assert_eq!(extract_upload_url("x-goog-upload-url: https://u/2"), Some("https://u/2"));
    }
}
