use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct MultipartPart {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Pulls the `boundary` parameter out of a `multipart/*` content type.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("boundary") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

/// Writes a single part the way the media endpoint expects request bodies.
pub fn encode_part(boundary: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "--{}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
        boundary,
        content_type,
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out.extend_from_slice(b"\r\n");
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Incremental parser for length-delimited `multipart/mixed` bodies.
///
/// Bytes are fed as they arrive; every part must carry a `Content-Length` header.
pub struct MultipartParser {
    delimiter: Vec<u8>,
    buffer: Vec<u8>,
    finished: bool,
}

impl MultipartParser {
    pub fn new(boundary: &str) -> Self {
        MultipartParser {
            delimiter: format!("--{}", boundary).into_bytes(),
            buffer: Vec::new(),
            finished: false,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        if !self.finished {
            self.buffer.extend_from_slice(data);
        }
    }

    /// True once the closing delimiter has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the next complete part, or `None` until more bytes are pushed.
    pub fn next_part(&mut self) -> Result<Option<MultipartPart>, AppError> {
        if self.finished {
            return Ok(None);
        }
        let Some(start) = find(&self.buffer, &self.delimiter) else {
            return Ok(None);
        };
        let after_delim = start + self.delimiter.len();
        if self.buffer.len() < after_delim + 2 {
            return Ok(None);
        }
        if &self.buffer[after_delim..after_delim + 2] == b"--" {
            self.finished = true;
            self.buffer.clear();
            return Ok(None);
        }

        let Some(header_len) = find(&self.buffer[after_delim..], b"\r\n\r\n") else {
            return Ok(None);
        };
        let header_block = &self.buffer[after_delim..after_delim + header_len];
        let header_text = String::from_utf8_lossy(header_block);

        let mut content_type = String::new();
        let mut content_length: Option<usize> = None;
        for line in header_text.split("\r\n") {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name.eq_ignore_ascii_case("content-type") {
                content_type = value.trim().to_string();
            } else if name.eq_ignore_ascii_case("content-length") {
                content_length = Some(value.trim().parse().map_err(|_| {
                    AppError::Stream(format!("Invalid Content-Length '{}' in media part", value.trim()))
                })?);
            }
        }
        let content_length = content_length
            .ok_or_else(|| AppError::Stream("Media part is missing Content-Length".to_string()))?;

        let body_start = after_delim + header_len + 4;
        let body_end = body_start + content_length;
        if self.buffer.len() < body_end {
            return Ok(None);
        }
        let body = self.buffer[body_start..body_end].to_vec();
        self.buffer.drain(..body_end);
        Ok(Some(MultipartPart { content_type, body }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "--device-stream-boundary--";

    #[test]
    fn reads_boundary_parameter() {
        assert_eq!(
            boundary_from_content_type("multipart/mixed; boundary=--device-stream-boundary--").as_deref(),
            Some(BOUNDARY)
        );
        assert_eq!(
            boundary_from_content_type("multipart/mixed;boundary=\"abc\"").as_deref(),
            Some("abc")
        );
        assert_eq!(boundary_from_content_type("application/json"), None);
    }

    #[test]
    fn parses_parts_split_across_pushes() {
        let mut wire = encode_part(BOUNDARY, "application/json", br#"{"type":"response"}"#);
        wire.extend(encode_part(BOUNDARY, "video/mp2t", &[0x47u8; 10]));

        let mut parser = MultipartParser::new(BOUNDARY);
        let mut parts = Vec::new();
        for byte_chunk in wire.chunks(7) {
            parser.push(byte_chunk);
            while let Some(part) = parser.next_part().unwrap() {
                parts.push(part);
            }
        }
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].content_type, "application/json");
        assert_eq!(parts[0].body, br#"{"type":"response"}"#);
        assert_eq!(parts[1].content_type, "video/mp2t");
        assert_eq!(parts[1].body, vec![0x47u8; 10]);
    }

    #[test]
    fn body_may_contain_the_delimiter() {
        let payload = format!("xx--{}yy", BOUNDARY).into_bytes();
        let wire = encode_part(BOUNDARY, "video/mp2t", &payload);
        let mut parser = MultipartParser::new(BOUNDARY);
        parser.push(&wire);
        assert_eq!(parser.next_part().unwrap().unwrap().body, payload);
    }

    #[test]
    fn closing_delimiter_finishes() {
        let mut wire = encode_part(BOUNDARY, "video/mp2t", b"abc");
        wire.extend(format!("--{}--\r\n", BOUNDARY).into_bytes());
        let mut parser = MultipartParser::new(BOUNDARY);
        parser.push(&wire);
        assert!(parser.next_part().unwrap().is_some());
        assert!(parser.next_part().unwrap().is_none());
        assert!(parser.is_finished());
    }

    #[test]
    fn missing_content_length_is_an_error() {
        let wire = format!("--{}\r\nContent-Type: video/mp2t\r\n\r\nabc", BOUNDARY);
        let mut parser = MultipartParser::new(BOUNDARY);
        parser.push(wire.as_bytes());
        assert!(matches!(parser.next_part(), Err(AppError::Stream(_))));
    }
}
