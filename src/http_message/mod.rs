use crate::core::error::HttpMessageError;
use url::Url;

/// A single HTTP header section: start line plus ordered header fields.
///
/// Built from a literal header string the way a test author writes it, so a
/// rule under test sees exactly the bytes the test constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequestHeader {
    method: String,
    uri: String,
    version: String,
    fields: Vec<(String, String)>,
}

impl HttpRequestHeader {
    pub fn parse(raw: &str) -> Result<Self, HttpMessageError> {
        let mut lines = header_lines(raw);
        let start_line = lines
            .next()
            .ok_or_else(|| HttpMessageError::MalformedRequestHeader("empty header".to_string()))?;

        let mut parts = start_line.split_whitespace();
        let (method, uri, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(u), Some(v)) => (m.to_string(), u.to_string(), v.to_string()),
            _ => {
                return Err(HttpMessageError::MalformedRequestHeader(format!(
                    "invalid request line '{start_line}'"
                )));
            }
        };

        let fields = parse_fields(lines, |line| {
            HttpMessageError::MalformedRequestHeader(format!("invalid header field '{line}'"))
        })?;

        Ok(Self {
            method,
            uri,
            version,
            fields,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = uri.into();
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        lookup_field(&self.fields, name)
    }

    pub fn set_field(&mut self, name: &str, value: &str) {
        set_field(&mut self.fields, name, value);
    }

    /// The request target as an absolute URL. Messages built by the harness
    /// always carry the absolute form, pointing at the embedded test server.
    pub fn url(&self) -> Result<Url, HttpMessageError> {
        Url::parse(&self.uri).map_err(|e| HttpMessageError::InvalidUri {
            uri: self.uri.clone(),
            details: e.to_string(),
        })
    }

    pub fn to_wire_string(&self) -> String {
        let mut out = format!("{} {} {}\r\n", self.method, self.uri, self.version);
        for (name, value) in &self.fields {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseHeader {
    version: String,
    status_code: u16,
    reason: String,
    fields: Vec<(String, String)>,
}

impl HttpResponseHeader {
    pub fn parse(raw: &str) -> Result<Self, HttpMessageError> {
        let mut lines = header_lines(raw);
        let status_line = lines
            .next()
            .ok_or_else(|| HttpMessageError::MalformedResponseHeader("empty header".to_string()))?;

        let mut parts = status_line.splitn(3, ' ');
        let version = parts
            .next()
            .filter(|v| v.starts_with("HTTP/"))
            .ok_or_else(|| {
                HttpMessageError::MalformedResponseHeader(format!(
                    "invalid status line '{status_line}'"
                ))
            })?
            .to_string();
        let status_code = parts
            .next()
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(|| {
                HttpMessageError::MalformedResponseHeader(format!(
                    "invalid status code in '{status_line}'"
                ))
            })?;
        let reason = parts.next().unwrap_or_default().to_string();

        let fields = parse_fields(lines, |line| {
            HttpMessageError::MalformedResponseHeader(format!("invalid header field '{line}'"))
        })?;

        Ok(Self {
            version,
            status_code,
            reason,
            fields,
        })
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        lookup_field(&self.fields, name)
    }

    pub fn set_field(&mut self, name: &str, value: &str) {
        set_field(&mut self.fields, name, value);
    }

    pub fn to_wire_string(&self) -> String {
        let mut out = format!(
            "{} {} {}\r\n",
            self.version, self.status_code, self.reason
        );
        for (name, value) in &self.fields {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }
}

/// A synthetic request/response pair a rule is exercised against.
///
/// The host stand-in fills the response side in place when a probe is sent,
/// mirroring how the real host process hands a completed exchange back to a
/// rule.
#[derive(Debug, Clone, Default)]
pub struct HttpMessage {
    request_header: Option<HttpRequestHeader>,
    request_body: String,
    response_header: Option<HttpResponseHeader>,
    response_body: String,
}

impl HttpMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_request_header(&mut self, raw: &str) -> Result<(), HttpMessageError> {
        self.request_header = Some(HttpRequestHeader::parse(raw)?);
        Ok(())
    }

    pub fn set_response_header(&mut self, raw: &str) -> Result<(), HttpMessageError> {
        self.response_header = Some(HttpResponseHeader::parse(raw)?);
        Ok(())
    }

    pub fn request_header(&self) -> Result<&HttpRequestHeader, HttpMessageError> {
        self.request_header
            .as_ref()
            .ok_or(HttpMessageError::MissingRequestHeader)
    }

    pub fn request_header_mut(&mut self) -> Result<&mut HttpRequestHeader, HttpMessageError> {
        self.request_header
            .as_mut()
            .ok_or(HttpMessageError::MissingRequestHeader)
    }

    pub fn response_header(&self) -> Option<&HttpResponseHeader> {
        self.response_header.as_ref()
    }

    pub fn set_request_body(&mut self, body: impl Into<String>) {
        self.request_body = body.into();
    }

    pub fn request_body(&self) -> &str {
        &self.request_body
    }

    pub fn set_response_body(&mut self, body: impl Into<String>) {
        self.response_body = body.into();
    }

    pub fn response_body(&self) -> &str {
        &self.response_body
    }

    /// Serializes the request side to wire bytes (head, blank line, body).
    pub fn request_to_wire_bytes(&self) -> Result<Vec<u8>, HttpMessageError> {
        let header = self.request_header()?;
        let mut bytes = header.to_wire_string().into_bytes();
        bytes.extend_from_slice(self.request_body.as_bytes());
        Ok(bytes)
    }
}

fn header_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.split("\r\n")
        .flat_map(|chunk| chunk.split('\n'))
        .filter(|line| !line.is_empty())
}

fn parse_fields<'a>(
    lines: impl Iterator<Item = &'a str>,
    on_invalid: impl Fn(&str) -> HttpMessageError,
) -> Result<Vec<(String, String)>, HttpMessageError> {
    let mut fields = Vec::new();
    for line in lines {
        let (name, value) = line.split_once(':').ok_or_else(|| on_invalid(line))?;
        fields.push((name.trim().to_string(), value.trim().to_string()));
    }
    Ok(fields)
}

fn lookup_field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn set_field(fields: &mut Vec<(String, String)>, name: &str, value: &str) {
    match fields.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
        Some((_, v)) => *v = value.to_string(),
        None => fields.push((name.to_string(), value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_request_header_parse_and_serialize() {
        let raw = "GET http://127.0.0.1:8080/index.html HTTP/1.1\r\n\
                   Host: www.any-domain-name.example\r\n\
                   User-Agent: ascan-harness\r\n\
                   Pragma: no-cache\r\n";
        let header = HttpRequestHeader::parse(raw).unwrap();
        assert_eq!(header.method(), "GET");
        assert_eq!(header.uri(), "http://127.0.0.1:8080/index.html");
        assert_eq!(header.version(), "HTTP/1.1");
        assert_eq!(header.field("host"), Some("www.any-domain-name.example"));
        assert_eq!(header.field("Pragma"), Some("no-cache"));

        let wire = header.to_wire_string();
        assert!(wire.starts_with("GET http://127.0.0.1:8080/index.html HTTP/1.1\r\n"));
        assert!(wire.ends_with("\r\n\r\n"));

        let reparsed = HttpRequestHeader::parse(&wire).unwrap();
        assert_eq!(reparsed, header);
    }

    #[test]
    fn test_request_header_url() {
        let header =
            HttpRequestHeader::parse("GET http://127.0.0.1:9090/a/b?x=1 HTTP/1.1\r\n").unwrap();
        let url = header.url().unwrap();
        assert_eq!(url.port(), Some(9090));
        assert_eq!(url.path(), "/a/b");
    }

    #[test]
    fn test_malformed_request_line_is_rejected() {
        assert_matches!(
            HttpRequestHeader::parse("GET\r\n"),
            Err(HttpMessageError::MalformedRequestHeader(_))
        );
        assert_matches!(
            HttpRequestHeader::parse(""),
            Err(HttpMessageError::MalformedRequestHeader(_))
        );
    }

    #[test]
    fn test_response_header_parse() {
        let raw = "HTTP/1.1 200 OK\r\n\
                   Server: Apache-Coyote/1.1\r\n\
                   Content-Type: text/html;charset=ISO-8859-1\r\n\
                   Content-Length: 13\r\n";
        let header = HttpResponseHeader::parse(raw).unwrap();
        assert_eq!(header.status_code(), 200);
        assert_eq!(header.reason(), "OK");
        assert_eq!(header.field("content-length"), Some("13"));
    }

    #[test]
    fn test_response_header_without_reason() {
        let header = HttpResponseHeader::parse("HTTP/1.1 404\r\n").unwrap();
        assert_eq!(header.status_code(), 404);
        assert_eq!(header.reason(), "");
    }

    #[test]
    fn test_malformed_status_line_is_rejected() {
        assert_matches!(
            HttpResponseHeader::parse("200 OK\r\n"),
            Err(HttpMessageError::MalformedResponseHeader(_))
        );
    }

    #[test]
    fn test_message_request_wire_bytes() {
        let mut msg = HttpMessage::new();
        msg.set_request_header("POST http://127.0.0.1:8080/login HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\n")
            .unwrap();
        msg.set_request_body("user=admin");
        let bytes = msg.request_to_wire_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.ends_with("\r\n\r\nuser=admin"));
    }

    #[test]
    fn test_missing_request_header_is_an_error() {
        let msg = HttpMessage::new();
        assert_matches!(
            msg.request_header(),
            Err(HttpMessageError::MissingRequestHeader)
        );
    }

    #[test]
    fn test_set_field_overwrites_case_insensitively() {
        let mut header =
            HttpRequestHeader::parse("GET http://h/ HTTP/1.1\r\nHost: a\r\n").unwrap();
        header.set_field("host", "b");
        assert_eq!(header.field("Host"), Some("b"));
        assert_eq!(header.fields().len(), 1);
    }
}
