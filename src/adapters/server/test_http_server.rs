use crate::core::error::ServerError;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

const MAX_HEAD_BYTES: usize = 64 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;

const NOT_FOUND_BODY: &str = "<html><body>File not found</body></html>";

/// A request as the test server received it, kept for assertions.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn new(status: u16, reason: &str) -> Self {
        Self {
            status,
            reason: reason.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, "OK")
            .with_header("Content-Type", "text/html;charset=ISO-8859-1")
            .with_body(body)
    }

    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
            .with_header("Content-Type", "text/html")
            .with_body(NOT_FOUND_BODY)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    fn to_wire_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason);
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n\r\n", self.body.len()));
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: &ReceivedRequest) -> TestResponse;
}

impl<F> RequestHandler for F
where
    F: Fn(&ReceivedRequest) -> TestResponse + Send + Sync,
{
    fn handle(&self, request: &ReceivedRequest) -> TestResponse {
        self(request)
    }
}

type HandlerMap = Arc<RwLock<HashMap<String, Arc<dyn RequestHandler>>>>;

/// Embedded single-purpose HTTP server used only to answer test requests.
///
/// Binds an ephemeral port on 127.0.0.1. Handlers are keyed by exact request
/// path; anything else gets a 404 with a fixed body. Every received request
/// is recorded in arrival order.
pub struct TestHttpServer {
    local_addr: SocketAddr,
    handlers: HandlerMap,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    cancellation_token: CancellationToken,
}

impl TestHttpServer {
    pub async fn start() -> Result<Self, ServerError> {
        let bind_addr = "127.0.0.1:0";
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: bind_addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("Test HTTP server started on {}", local_addr);

        let handlers: HandlerMap = Arc::new(RwLock::new(HashMap::new()));
        let received = Arc::new(Mutex::new(Vec::new()));
        let cancellation_token = CancellationToken::new();

        let accept_handlers = Arc::clone(&handlers);
        let accept_received = Arc::clone(&received);
        let accept_token = cancellation_token.clone();
        tokio::spawn(async move {
            run_accept_loop(listener, accept_handlers, accept_received, accept_token).await;
        });

        Ok(Self {
            local_addr,
            handlers,
            received,
            cancellation_token,
        })
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Registers a handler for an exact path, replacing any previous one.
    pub fn handle_path(&self, path: &str, handler: impl RequestHandler + 'static) {
        self.handlers
            .write()
            .expect("handler map lock poisoned")
            .insert(path.to_string(), Arc::new(handler));
    }

    /// Registers a handler answering a fixed body with 200 OK.
    pub fn serve_html(&self, path: &str, html: &str) {
        let body = html.to_string();
        self.handle_path(path, move |_req: &ReceivedRequest| {
            TestResponse::ok(body.clone())
        });
    }

    /// All requests received so far, in arrival order.
    pub fn received_requests(&self) -> Vec<ReceivedRequest> {
        self.received
            .lock()
            .expect("received log lock poisoned")
            .clone()
    }

    pub fn stop(&self) {
        info!("Test HTTP server on {} shutting down.", self.local_addr);
        self.cancellation_token.cancel();
    }
}

impl Drop for TestHttpServer {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

async fn run_accept_loop(
    listener: TcpListener,
    handlers: HandlerMap,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    cancellation_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                debug!("Test server accept loop shutting down.");
                break;
            }
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, client_addr)) => {
                        let conn_handlers = Arc::clone(&handlers);
                        let conn_received = Arc::clone(&received);
                        let conn_token = cancellation_token.clone();
                        tokio::spawn(
                            async move {
                                handle_connection(stream, client_addr, conn_handlers, conn_received, conn_token).await;
                            }
                            .instrument(tracing::debug_span!("handle_test_connection", client = %client_addr)),
                        );
                    }
                    Err(e) => {
                        error!("Error accepting test connection: {}", e);
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    client_addr: SocketAddr,
    handlers: HandlerMap,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    conn_cancellation_token: CancellationToken,
) {
    debug!(client = %client_addr, "New test connection established");

    loop {
        let request = tokio::select! {
            _ = conn_cancellation_token.cancelled() => {
                debug!(client = %client_addr, "Test connection handler cancelled.");
                break;
            }
            read_result = read_request(&mut stream) => {
                match read_result {
                    Ok(Some(request)) => request,
                    Ok(None) => {
                        debug!(client = %client_addr, "Test client closed connection.");
                        break;
                    }
                    Err(e) => {
                        warn!(client = %client_addr, "Failed to read test request: {}", e);
                        break;
                    }
                }
            }
        };

        let response = {
            let guard = handlers.read().expect("handler map lock poisoned");
            match guard.get(&request.path) {
                Some(handler) => handler.handle(&request),
                None => {
                    debug!(client = %client_addr, path = %request.path, "No handler registered, answering 404");
                    TestResponse::not_found()
                }
            }
        };

        received
            .lock()
            .expect("received log lock poisoned")
            .push(request);

        if let Err(e) = stream.write_all(&response.to_wire_bytes()).await {
            error!(client = %client_addr, "Failed to send test response: {}", e);
            break;
        }
    }
    debug!(client = %client_addr, "Test connection closed.");
}

/// Reads one request from the stream. `Ok(None)` means the client closed the
/// connection cleanly before sending anything.
async fn read_request(stream: &mut TcpStream) -> Result<Option<ReceivedRequest>, std::io::Error> {
    let mut buf = Vec::with_capacity(1024);
    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }
        let mut chunk = [0u8; 1024];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-request",
            ));
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n").filter(|l| !l.is_empty());
    let request_line = lines.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "empty request head")
    })?;

    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(m), Some(t)) => (m.to_string(), t.to_string()),
        _ => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid request line '{request_line}'"),
            ));
        }
    };

    let mut headers = Vec::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    if content_length > MAX_BODY_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "request body too large",
        ));
    }

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0u8; content_length - body.len()];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed mid-body",
            ));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    // Requests arrive in origin-form from real clients and absolute-form
    // from hand-built messages; handlers key on the path either way.
    let (path, query) = split_target(&target);

    Ok(Some(ReceivedRequest {
        method,
        path,
        query,
        headers,
        body,
    }))
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn split_target(target: &str) -> (String, Option<String>) {
    let origin = match target.find("://") {
        Some(scheme_end) => {
            let after = &target[scheme_end + 3..];
            match after.find('/') {
                Some(slash) => &after[slash..],
                None => "/",
            }
        }
        None => target,
    };
    match origin.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (origin.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn send_raw(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_unregistered_path_answers_404() {
        let server = TestHttpServer::start().await.unwrap();
        let response = send_raw(
            server.local_addr(),
            "GET /nothing-here HTTP/1.1\r\nHost: localhost\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.contains(NOT_FOUND_BODY));
        server.stop();
    }

    #[tokio::test]
    async fn test_registered_handler_answers() {
        let server = TestHttpServer::start().await.unwrap();
        server.serve_html("/index.html", "<html>hello</html>");
        let response = send_raw(
            server.local_addr(),
            "GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("<html>hello</html>"));
        assert!(response.contains("Content-Length: 18\r\n"));
        server.stop();
    }

    #[tokio::test]
    async fn test_handler_sees_query_and_body() {
        let server = TestHttpServer::start().await.unwrap();
        server.handle_path("/search", |req: &ReceivedRequest| {
            TestResponse::ok(format!(
                "q={} body={}",
                req.query.clone().unwrap_or_default(),
                req.body_str()
            ))
        });
        let response = send_raw(
            server.local_addr(),
            "POST /search?q=test HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello",
        )
        .await;
        assert!(response.contains("q=q=test body=hello"));

        let log = server.received_requests();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].method, "POST");
        assert_eq!(log[0].path, "/search");
        assert_eq!(log[0].query.as_deref(), Some("q=test"));
        assert_eq!(log[0].body_str(), "hello");
        server.stop();
    }

    #[tokio::test]
    async fn test_absolute_form_target_is_routed_by_path() {
        let server = TestHttpServer::start().await.unwrap();
        server.serve_html("/abs", "ok");
        let request = format!(
            "GET http://127.0.0.1:{}/abs HTTP/1.1\r\nHost: localhost\r\n\r\n",
            server.port()
        );
        let response = send_raw(server.local_addr(), &request).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        server.stop();
    }

    #[tokio::test]
    async fn test_requests_recorded_in_arrival_order() {
        let server = TestHttpServer::start().await.unwrap();
        for i in 0..3 {
            send_raw(
                server.local_addr(),
                &format!("GET /r{i} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
            )
            .await;
        }
        let paths: Vec<String> = server
            .received_requests()
            .into_iter()
            .map(|r| r.path)
            .collect();
        assert_eq!(paths, vec!["/r0", "/r1", "/r2"]);
        server.stop();
    }

    #[test]
    fn test_split_target_forms() {
        assert_eq!(split_target("/a/b"), ("/a/b".to_string(), None));
        assert_eq!(
            split_target("/a?x=1"),
            ("/a".to_string(), Some("x=1".to_string()))
        );
        assert_eq!(
            split_target("http://127.0.0.1:9090/p?y=2"),
            ("/p".to_string(), Some("y=2".to_string()))
        );
        assert_eq!(
            split_target("http://127.0.0.1:9090"),
            ("/".to_string(), None)
        );
    }
}
