pub mod test_http_server;

pub use test_http_server::{ReceivedRequest, RequestHandler, TestHttpServer, TestResponse};
