//! One-shot client plumbing over the same transmitter the server uses.

use std::time::Duration;

use tokio::net::{TcpStream, UnixStream};

use crate::body::Body;
use crate::error::Result;
use crate::io::{Stream, DEFAULT_TIMEOUT_MS};
use crate::listener::AsyncReadWriteBox;
use crate::message::Method;
use crate::request::Request;
use crate::response::Response;
use crate::transmit::Transmitter;

/// Connects to `addr`: a Unix socket path when it starts with `/` or `.`,
/// otherwise a TCP address (`:port` is shorthand for `127.0.0.1:port`).
pub async fn connect(addr: &str) -> Result<AsyncReadWriteBox> {
    if addr.starts_with('/') || addr.starts_with('.') {
        let path = std::path::Path::new(addr);
        let addr = if path.is_dir() {
            path.join("sock")
        } else {
            path.to_path_buf()
        };
        let stream = UnixStream::connect(addr).await?;
        Ok(Box::new(stream))
    } else {
        let addr = if addr.starts_with(':') {
            format!("127.0.0.1{}", addr)
        } else {
            addr.to_string()
        };
        let stream = TcpStream::connect(addr).await?;
        Ok(Box::new(stream))
    }
}

fn host_header_for(addr: &str) -> String {
    if addr.starts_with('/') || addr.starts_with('.') {
        "localhost".to_string()
    } else if addr.starts_with(':') {
        format!("127.0.0.1{}", addr)
    } else {
        addr.to_string()
    }
}

/// Performs one GET exchange and returns the response with its body
/// buffered, so the connection can be dropped.
pub async fn get(addr: &str, target: &str) -> Result<Response> {
    let stream = connect(addr).await?;
    let tx = Transmitter::new(Stream::shared(
        stream,
        Duration::from_millis(DEFAULT_TIMEOUT_MS),
    ));

    let mut req = Request::builder()
        .method(Method::Get)
        .uri(target)?
        .header("Host", &host_header_for(addr))?
        .header("Connection", "close")?
        .build()?;

    tx.send_request(&mut req).await?;
    let mut resp = tx.recv_response().await?;

    if let Some(body) = resp.body_mut() {
        if body.is_network() {
            let data = body.read_all().await?;
            *body = Body::from_bytes(data);
        }
    }

    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::Listener;
    use crate::message::Status;
    use crate::router::{HandlerFuture, Router};
    use crate::server::{serve, ServeOptions};
    use std::sync::Arc;

    fn router() -> Arc<Router> {
        let router = Router::new();
        router
            .add("greet/{name}", |req: Request| -> HandlerFuture {
                Box::pin(async move {
                    let name = req.path_param("name").unwrap_or("stranger").to_string();
                    Response::builder()
                        .with_status(Status::OK)
                        .header("Content-Type", "text/plain")?
                        .with_body(Body::from_string(format!("hi {name}")))
                        .build()
                })
            })
            .unwrap();
        Arc::new(router)
    }

    #[tokio::test]
    async fn get_over_tcp() {
        let listener = Listener::bind(":0").await.unwrap();
        let addr = listener.to_string();
        let server = tokio::spawn(async move {
            let _ = serve(listener, router(), ServeOptions::default()).await;
        });

        let mut resp = get(&addr, "/greet/ferris").await.unwrap();
        assert_eq!(resp.status(), Status::OK);
        let body = resp.body_mut().unwrap().read_all().await.unwrap();
        assert_eq!(&body[..], b"hi ferris");

        server.abort();
    }

    #[tokio::test]
    async fn get_over_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("wire.sock");
        let sock = sock.to_str().unwrap().to_string();

        let listener = Listener::bind(&sock).await.unwrap();
        let server = tokio::spawn(async move {
            let _ = serve(listener, router(), ServeOptions::default()).await;
        });

        let mut resp = get(&sock, "/greet/unix").await.unwrap();
        assert_eq!(resp.status(), Status::OK);
        let body = resp.body_mut().unwrap().read_all().await.unwrap();
        assert_eq!(&body[..], b"hi unix");

        server.abort();
    }
}
