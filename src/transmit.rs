//! Message framing over a byte stream: serializing start line, headers and
//! body out, and reassembling them back into typed messages on receive.

use chrono::Utc;
use tracing::debug;

use crate::body::Body;
use crate::error::{bad_message, Error, Result};
use crate::headers::value::CONNECTION_CLOSE;
use crate::headers::Headers;
use crate::io::SharedStream;
use crate::message::Status;
use crate::request::Request;
use crate::response::Response;

pub struct Transmitter {
    io: SharedStream,
}

impl Transmitter {
    pub fn new(io: SharedStream) -> Self {
        Transmitter { io }
    }

    /// The stream this transmitter is bound to; network-backed bodies
    /// share it.
    pub fn stream(&self) -> SharedStream {
        self.io.clone()
    }

    /// Reads one line, accepting CRLF or a bare LF terminator, stripped.
    /// End of stream mid-line is a framing violation.
    async fn recv_line(&self, context: &'static str) -> Result<String> {
        let line = self.io.lock().await.read_line().await?;
        match line.strip_suffix('\n') {
            Some(stripped) => Ok(stripped.strip_suffix('\r').unwrap_or(stripped).to_string()),
            None => Err(bad_message(format!("unterminated line while {context}"))),
        }
    }

    async fn send_head(&self, head: &str) -> Result<()> {
        self.io.lock().await.write_all(head.as_bytes()).await
    }

    /// Writes the body. Sized bodies go out raw and must add up to their
    /// advertised length; chunked bodies are framed chunk by chunk and
    /// closed with the zero chunk.
    async fn send_body(&self, body: &mut Body) -> Result<()> {
        let chunked = body.chunked();
        let expected = body.len();
        let mut written: u64 = 0;

        while let Some((chunk, ext)) = body.next_chunk().await? {
            let mut io = self.io.lock().await;
            if chunked {
                let mut head = format!("{:x}", chunk.len());
                if let Some(ext) = &ext {
                    for (name, value) in ext {
                        head.push(';');
                        head.push_str(name);
                        if !value.is_empty() {
                            head.push('=');
                            head.push_str(value);
                        }
                    }
                }
                head.push_str("\r\n");
                io.write_all(head.as_bytes()).await?;
                io.write_all(&chunk).await?;
                io.write_all(b"\r\n").await?;
            } else {
                io.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
        }

        let mut io = self.io.lock().await;
        if chunked {
            io.write_all(b"0\r\n\r\n").await?;
        } else if expected != Some(written) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!(
                    "body write incomplete: {written} of {} bytes",
                    expected.unwrap_or(0)
                ),
            )));
        }
        io.flush().await
    }

    pub async fn send_request(&self, req: &mut Request) -> Result<()> {
        debug!(uri = %req.target(), method = %req.method(), "send request");
        self.send_head(&req.to_string()).await?;
        match req.body_mut() {
            Some(body) => self.send_body(body).await,
            None => self.io.lock().await.flush().await,
        }
    }

    pub async fn send_response(&self, resp: &mut Response) -> Result<()> {
        debug!(status = %resp.status(), "send response");
        self.send_head(&resp.to_string()).await?;
        match resp.body_mut() {
            Some(body) => self.send_body(body).await,
            None => self.io.lock().await.flush().await,
        }
    }

    /// Attaches the right body source for the framing the headers declare:
    /// chunked wins, then a positive `Content-Length`, otherwise no body.
    fn body_for(&self, headers: &Headers) -> Option<Body> {
        if headers.is_chunked() {
            Some(Body::from_chunked_stream(self.io.clone()))
        } else {
            match headers.content_length() {
                Some(length) if length > 0 => Some(Body::from_stream(self.io.clone(), length)),
                _ => None,
            }
        }
    }

    pub async fn recv_request(&self) -> Result<Request> {
        let line = self.recv_line("reading request line").await?;
        let mut builder = Request::builder().request_line(&line)?;

        loop {
            let line = self.recv_line("reading request header").await?;
            if line.is_empty() {
                break;
            }
            builder = builder.header_line(&line)?;
        }

        let mut req = builder.build()?;
        if let Some(body) = self.body_for(req.headers()) {
            req.attach_body(body);
        }

        debug!(uri = %req.target(), method = %req.method(), "received request");
        Ok(req)
    }

    pub async fn recv_response(&self) -> Result<Response> {
        let line = self.recv_line("reading response line").await?;
        let mut builder = Response::builder().response_line(&line)?;

        loop {
            let line = self.recv_line("reading response header").await?;
            if line.is_empty() {
                break;
            }
            builder = builder.header_line(&line)?;
        }

        let mut resp = builder.build()?;
        if let Some(body) = self.body_for(resp.headers()) {
            resp.attach_body(body);
        }

        debug!(status = %resp.status(), "received response");
        Ok(resp)
    }
}

/// Synthesizes the best-effort error reply sent when a message cycle
/// fails before any response byte has been written.
pub fn error_response(status: Status, text: &str) -> Result<Response> {
    let mut headers = Headers::new();
    headers.set_date(Utc::now());
    headers.set_connection(vec![CONNECTION_CLOSE.to_string()]);

    let mut builder = Response::builder().with_status(status).with_headers(headers);

    if !status.forbids_body() && !text.is_empty() {
        builder = builder
            .header("Content-Type", "text/plain")?
            .with_body(Body::from_string(text));
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::ChunkExt;
    use crate::io::Stream;
    use crate::message::Method;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn transmitter_pair() -> (Transmitter, Transmitter) {
        let (a, b) = tokio::io::duplex(16 * 1024);
        (
            Transmitter::new(Stream::shared(Box::new(a), Duration::from_millis(1000))),
            Transmitter::new(Stream::shared(Box::new(b), Duration::from_millis(1000))),
        )
    }

    fn raw_peer() -> (Transmitter, tokio::io::DuplexStream) {
        let (a, b) = tokio::io::duplex(16 * 1024);
        (
            Transmitter::new(Stream::shared(Box::new(a), Duration::from_millis(1000))),
            b,
        )
    }

    #[tokio::test]
    async fn bodyless_request_wire_form() {
        let (tx, mut peer) = raw_peer();
        let mut req = Request::builder()
            .method(Method::Get)
            .uri("/hello.txt")
            .unwrap()
            .build()
            .unwrap();

        tx.send_request(&mut req).await.unwrap();
        drop(tx);

        let mut wire = Vec::new();
        peer.read_to_end(&mut wire).await.unwrap();
        assert_eq!(wire, b"GET /hello.txt HTTP/1.1\r\n\r\n");
    }

    #[tokio::test]
    async fn recv_request_with_no_headers_or_body() {
        let (tx, mut peer) = raw_peer();
        peer.write_all(b"GET /hello.txt HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        let req = tx.recv_request().await.unwrap();
        assert_eq!(req.method(), Method::Get);
        assert_eq!(req.uri().path().get(), "/hello.txt");
        assert_eq!((req.version().major, req.version().minor), (1, 1));
        assert!(req.headers().is_empty());
        assert!(req.body().is_none());
    }

    #[tokio::test]
    async fn bare_lf_lines_are_tolerated_on_read() {
        let (tx, mut peer) = raw_peer();
        peer.write_all(b"GET / HTTP/1.1\nHost: a\n\n").await.unwrap();

        let req = tx.recv_request().await.unwrap();
        assert_eq!(req.headers().host().unwrap().host, "a");
    }

    #[tokio::test]
    async fn sized_body_round_trip() {
        let (client, server) = transmitter_pair();

        let mut req = Request::builder()
            .method(Method::Post)
            .uri("/upload")
            .unwrap()
            .with_body(Body::from_string("payload bytes"))
            .build()
            .unwrap();
        client.send_request(&mut req).await.unwrap();

        let mut got = server.recv_request().await.unwrap();
        assert_eq!(got.headers().content_length(), Some(13));
        let body = got.body_mut().unwrap().read_all().await.unwrap();
        assert_eq!(body, Bytes::from_static(b"payload bytes"));
    }

    #[tokio::test]
    async fn chunked_generator_wire_form() {
        let (tx, mut peer) = raw_peer();

        let mut chunks = vec![
            Some((Bytes::from_static(b"ab"), ChunkExt::new())),
            Some((Bytes::from_static(b"cdef"), ChunkExt::new())),
            Some((Bytes::new(), ChunkExt::new())),
        ]
        .into_iter();
        let mut resp = Response::builder()
            .with_status(Status::OK)
            .with_body(Body::from_generator(Box::new(move || {
                Ok(chunks.next().flatten())
            })))
            .build()
            .unwrap();

        tx.send_response(&mut resp).await.unwrap();
        drop(tx);

        let mut wire = Vec::new();
        peer.read_to_end(&mut wire).await.unwrap();
        let text = String::from_utf8(wire).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nab\r\n4\r\ncdef\r\n0\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn parse_then_reserialize_is_byte_equal() {
        let wire = "POST /submit HTTP/1.1\r\nHost: example.com:8080\r\nContent-Language: en-US, en-UK\r\nContent-Length: 4\r\n\r\nbody";

        let (tx, mut peer) = raw_peer();
        peer.write_all(wire.as_bytes()).await.unwrap();

        let mut req = tx.recv_request().await.unwrap();
        let body = req.body_mut().unwrap().read_all().await.unwrap();

        let head = req.to_string();
        let reserialized = format!("{head}{}", String::from_utf8_lossy(&body));
        assert_eq!(reserialized, wire);
    }

    #[tokio::test]
    async fn chunked_round_trip_with_random_chunks() {
        use rand::Rng;

        let (client, server) = transmitter_pair();

        let mut rng = rand::thread_rng();
        let mut chunks: Vec<(Bytes, ChunkExt)> = Vec::new();
        let mut expected = Vec::new();
        for i in 0..8 {
            let len = rng.gen_range(1..2048);
            let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            expected.extend_from_slice(&data);
            let ext = if rng.gen_bool(0.5) {
                vec![("seq".to_string(), format!("{i}"))]
            } else {
                ChunkExt::new()
            };
            chunks.push((Bytes::from(data), ext));
        }

        let mut iter = chunks.into_iter().map(Some).collect::<Vec<_>>().into_iter();
        let mut resp = Response::builder()
            .with_status(Status::OK)
            .with_body(Body::from_generator(Box::new(move || {
                Ok(iter.next().flatten())
            })))
            .build()
            .unwrap();

        let send = tokio::spawn(async move {
            client.send_response(&mut resp).await.unwrap();
        });

        let mut got = server.recv_response().await.unwrap();
        assert!(got.headers().is_chunked());
        let body = got.body_mut().unwrap().read_all().await.unwrap();
        assert_eq!(body, Bytes::from(expected));

        send.await.unwrap();
    }

    #[tokio::test]
    async fn recv_response_parses_status_line() {
        let (tx, mut peer) = raw_peer();
        peer.write_all(b"HTTP/1.1 200 OK\r\n\r\n").await.unwrap();

        let resp = tx.recv_response().await.unwrap();
        assert_eq!(resp.status(), Status::OK);
        assert_eq!(resp.reason(), "OK");
        assert!(resp.body().is_none());
    }

    #[tokio::test]
    async fn garbage_start_line_is_bad_message() {
        let (tx, mut peer) = raw_peer();
        peer.write_all(b"NOT A REQUEST\r\n\r\n").await.unwrap();

        assert!(matches!(
            tx.recv_request().await,
            Err(Error::BadMessage(_))
        ));
    }

    #[tokio::test]
    async fn error_response_carries_close_and_text() {
        let mut resp = error_response(Status::BAD_REQUEST, "no header field name").unwrap();
        assert_eq!(resp.status(), Status::BAD_REQUEST);
        assert!(resp.headers().close_requested());
        assert!(resp.headers().date().is_some());
        assert_eq!(resp.headers().content_length(), Some(20));

        let body = resp.body_mut().unwrap().read_all().await.unwrap();
        assert_eq!(body, Bytes::from_static(b"no header field name"));
    }
}
