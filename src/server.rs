//! The serving loop: accept connections, run the receive → route → send
//! cycle per connection, map engine errors onto wire responses.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::body::Body;
use crate::error::{Error, Result};
use crate::io::{Stream, DEFAULT_TIMEOUT_MS};
use crate::listener::{AsyncReadWriteBox, Listener};
use crate::router::Router;
use crate::transmit::{error_response, Transmitter};

#[derive(Clone, Debug, bon::Builder)]
pub struct ServeOptions {
    /// Per-call I/O deadline, milliseconds.
    #[builder(default = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
    /// Serve multiple messages per connection unless the peer asks to
    /// close.
    #[builder(default = true)]
    pub keep_alive: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        ServeOptions::builder().build()
    }
}

/// Accepts connections forever, one tokio task per connection. Within a
/// connection, messages are strictly serialized: the next receive does
/// not start until the previous response is fully written.
pub async fn serve(mut listener: Listener, router: Arc<Router>, options: ServeOptions) -> Result<()> {
    info!(addr = %listener, "listening");

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!(?addr, "accepted connection");

        let router = router.clone();
        let options = options.clone();
        tokio::spawn(async move {
            if let Err(err) = connection(stream, router, options).await {
                warn!(%err, ?addr, "connection closed on error");
            }
        });
    }
}

async fn connection(
    stream: AsyncReadWriteBox,
    router: Arc<Router>,
    options: ServeOptions,
) -> Result<()> {
    let io = Stream::shared(stream, Duration::from_millis(options.timeout_ms));
    let tx = Transmitter::new(io);

    loop {
        let mut req = match tx.recv_request().await {
            Ok(req) => req,
            // clean close between messages
            Err(Error::Io(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(())
            }
            Err(err) if err.is_connection_fatal() => return Err(err),
            Err(err) => {
                respond_with_error(&tx, &err).await;
                return Err(err);
            }
        };

        // Buffer the request body off the wire before dispatch, so an
        // uninterested handler cannot leave stray bytes in front of the
        // next message.
        if let Some(body) = req.body_mut() {
            if body.is_network() {
                let data = body.read_all().await?;
                *body = Body::from_bytes(data);
            }
        }

        let close_requested = req.headers().close_requested();

        let mut resp = match router.handle(req).await {
            Ok(resp) => resp,
            // a timed-out handler closes without a reply; other I/O
            // failures still get a best-effort 500 before the close
            Err(err @ Error::Timeout(_)) => return Err(err),
            Err(err) if err.is_connection_fatal() => {
                respond_with_error(&tx, &err).await;
                return Err(err);
            }
            Err(err) => {
                debug!(%err, "handler error");
                match error_response(err.status(), &err.to_string()) {
                    Ok(resp) => resp,
                    Err(err) => return Err(err),
                }
            }
        };

        tx.send_response(&mut resp).await?;

        if close_requested || resp.headers().close_requested() || !options.keep_alive {
            return Ok(());
        }
    }
}

/// Best-effort error reply for a cycle that failed before any response
/// byte went out. One synthesized response is attempted and the
/// connection closes either way.
async fn respond_with_error(tx: &Transmitter, err: &Error) {
    if let Ok(mut resp) = error_response(err.status(), &err.to_string()) {
        if let Err(send_err) = tx.send_response(&mut resp).await {
            debug!(%send_err, "error response could not be written");
        }
    }
}
