//! Buffered, deadline-bounded byte-stream I/O. Every operation suspends at
//! most up to the configured timeout and then surfaces `Error::Timeout`;
//! OS-level failures come through as `Error::Io` with their kind intact.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::listener::AsyncReadWriteBox;

const READ_BUFFER_SIZE: usize = 8192;

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// A `Stream` shared between a transmitter and the network-backed body it
/// hands out. Messages on one connection are serialized, so the lock is
/// uncontended in practice.
pub type SharedStream = Arc<Mutex<Stream>>;

pub struct Stream {
    io: AsyncReadWriteBox,
    buf: Vec<u8>,
    pos: usize,
    timeout: Duration,
}

async fn deadline<T>(
    limit: Duration,
    what: &'static str,
    fut: impl Future<Output = std::io::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Error::Io(err)),
        Err(_) => Err(Error::Timeout(what)),
    }
}

impl Stream {
    pub fn new(io: AsyncReadWriteBox, timeout: Duration) -> Self {
        Stream {
            io,
            buf: Vec::new(),
            pos: 0,
            timeout,
        }
    }

    pub fn shared(io: AsyncReadWriteBox, timeout: Duration) -> SharedStream {
        Arc::new(Mutex::new(Stream::new(io, timeout)))
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Pulls more bytes off the wire into the internal buffer. Returns the
    /// number of bytes added; zero means end of stream.
    async fn fill(&mut self) -> Result<usize> {
        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }
        let mut scratch = [0u8; READ_BUFFER_SIZE];
        let n = deadline(self.timeout, "reading", self.io.read(&mut scratch)).await?;
        self.buf.extend_from_slice(&scratch[..n]);
        Ok(n)
    }

    /// Reads up to `buf.len()` bytes. Returns 0 only at end of stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.buffered() == 0 && self.fill().await? == 0 {
            return Ok(0);
        }
        let n = self.buffered().min(buf.len());
        buf[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    /// Reads exactly `buf.len()` bytes or fails with `UnexpectedEof`.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut got = 0;
        while got < buf.len() {
            let n = self.read(&mut buf[got..]).await?;
            if n == 0 {
                return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
            got += n;
        }
        Ok(())
    }

    /// Reads a line up to and including `\n`. At end of stream a partial
    /// line is returned as-is; end of stream before any byte is
    /// `UnexpectedEof`.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        loop {
            if self.buffered() == 0 && self.fill().await? == 0 {
                if line.is_empty() {
                    return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }

            let chunk = &self.buf[self.pos..];
            match chunk.iter().position(|&c| c == b'\n') {
                Some(nl) => {
                    line.extend_from_slice(&chunk[..=nl]);
                    self.pos += nl + 1;
                    return Ok(String::from_utf8_lossy(&line).into_owned());
                }
                None => {
                    line.extend_from_slice(chunk);
                    self.pos = self.buf.len();
                }
            }
        }
    }

    pub async fn get_char(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte).await?;
        Ok(byte[0])
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        deadline(self.timeout, "writing", self.io.write_all(buf)).await
    }

    pub async fn flush(&mut self) -> Result<()> {
        deadline(self.timeout, "flushing", self.io.flush()).await
    }

    /// Control-channel primitives: big-endian integers.
    pub async fn read_u16(&mut self) -> Result<u16> {
        let mut bytes = [0u8; 2];
        self.read_exact(&mut bytes).await?;
        Ok(u16::from_be_bytes(bytes))
    }

    pub async fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_all(&value.to_be_bytes()).await
    }

    pub async fn read_u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_exact(&mut bytes).await?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub async fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_be_bytes()).await
    }

    pub async fn read_u64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        self.read_exact(&mut bytes).await?;
        Ok(u64::from_be_bytes(bytes))
    }

    pub async fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_all(&value.to_be_bytes()).await
    }

    /// Control-channel primitive: a u32 length prefix followed by that
    /// many bytes.
    pub async fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32().await? as usize;
        let mut bytes = vec![0u8; len];
        self.read_exact(&mut bytes).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_u32(value.len() as u32).await?;
        self.write_all(value.as_bytes()).await
    }
}
