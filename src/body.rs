//! Message bodies as lazy chunk sources. Every variant yields
//! `(bytes, chunk-extensions)` pairs on demand and advertises whether it
//! is chunked and, if not, its total length.

use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;

use crate::error::{bad_message, Error, Result};
use crate::io::SharedStream;
use crate::scanner::{Params, Scanner};

/// Read granularity for file- and network-backed bodies.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Extensions attached to a chunk, as `name=value` pairs.
pub type ChunkExt = Params;

/// A producer of body chunks. Signals completion by returning `Ok(None)`
/// or an empty chunk.
pub type GeneratorFn = Box<dyn FnMut() -> Result<Option<(Bytes, ChunkExt)>> + Send>;

enum ChunkState {
    Head,
    Data {
        remaining: u64,
        ext: Option<ChunkExt>,
    },
    Done,
}

enum Source {
    Buffer {
        data: Bytes,
        consumed: bool,
    },
    File {
        file: tokio::fs::File,
        path: PathBuf,
        size: u64,
        read: u64,
    },
    Generator {
        produce: GeneratorFn,
        done: bool,
    },
    /// Length-delimited read from an upstream byte stream.
    Stream {
        io: SharedStream,
        length: u64,
        read: u64,
    },
    /// RFC 7230 chunked framing read from an upstream byte stream.
    Chunked {
        io: SharedStream,
        state: ChunkState,
    },
}

pub struct Body {
    source: Source,
}

impl Body {
    pub fn from_bytes(data: impl Into<Bytes>) -> Body {
        Body {
            source: Source::Buffer {
                data: data.into(),
                consumed: false,
            },
        }
    }

    pub fn from_string(data: impl Into<String>) -> Body {
        Body::from_bytes(data.into().into_bytes())
    }

    /// Opens `path` and serves its content in slices of at most 64 KiB.
    /// The length is the file size at open time.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Body> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::File::open(&path).await?;
        let size = file.metadata().await?.len();
        Ok(Body {
            source: Source::File {
                file,
                path,
                size,
                read: 0,
            },
        })
    }

    pub fn from_generator(produce: GeneratorFn) -> Body {
        Body {
            source: Source::Generator {
                produce,
                done: false,
            },
        }
    }

    pub fn from_stream(io: SharedStream, length: u64) -> Body {
        Body {
            source: Source::Stream {
                io,
                length,
                read: 0,
            },
        }
    }

    pub fn from_chunked_stream(io: SharedStream) -> Body {
        Body {
            source: Source::Chunked {
                io,
                state: ChunkState::Head,
            },
        }
    }

    /// Whether this body uses chunked framing on the wire.
    pub fn chunked(&self) -> bool {
        matches!(
            self.source,
            Source::Generator { .. } | Source::Chunked { .. }
        )
    }

    /// Total length, when known up front.
    pub fn len(&self) -> Option<u64> {
        match &self.source {
            Source::Buffer { data, .. } => Some(data.len() as u64),
            Source::File { size, .. } => Some(*size),
            Source::Stream { length, .. } => Some(*length),
            Source::Generator { .. } | Source::Chunked { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Whether this body still reads from an upstream byte stream.
    pub fn is_network(&self) -> bool {
        matches!(self.source, Source::Stream { .. } | Source::Chunked { .. })
    }

    /// Produces the next chunk, or `None` once the body is exhausted.
    /// Chunk extensions accompany the first slice of each wire chunk.
    pub async fn next_chunk(&mut self) -> Result<Option<(Bytes, Option<ChunkExt>)>> {
        match &mut self.source {
            Source::Buffer { data, consumed } => {
                if *consumed || data.is_empty() {
                    return Ok(None);
                }
                *consumed = true;
                Ok(Some((data.clone(), None)))
            }

            Source::File {
                file,
                path,
                size,
                read,
            } => {
                if *read >= *size {
                    return Ok(None);
                }
                let mut buf = vec![0u8; CHUNK_SIZE.min((*size - *read) as usize)];
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("file ({}) truncated at offset {read}", path.display()),
                    )));
                }
                *read += n as u64;
                buf.truncate(n);
                Ok(Some((Bytes::from(buf), None)))
            }

            Source::Generator { produce, done } => {
                if *done {
                    return Ok(None);
                }
                match produce()? {
                    Some((data, ext)) if !data.is_empty() => {
                        let ext = if ext.is_empty() { None } else { Some(ext) };
                        Ok(Some((data, ext)))
                    }
                    _ => {
                        *done = true;
                        Ok(None)
                    }
                }
            }

            Source::Stream { io, length, read } => {
                if *read >= *length {
                    return Ok(None);
                }
                let to_read = CHUNK_SIZE.min((*length - *read) as usize);
                let mut buf = vec![0u8; to_read];
                let n = io.lock().await.read(&mut buf).await?;
                if n == 0 {
                    return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
                }
                *read += n as u64;
                buf.truncate(n);
                Ok(Some((Bytes::from(buf), None)))
            }

            Source::Chunked { io, state } => loop {
                match state {
                    ChunkState::Done => return Ok(None),

                    ChunkState::Head => {
                        let mut stream = io.lock().await;
                        let line = stream.read_line().await?;
                        let (size, ext) = parse_chunk_head(&line)?;

                        if size == 0 {
                            if stream.get_char().await? != b'\r'
                                || stream.get_char().await? != b'\n'
                            {
                                return Err(bad_message("message body not terminated properly"));
                            }
                            *state = ChunkState::Done;
                            return Ok(None);
                        }

                        *state = ChunkState::Data {
                            remaining: size,
                            ext: if ext.is_empty() { None } else { Some(ext) },
                        };
                    }

                    ChunkState::Data { remaining, ext } => {
                        let mut stream = io.lock().await;
                        let to_read = CHUNK_SIZE.min(*remaining as usize);
                        let mut buf = vec![0u8; to_read];
                        stream.read_exact(&mut buf).await?;
                        *remaining -= to_read as u64;
                        let ext = ext.take();

                        if *remaining == 0 {
                            if stream.get_char().await? != b'\r'
                                || stream.get_char().await? != b'\n'
                            {
                                return Err(bad_message("chunk data not terminated properly"));
                            }
                            *state = ChunkState::Head;
                        }

                        return Ok(Some((Bytes::from(buf), ext)));
                    }
                }
            },
        }
    }

    /// Drains the body into a single buffer.
    pub async fn read_all(&mut self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        while let Some((chunk, _)) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Source::Buffer { data, .. } => {
                f.debug_struct("Buffer").field("len", &data.len()).finish()
            }
            Source::File { path, size, .. } => f
                .debug_struct("File")
                .field("path", path)
                .field("size", size)
                .finish(),
            Source::Generator { .. } => f.debug_struct("Generator").finish_non_exhaustive(),
            Source::Stream { length, read, .. } => f
                .debug_struct("Stream")
                .field("length", length)
                .field("read", read)
                .finish(),
            Source::Chunked { .. } => f.debug_struct("Chunked").finish_non_exhaustive(),
        }
    }
}

/// `chunk-size *( ";" param ) CRLF`
fn parse_chunk_head(line: &str) -> Result<(u64, ChunkExt)> {
    let mut scn = Scanner::new(line);

    let size = scn
        .read_chunk_size()
        .ok_or_else(|| bad_message("no chunk size"))?;

    let ext = if scn.read_special(b';') {
        scn.read_parameters()?
    } else {
        ChunkExt::new()
    };

    if !scn.read_crlf() {
        return Err(bad_message("chunk size line not terminated properly"));
    }

    Ok((size, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Stream;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn shared_pair() -> (tokio::io::DuplexStream, SharedStream) {
        let (client, server) = tokio::io::duplex(4096);
        (
            client,
            Stream::shared(Box::new(server), Duration::from_millis(1000)),
        )
    }

    #[tokio::test]
    async fn buffer_body_emits_once() {
        let mut body = Body::from_string("hello");
        assert!(!body.chunked());
        assert_eq!(body.len(), Some(5));

        let (chunk, ext) = body.next_chunk().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"hello");
        assert!(ext.is_none());
        assert!(body.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_buffer_body_is_empty() {
        let mut body = Body::from_bytes(Bytes::new());
        assert!(body.is_empty());
        assert!(body.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn generator_body_stops_on_empty_chunk() {
        let mut chunks = vec![
            Some((Bytes::from_static(b"ab"), ChunkExt::new())),
            Some((Bytes::from_static(b"cdef"), ChunkExt::new())),
            Some((Bytes::new(), ChunkExt::new())),
        ]
        .into_iter();

        let mut body = Body::from_generator(Box::new(move || Ok(chunks.next().flatten())));
        assert!(body.chunked());
        assert_eq!(body.len(), None);

        assert_eq!(
            body.read_all().await.unwrap(),
            Bytes::from_static(b"abcdef")
        );
        assert!(body.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn generator_failure_surfaces() {
        let mut body = Body::from_generator(Box::new(|| {
            Err(crate::error::bad_message("generator blew up"))
        }));
        assert!(body.next_chunk().await.is_err());
    }

    #[tokio::test]
    async fn file_body_reports_size_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.txt");
        std::fs::write(&path, b"file payload").unwrap();

        let mut body = Body::from_file(&path).await.unwrap();
        assert_eq!(body.len(), Some(12));
        assert!(!body.chunked());
        assert_eq!(
            body.read_all().await.unwrap(),
            Bytes::from_static(b"file payload")
        );
    }

    #[tokio::test]
    async fn length_delimited_stream_stops_at_length() {
        let (mut client, io) = shared_pair();
        client.write_all(b"0123456789extra").await.unwrap();

        let mut body = Body::from_stream(io, 10);
        assert!(body.is_network());
        assert_eq!(body.len(), Some(10));
        assert_eq!(
            body.read_all().await.unwrap(),
            Bytes::from_static(b"0123456789")
        );
    }

    #[tokio::test]
    async fn chunked_stream_reads_wire_framing() {
        let (mut client, io) = shared_pair();
        client
            .write_all(b"2\r\nab\r\n4\r\ncdef\r\n0\r\n\r\n")
            .await
            .unwrap();

        let mut body = Body::from_chunked_stream(io);
        assert!(body.chunked());

        let (chunk, ext) = body.next_chunk().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"ab");
        assert!(ext.is_none());

        let (chunk, _) = body.next_chunk().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"cdef");

        assert!(body.next_chunk().await.unwrap().is_none());
        // stays exhausted
        assert!(body.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chunk_extensions_ride_the_first_slice() {
        let (mut client, io) = shared_pair();
        client
            .write_all(b"3;part=one\r\nabc\r\n0\r\n\r\n")
            .await
            .unwrap();

        let mut body = Body::from_chunked_stream(io);
        let (chunk, ext) = body.next_chunk().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"abc");
        assert_eq!(ext.unwrap(), vec![("part".to_string(), "one".to_string())]);
    }

    #[tokio::test]
    async fn malformed_chunk_head_is_bad_message() {
        let (mut client, io) = shared_pair();
        client.write_all(b"zz\r\n").await.unwrap();

        let mut body = Body::from_chunked_stream(io);
        assert!(matches!(body.next_chunk().await, Err(Error::BadMessage(_))));
    }

    #[tokio::test]
    async fn missing_final_crlf_is_bad_message() {
        let (mut client, io) = shared_pair();
        client.write_all(b"0\r\nxx").await.unwrap();

        let mut body = Body::from_chunked_stream(io);
        assert!(matches!(body.next_chunk().await, Err(Error::BadMessage(_))));
    }
}
