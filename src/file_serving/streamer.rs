//! Streaming transfer that hashes in-line with transmission.
//!
//! Hashing a file is too expensive to do as a separate pass, so the digest
//! is computed from the same chunks that go out on the wire and cached for
//! subsequent requests.

use sha1::{Digest, Sha1};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on bytes held in flight between source and sink.
pub const DEFAULT_HIGH_WATER: usize = 64 * 1024;

/// Result of a completed pump: total bytes moved and the lower-case hex
/// SHA-1 of exactly those bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpSummary {
    pub hash: String,
    pub bytes: u64,
}

/// Moves every byte from `source` to `sink`, feeding each chunk into a
/// running SHA-1. At most `high_water` bytes are buffered: the next read
/// only happens once the sink has accepted the previous chunk, so a slow
/// consumer stalls the producer instead of growing a queue.
///
/// One-shot. The digest exists only after the source is exhausted; any
/// read or write failure aborts the transfer and the partial digest is
/// dropped with the hasher. The source is closed when this returns.
pub async fn pump<R, W>(mut source: R, sink: &mut W, high_water: usize) -> io::Result<PumpSummary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; high_water.max(1)];
    let mut bytes: u64 = 0;

    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        sink.write_all(&buf[..n]).await?;
        bytes += n as u64;
    }
    sink.flush().await?;

    Ok(PumpSummary {
        hash: hex::encode(hasher.finalize()),
        bytes,
    })
}
