//! Newline-terminated line framing shared by every control and handshake
//! exchange. A line is whatever envelope the caller already produced
//! (Base64(RSA(...)) for the first client packet, Base64(AES(...))
//! afterwards) with a trailing `\n` appended on the wire.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("peer closed the connection")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one newline-terminated line, stripping the trailing `\n`/`\r\n`.
/// Returns `FramingError::Closed` on EOF with no bytes read.
pub async fn read_line<R>(reader: &mut R) -> Result<String, FramingError>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(FramingError::Closed);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

/// Write one line followed by `\n` and flush.
pub async fn write_line<W>(writer: &mut W, line: &str) -> Result<(), FramingError>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn writes_and_reads_a_line() {
        let mut buf = Vec::new();
        write_line(&mut buf, "hello").await.unwrap();
        assert_eq!(buf, b"hello\n");

        let mut reader = BufReader::new(&buf[..]);
        let line = read_line(&mut reader).await.unwrap();
        assert_eq!(line, "hello");
    }

    #[tokio::test]
    async fn empty_read_is_closed() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(matches!(read_line(&mut reader).await, Err(FramingError::Closed)));
    }
}
