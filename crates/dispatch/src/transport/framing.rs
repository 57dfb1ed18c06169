//! Bounded line reads for newline-delimited frames.

use std::io;

use {
    pinion_protocol::MAX_PAYLOAD_BYTES,
    tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt},
};

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LineRead {
    Eof,
    /// One complete line (or the unterminated tail before EOF) is in the buffer.
    Line,
    /// The line exceeded the frame limit and was skipped up to its newline.
    TooLong,
}

/// Read one line into `buf`, buffering at most one frame's worth of bytes.
pub(crate) async fn read_frame_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    // A full frame plus its newline.
    let limit = MAX_PAYLOAD_BYTES + 1;
    let read = (&mut *reader).take(limit as u64).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.ends_with(b"\n") || read < limit {
        return Ok(LineRead::Line);
    }
    skip_line(reader).await?;
    buf.clear();
    Ok(LineRead::TooLong)
}

async fn skip_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok(());
        }
        if let Some(i) = chunk.iter().position(|b| *b == b'\n') {
            reader.consume(i + 1);
            return Ok(());
        }
        let n = chunk.len();
        reader.consume(n);
    }
}
