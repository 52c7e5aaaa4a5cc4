//! Forwarding of server output to the log.
//!
//! Go toolchains and user code can emit arbitrary bytes on stdout.
//! `BufReader::lines()` would end the reader task on invalid UTF-8, so
//! lines are read as bytes and decoded lossily.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

/// Forward each line of `stream` to the debug log until EOF.
pub(crate) fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    port: u16,
    stream_type: &'static str,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::with_capacity(1024);

        let reason = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break None,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    debug!(port = %port, %stream_type, "{line}");
                }
                Err(e) => break Some(e),
            }
        };

        match reason {
            None => debug!(port = %port, %stream_type, "Server output closed"),
            Some(e) => debug!(port = %port, %stream_type, error = %e, "Stopped reading server output"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reader_finishes_at_eof_despite_invalid_utf8() {
        let input: &[u8] = b"first line\r\n\xff\xfe broken\nlast without newline";
        let handle = spawn_stream_reader(input, 8080, "stdout");
        handle.await.unwrap();
    }
}
