use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::RunnerError;
use crate::util::RingBytes;

use super::types::Channel;

#[derive(Debug)]
pub struct LineTap {
    pub line: String,
    pub channel: Channel,
}

/// Spawns a task that splits `rd` into lines and forwards them, in order, to
/// `line_tx`. Resolves to the number of lines forwarded.
///
/// When `tail` is set, every line is also kept in the ring buffer.
pub fn pump_lines<R>(
    mut rd: R,
    channel: Channel,
    tail: Option<Arc<RingBytes>>,
    line_tx: mpsc::Sender<LineTap>,
) -> JoinHandle<Result<u64, RunnerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let label = channel.as_str();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut lines = 0u64;
        let mut line_buf: Vec<u8> = Vec::with_capacity(8 * 1024);

        loop {
            let n = match rd.read(&mut buf).await {
                Ok(n) => n,
                Err(source) => {
                    // Hand over what was read so far before reporting the error.
                    flush_partial(&mut line_buf, channel, tail.as_deref(), &line_tx).await;
                    return Err(RunnerError::StreamIo {
                        stream: label,
                        source,
                    });
                }
            };
            if n == 0 {
                break;
            }

            line_buf.extend_from_slice(&buf[..n]);
            while let Some(pos) = line_buf.iter().position(|&b| b == b'\n') {
                let mut one = line_buf.drain(..=pos).collect::<Vec<u8>>();
                trim_newline(&mut one);
                let line = String::from_utf8_lossy(&one).into_owned();
                if let Some(ring) = tail.as_deref() {
                    ring.push_line(&line);
                }
                if line_tx.send(LineTap { line, channel }).await.is_err() {
                    // Receiver gone: the stage is over, nothing left to forward to.
                    return Ok(lines);
                }
                lines += 1;
            }
        }

        if flush_partial(&mut line_buf, channel, tail.as_deref(), &line_tx).await {
            lines += 1;
        }

        Ok(lines)
    })
}

/// EOF flush: deliver the last partial line if it doesn't end with '\n'.
async fn flush_partial(
    line_buf: &mut Vec<u8>,
    channel: Channel,
    tail: Option<&RingBytes>,
    line_tx: &mpsc::Sender<LineTap>,
) -> bool {
    trim_newline(line_buf);
    if line_buf.is_empty() {
        return false;
    }
    let line = String::from_utf8_lossy(line_buf).into_owned();
    line_buf.clear();
    if let Some(ring) = tail {
        ring.push_line(&line);
    }
    line_tx.send(LineTap { line, channel }).await.is_ok()
}

fn trim_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn flushes_last_line_without_newline_on_eof() {
        let (mut wr, rd) = tokio::io::duplex(1024);
        let (tx, mut rx) = mpsc::channel::<LineTap>(8);

        let task = pump_lines(rd, Channel::Primary, None, tx);

        wr.write_all(b"hello").await.unwrap();
        drop(wr);

        let tap = rx.recv().await.expect("expected one line");
        assert_eq!(tap.line, "hello");
        assert_eq!(tap.channel, Channel::Primary);

        assert_eq!(task.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn strips_crlf_and_keeps_order() {
        let (mut wr, rd) = tokio::io::duplex(1024);
        let (tx, mut rx) = mpsc::channel::<LineTap>(8);
        let tail = RingBytes::new(64);

        let task = pump_lines(rd, Channel::Diagnostic, Some(tail.clone()), tx);

        wr.write_all(b"10%\r\n20%\r\n\n30%\n").await.unwrap();
        drop(wr);

        let mut got = Vec::new();
        while let Some(tap) = rx.recv().await {
            got.push(tap.line);
        }
        assert_eq!(got, vec!["10%", "20%", "", "30%"]);
        assert_eq!(task.await.unwrap().unwrap(), 4);
        assert_eq!(tail.to_string_lossy(), "10%\n20%\n\n30%\n");
    }

    #[tokio::test]
    async fn lines_split_across_reads_are_joined() {
        let (mut wr, rd) = tokio::io::duplex(4);
        let (tx, mut rx) = mpsc::channel::<LineTap>(8);

        let task = pump_lines(rd, Channel::Primary, None, tx);
        let writer = tokio::spawn(async move {
            wr.write_all(b"rnbqkbnr/pppppppp w - -\n").await.unwrap();
        });

        let tap = rx.recv().await.unwrap();
        assert_eq!(tap.line, "rnbqkbnr/pppppppp w - -");
        writer.await.unwrap();
        assert_eq!(task.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn read_error_flushes_partial_line_then_reports() {
        let rd = tokio_test::io::Builder::new()
            .read(b"12/40\nhalf a li")
            .read_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "worker vanished",
            ))
            .build();
        let (tx, mut rx) = mpsc::channel::<LineTap>(8);

        let task = pump_lines(rd, Channel::Diagnostic, None, tx);

        assert_eq!(rx.recv().await.unwrap().line, "12/40");
        assert_eq!(rx.recv().await.unwrap().line, "half a li");
        match task.await.unwrap() {
            Err(RunnerError::StreamIo { stream, source }) => {
                assert_eq!(stream, "stderr");
                assert_eq!(source.kind(), std::io::ErrorKind::BrokenPipe);
            }
            other => panic!("expected stream error, got {other:?}"),
        }
    }
}
