//! Ingestion sources. Each yields raw payloads (one JSON document each) until
//! end of stream.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

#[async_trait]
pub trait EventSource: Send {
    /// Next raw payload; `Ok(None)` at end of stream. An `Err` means the
    /// connection is gone.
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>>;

    /// Human-readable endpoint for logs and errors.
    fn endpoint(&self) -> &str;
}

/// Open the source named by `endpoint`:
/// `-`/`stdin`, `tcp://host:port`, `file://path` or a bare path.
pub async fn connect(endpoint: &str) -> Result<Box<dyn EventSource>> {
    match endpoint {
        "-" | "stdin" => Ok(Box::new(LineSource::new(
            BufReader::new(tokio::io::stdin()),
            "stdin",
        ))),
        _ => {
            if let Some(addr) = endpoint.strip_prefix("tcp://") {
                let stream = TcpStream::connect(addr)
                    .await
                    .with_context(|| format!("connect to {} failed", addr))?;
                tracing::info!(%addr, "connected to tcp source");
                return Ok(Box::new(LineSource::new(BufReader::new(stream), endpoint)));
            }
            let path = endpoint.strip_prefix("file://").unwrap_or(endpoint);
            let file = File::open(path)
                .await
                .with_context(|| format!("open {} failed", path))?;
            Ok(Box::new(LineSource::new(BufReader::new(file), endpoint)))
        }
    }
}

/// Newline-delimited payloads from any buffered reader. Blank lines are
/// skipped.
pub struct LineSource<R> {
    reader: R,
    endpoint: String,
    buf: Vec<u8>,
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, endpoint: impl Into<String>) -> Self {
        Self {
            reader,
            endpoint: endpoint.into(),
            buf: Vec::new(),
        }
    }
}

#[async_trait]
impl<R> EventSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .with_context(|| format!("read from {} failed", self.endpoint))?;
            if n == 0 {
                return Ok(None);
            }
            let line = self.buf.trim_ascii();
            if !line.is_empty() {
                return Ok(Some(line.to_vec()));
            }
        }
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Fixed sequence of payloads.
#[derive(Debug, Default)]
pub struct IterSource {
    payloads: VecDeque<Vec<u8>>,
}

impl IterSource {
    pub fn new<I, P>(payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        Self {
            payloads: payloads.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl EventSource for IterSource {
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.payloads.pop_front())
    }

    fn endpoint(&self) -> &str {
        "iter"
    }
}

/// Payloads pushed through a tokio channel; ends when every sender is
/// dropped.
pub struct ChannelSource {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next_payload(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.rx.recv().await)
    }

    fn endpoint(&self) -> &str {
        "channel"
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
