//! Line-oriented serial receiver
//!
//! Bytes arrive in arbitrary chunks; `\r` or `\n` ends a line. Empty lines
//! (including the second half of `\r\n`) are skipped. A line that reaches
//! the length limit is delivered as-is and the remainder starts a new
//! line. Invalid UTF-8 is replaced rather than rejected.

use std::io::Read;

use eventkit_core::{Contract, Scheduler, SignalSource};

use crate::error::{DeviceError, DeviceResult};

pub const DEFAULT_MAX_LINE: usize = 256;

/// Splits a byte stream into lines
#[derive(Debug, Clone)]
pub struct LineAssembler {
    buf: Vec<u8>,
    max_line: usize,
}

impl LineAssembler {
    pub fn new(max_line: usize) -> DeviceResult<Self> {
        if max_line == 0 {
            return Err(DeviceError::InvalidParameter {
                parameter: "line length",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(Self {
            buf: Vec::with_capacity(max_line),
            max_line,
        })
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\r' || byte == b'\n' {
                if let Some(line) = self.take() {
                    lines.push(line);
                }
                continue;
            }

            self.buf.push(byte);
            if self.buf.len() >= self.max_line {
                if let Some(line) = self.take() {
                    lines.push(line);
                }
            }
        }
        lines
    }

    /// Flush a trailing unterminated line, e.g. at end of stream
    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Some(line)
    }
}

/// Driver half of a serial line receiver
#[derive(Debug)]
pub struct SerialLines {
    name: String,
    assembler: LineAssembler,
    source: SignalSource<String>,
}

impl SerialLines {
    /// Register a serial receiver. Each complete line is one item on the
    /// returned contract.
    pub fn attach(
        scheduler: &mut Scheduler,
        name: impl Into<String>,
        max_line: usize,
    ) -> DeviceResult<(Contract<String>, Self)> {
        let assembler = LineAssembler::new(max_line)?;
        let (contract, source) = scheduler.signal::<String>()?.into_parts();
        let name = name.into();
        tracing::debug!("Serial {} attached as {}", name, contract);
        Ok((
            contract,
            Self {
                name,
                assembler,
                source,
            },
        ))
    }

    /// Feed received bytes. Returns how many lines reached the loop.
    pub fn feed(&mut self, bytes: &[u8]) -> DeviceResult<usize> {
        if self.source.is_closed() {
            return Err(DeviceError::Detached(format!("serial {}", self.name)));
        }
        let lines = self.assembler.feed(bytes);
        Ok(lines
            .into_iter()
            .map(|line| self.source.fire(line))
            .filter(|delivered| *delivered)
            .count())
    }

    /// Pump `reader` until end of stream or until the loop detaches.
    /// A trailing unterminated line is delivered at end of stream.
    pub fn pump<R: Read>(&mut self, mut reader: R) -> DeviceResult<usize> {
        let mut chunk = [0u8; 64];
        let mut delivered = 0;
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            delivered += self.feed(&chunk[..n])?;
        }

        if let Some(line) = self.assembler.finish() {
            if self.source.fire(line) {
                delivered += 1;
            }
        }
        tracing::debug!("Serial {} reached end of stream", self.name);
        Ok(delivered)
    }
}
