//! Landmark sources: newline-delimited JSON frames from a reader or an
//! extractor subprocess.

use log::{debug, info, warn};
use serde::Deserialize;
use std::{
    io::{self, BufRead, BufReader},
    process::{Child, ChildStdout, Command, Stdio},
    time::Instant,
};
use thiserror::Error;

use crate::landmarks::{Frame, Handedness, LandmarkSet, Point};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read landmark stream: {0}")]
    Io(#[from] io::Error),
    #[error("failed to start extractor {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("extractor sent {got:?} instead of {expected:?}")]
    Handshake { expected: String, got: String },
    #[error("extractor command is empty")]
    EmptyCommand,
}

pub trait LandmarkSource {
    /// `Ok(None)` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct HandJson {
    #[serde(default)]
    handedness: Option<Handedness>,
    #[serde(default)]
    score: Option<f32>,
    landmarks: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct FrameJson {
    #[serde(default)]
    timestamp_ms: Option<u64>,
    #[serde(default)]
    hands: Vec<HandJson>,
}

/// Where frame timestamps come from. Fixed by the first frame of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clock {
    /// Frames carry `timestamp_ms`; a frame without one reuses the last.
    Stream,
    /// Frames are stamped on arrival; any `timestamp_ms` is ignored.
    Local,
}

/// One JSON object per line; lines that fail to parse are skipped.
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    start_instant: Instant,
    line_no: u64,
    clock: Option<Clock>,
    last_ms: u64,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            start_instant: Instant::now(),
            line_no: 0,
            clock: None,
            last_ms: 0,
        }
    }

    fn now_ms(&self) -> u64 {
        self.start_instant.elapsed().as_millis() as u64
    }

    fn read_line(&mut self) -> io::Result<usize> {
        self.line.clear();
        self.line_no += 1;
        self.reader.read_line(&mut self.line)
    }

    fn stamp(&mut self, sent: Option<u64>) -> u64 {
        let clock = *self.clock.get_or_insert_with(|| {
            let clock = if sent.is_some() { Clock::Stream } else { Clock::Local };
            debug!("landmark timestamps: {clock:?} clock");
            clock
        });
        let ts = match (clock, sent) {
            (Clock::Stream, Some(ts)) => ts,
            (Clock::Stream, None) => {
                debug!("line {}: no timestamp_ms, reusing {}ms", self.line_no, self.last_ms);
                self.last_ms
            }
            (Clock::Local, sent) => {
                if sent.is_some() {
                    debug!("line {}: timestamp_ms ignored on a local clock", self.line_no);
                }
                self.now_ms()
            }
        };
        self.last_ms = ts;
        ts
    }
}

fn await_ready<R: BufRead>(lines: &mut JsonLinesSource<R>, expected: &str) -> Result<(), SourceError> {
    lines.read_line()?;
    let got = lines.line.trim();
    if got != expected {
        return Err(SourceError::Handshake {
            expected: expected.to_string(),
            got: got.to_string(),
        });
    }
    Ok(())
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        loop {
            if self.read_line()? == 0 {
                return Ok(None);
            }
            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }
            let parsed: FrameJson = match serde_json::from_str(text) {
                Ok(f) => f,
                Err(e) => {
                    warn!("landmarks line {}: {e}; skipped", self.line_no);
                    continue;
                }
            };
            let hands: Vec<LandmarkSet> = parsed
                .hands
                .into_iter()
                .map(|h| LandmarkSet {
                    points: h.landmarks,
                    handedness: h.handedness,
                    score: h.score,
                })
                .collect();
            for (i, h) in hands.iter().enumerate() {
                if !h.is_complete() {
                    debug!("line {}: hand {i} has {} landmark(s)", self.line_no, h.points.len());
                }
            }
            let timestamp_ms = self.stamp(parsed.timestamp_ms);
            debug!("frame @{timestamp_ms}ms: {} hand(s)", hands.len());
            return Ok(Some(Frame {
                timestamp_ms,
                hands,
            }));
        }
    }
}

/// Runs the landmark extractor and reads its stdout.
pub struct SubprocessSource {
    child: Child,
    lines: JsonLinesSource<BufReader<ChildStdout>>,
}

impl SubprocessSource {
    pub fn spawn(command: &[String], ready_line: Option<&str>) -> Result<Self, SourceError> {
        let (prog, args) = command.split_first().ok_or(SourceError::EmptyCommand)?;
        info!("starting landmark extractor: {}", command.join(" "));
        let mut child = Command::new(prog)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SourceError::Spawn {
                command: command.join(" "),
                source,
            })?;
        let stdout = child.stdout.take().ok_or_else(|| SourceError::Spawn {
            command: command.join(" "),
            source: io::Error::other("stdout not captured"),
        })?;
        let mut lines = JsonLinesSource::new(BufReader::new(stdout));

        if let Some(expected) = ready_line {
            if let Err(e) = await_ready(&mut lines, expected) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
            info!("landmark extractor ready");
        }
        Ok(Self { child, lines })
    }
}

impl LandmarkSource for SubprocessSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        self.lines.next_frame()
    }
}

impl Drop for SubprocessSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
