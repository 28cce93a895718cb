use anyhow::{Result, anyhow};
use log::{error, info};
use serde::Serialize;
use std::{
    fs,
    io::{BufRead, BufReader, ErrorKind, Write},
    os::unix::net::{UnixListener, UnixStream},
    path::PathBuf,
    time::Duration,
};

use crate::engine::FrameReport;
use crate::gestures::GestureLabel;

const CLIENT_TIMEOUT: Duration = Duration::from_millis(200);

/// Latest frame as seen by `handctl status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Status {
    pub label: GestureLabel,
    pub caption: &'static str,
    pub brightness: u8,
    pub hands: usize,
    pub frames: u64,
    pub source: String,
    pub dry_run: bool,
}

impl Status {
    /// Returns true when the displayed label changed.
    pub fn record(&mut self, report: FrameReport) -> bool {
        let changed = self.frames == 0 || report.label != self.label;
        self.label = report.label;
        self.caption = report.label.caption();
        self.brightness = report.brightness;
        self.hands = report.hands;
        self.frames += 1;
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Shutdown,
}

/// Non-blocking control socket, polled once per frame.
pub struct ControlServer {
    listener: UnixListener,
    path: PathBuf,
}

impl ControlServer {
    pub fn bind(path: PathBuf) -> Result<Self> {
        if path.exists() {
            if UnixStream::connect(&path).is_ok() {
                return Err(anyhow!(
                    "handctl is already running (socket {})",
                    path.display()
                ));
            }
            let _ = fs::remove_file(&path);
        }
        let listener = UnixListener::bind(&path)?;
        listener.set_nonblocking(true)?;
        info!("control socket listening on {}", path.display());
        Ok(Self { listener, path })
    }

    pub fn poll(&self, status: &Status) -> Control {
        let mut ctl = Control::Continue;
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => match handle_client(stream, status) {
                    Ok(Control::Shutdown) => ctl = Control::Shutdown,
                    Ok(Control::Continue) => {}
                    Err(e) => error!("ipc client error: {e}"),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!("ipc accept failed: {e}");
                    break;
                }
            }
        }
        ctl
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn handle_client(mut stream: UnixStream, status: &Status) -> Result<Control> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(Control::Continue);
    }
    let req: serde_json::Value = serde_json::from_str(&line)?;
    let (resp, ctl) = respond(&req, status);
    writeln!(stream, "{resp}")?;
    Ok(ctl)
}

pub fn respond(req: &serde_json::Value, status: &Status) -> (serde_json::Value, Control) {
    let op = req.get("op").and_then(|v| v.as_str()).unwrap_or("");
    match op {
        "status" => (
            serde_json::json!({"ok": true, "data": status}),
            Control::Continue,
        ),
        "shutdown" => (
            serde_json::json!({"ok": true, "data": "shutting down"}),
            Control::Shutdown,
        ),
        _ => (
            serde_json::json!({"ok": false, "error": format!("unknown op: {op}")}),
            Control::Continue,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(label: GestureLabel, brightness: u8) -> FrameReport {
        FrameReport {
            label,
            brightness,
            hands: 1,
        }
    }

    #[test]
    fn record_tracks_label_changes() {
        let mut st = Status::default();
        assert!(st.record(report(GestureLabel::None, 50)));
        assert!(!st.record(report(GestureLabel::None, 50)));
        assert!(st.record(report(GestureLabel::ThumbUp, 50)));
        assert_eq!(st.caption, "Thumbs Up (Increase Volume)");
        assert_eq!(st.frames, 3);
    }

    #[test]
    fn status_and_shutdown_ops() {
        let mut st = Status::default();
        st.record(report(GestureLabel::HandOpen, 60));

        let (resp, ctl) = respond(&json!({"op": "status"}), &st);
        assert_eq!(ctl, Control::Continue);
        assert_eq!(resp["ok"], json!(true));
        assert_eq!(resp["data"]["label"], json!("hand_open"));
        assert_eq!(resp["data"]["brightness"], json!(60));

        let (_, ctl) = respond(&json!({"op": "shutdown"}), &st);
        assert_eq!(ctl, Control::Shutdown);

        let (resp, ctl) = respond(&json!({"op": "reboot"}), &st);
        assert_eq!(ctl, Control::Continue);
        assert_eq!(resp["ok"], json!(false));
    }

    #[test]
    fn socket_roundtrip() {
        let path = std::env::temp_dir().join(format!("handctl-test-{}.sock", std::process::id()));
        let server = ControlServer::bind(path.clone()).unwrap();
        assert!(ControlServer::bind(path.clone()).is_err());

        let mut client = UnixStream::connect(&path).unwrap();
        client.write_all(b"{\"op\":\"shutdown\"}\n").unwrap();
        assert_eq!(server.poll(&Status::default()), Control::Shutdown);

        let mut resp = String::new();
        BufReader::new(client).read_line(&mut resp).unwrap();
        let v: serde_json::Value = serde_json::from_str(&resp).unwrap();
        assert_eq!(v["data"], json!("shutting down"));

        assert_eq!(server.poll(&Status::default()), Control::Continue);
        drop(server);
        assert!(!path.exists());
    }
}
