use anyhow::{Context, Result};
use log::{debug, info, warn};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use super::runtime::socket_path;
use super::server::{Control, ControlServer, Status};
use crate::actions::{DryRunActions, HostActions, HostExecutor};
use crate::config::{Config, ConfigState};
use crate::engine::Engine;
use crate::input::{JsonLinesSource, LandmarkSource, SubprocessSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides the configured extractor command.
    pub input: Option<InputSpec>,
    pub dry_run: bool,
    pub control_socket: bool,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let state = ConfigState::load_or_install_default()?;
    let cfg = &state.config;
    let dry_run = opts.dry_run || cfg.actions.dry_run;

    let quit = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&quit))?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&quit))?;

    let control = if opts.control_socket {
        Some(ControlServer::bind(socket_path()?)?)
    } else {
        None
    };

    let (mut source, source_name) = open_source(opts.input.as_ref(), cfg)?;
    let mut actions = open_actions(cfg, dry_run)?;

    let mut status = Status {
        source: source_name,
        dry_run,
        ..Status::default()
    };
    info!(
        "running on {} ({})",
        status.source,
        if dry_run { "dry-run" } else { "live" }
    );

    run_loop(
        source.as_mut(),
        actions.as_mut(),
        control.as_ref(),
        &quit,
        &mut status,
    )?;
    info!("stopped after {} frame(s)", status.frames);
    Ok(())
}

/// One iteration per frame; returns on quit, end of stream or source error.
/// Executor errors abort the loop.
pub fn run_loop(
    source: &mut dyn LandmarkSource,
    actions: &mut dyn HostActions,
    control: Option<&ControlServer>,
    quit: &AtomicBool,
    status: &mut Status,
) -> Result<()> {
    let mut engine = Engine::new();
    loop {
        if quit.load(Ordering::Relaxed) {
            info!("quit requested");
            return Ok(());
        }
        if let Some(ctl) = control {
            if ctl.poll(status) == Control::Shutdown {
                info!("shutdown requested over control socket");
                return Ok(());
            }
        }

        let frame = match source.next_frame() {
            Ok(Some(f)) => f,
            Ok(None) => {
                info!("landmark stream ended");
                return Ok(());
            }
            Err(e) => {
                warn!("landmark source failed: {e}");
                return Ok(());
            }
        };

        let report = engine.process(&frame, &mut *actions)?;
        if status.record(report) {
            info!("gesture: {} | brightness {}%", report.label, report.brightness);
        } else {
            debug!("frame {}: {:?}", status.frames, report);
        }
    }
}

fn open_source(input: Option<&InputSpec>, cfg: &Config) -> Result<(Box<dyn LandmarkSource>, String)> {
    match input {
        Some(InputSpec::Stdin) => {
            let src: Box<dyn LandmarkSource> = Box::new(JsonLinesSource::new(io::stdin().lock()));
            Ok((src, "stdin".to_string()))
        }
        Some(InputSpec::File(path)) => {
            let f = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            let src: Box<dyn LandmarkSource> = Box::new(JsonLinesSource::new(BufReader::new(f)));
            Ok((src, path.display().to_string()))
        }
        None => {
            let src: Box<dyn LandmarkSource> = Box::new(SubprocessSource::spawn(
                &cfg.source.command,
                cfg.source.ready_line.as_deref(),
            )?);
            Ok((src, cfg.source.command.join(" ")))
        }
    }
}

fn open_actions(cfg: &Config, dry_run: bool) -> Result<Box<dyn HostActions>> {
    if dry_run {
        return Ok(Box::new(DryRunActions::default()));
    }
    Ok(Box::new(HostExecutor::new(cfg.brightness.device.as_deref())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ExecutorError;
    use crate::gestures::GestureLabel;
    use std::io::Cursor;

    fn hand_json(tip_y: f32, wrist_y: f32) -> String {
        let mut pts = vec![r#"{"x":0.5,"y":0.5}"#.to_string(); 21];
        pts[0] = format!(r#"{{"x":0.5,"y":{wrist_y}}}"#);
        for i in [8, 12, 16, 20] {
            pts[i] = format!(r#"{{"x":0.5,"y":{tip_y}}}"#);
        }
        format!(r#"{{"landmarks":[{}]}}"#, pts.join(","))
    }

    fn stream(lines: &[String]) -> JsonLinesSource<Cursor<Vec<u8>>> {
        JsonLinesSource::new(Cursor::new(lines.join("\n").into_bytes()))
    }

    #[test]
    fn replays_until_end_of_stream() {
        let open = hand_json(0.4, 0.8);
        let lines = vec![
            format!(r#"{{"timestamp_ms":0,"hands":[{open}]}}"#),
            format!(r#"{{"timestamp_ms":1000,"hands":[{open}]}}"#),
            format!(r#"{{"timestamp_ms":2100,"hands":[{open}]}}"#),
            r#"{"timestamp_ms":2200,"hands":[]}"#.to_string(),
        ];
        let mut src = stream(&lines);
        let mut act = DryRunActions::with_brightness(30);
        let mut status = Status::default();

        run_loop(&mut src, &mut act, None, &AtomicBool::new(false), &mut status).unwrap();
        assert_eq!(status.frames, 4);
        assert_eq!(status.label, GestureLabel::None);
        assert_eq!(status.brightness, 50);
        assert_eq!(act.brightness_writes, 2);
    }

    #[test]
    fn quit_flag_stops_before_reading() {
        let lines = vec![r#"{"timestamp_ms":0,"hands":[]}"#.to_string()];
        let mut src = stream(&lines);
        let mut act = DryRunActions::default();
        let mut status = Status::default();
        run_loop(&mut src, &mut act, None, &AtomicBool::new(true), &mut status).unwrap();
        assert_eq!(status.frames, 0);
    }

    #[test]
    fn executor_failure_ends_the_loop_with_error() {
        let lines = vec![r#"{"timestamp_ms":0,"hands":[]}"#.to_string()];
        let mut src = stream(&lines);
        let mut act = DryRunActions::with_brightness(101);
        let mut status = Status::default();
        let err = run_loop(&mut src, &mut act, None, &AtomicBool::new(false), &mut status)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecutorError>(),
            Some(ExecutorError::OutOfRange(101))
        ));
    }
}
