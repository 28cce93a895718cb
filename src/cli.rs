use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{env, path::PathBuf, process::Command};

use crate::actions::{Backlight, Direction, UinputSink};
use crate::config::ConfigState;
use crate::ipc::{self, InputSpec, RunOptions};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // Hidden daemon mode (spawned by `start`)
    if pargs.contains("--daemon") {
        return ipc::run(RunOptions {
            input: None,
            dry_run: false,
            control_socket: true,
        });
    }

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    // Flags-based help (-h/--help)
    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("start") => {
            let exe = std::env::current_exe()?;
            let child = Command::new(exe).arg("--daemon").spawn()?;
            println!("handctl: started daemon (pid={})", child.id());
            Ok(())
        }

        Some("run") => {
            let dry_run = pargs.contains("--dry-run");
            let input: Option<String> = pargs.opt_value_from_str("--input")?;
            let input = input.map(|s| {
                if s == "-" {
                    InputSpec::Stdin
                } else {
                    InputSpec::File(PathBuf::from(s))
                }
            });
            ipc::run(RunOptions {
                input,
                dry_run,
                control_socket: true,
            })
        }

        Some("stop") => {
            let r = ipc::client_request(serde_json::json!({"op":"shutdown"}))?;
            print_response(&r);
            Ok(())
        }

        Some("status") => {
            let r = ipc::client_request(serde_json::json!({"op":"status"}))?;
            print_response(&r);
            Ok(())
        }

        Some("doctor") => {
            let cfg = ConfigState::load_or_install_default()?;
            print_response(&cfg.doctor_report());
            Ok(())
        }

        Some("emit") => {
            // usage:
            //   handctl emit brightness up
            //   handctl emit volume down
            //   handctl emit switch
            let what: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handctl emit <brightness|volume|switch> ..."))?;
            // each kind opens only the device it drives
            match what.as_str() {
                "brightness" => {
                    let how: String = pargs
                        .free_from_str()
                        .map_err(|_| anyhow!("usage: handctl emit brightness <up|down|get>"))?;
                    let op = parse_brightness_op(&how)?;
                    let cfg = ConfigState::load_or_install_default()?;
                    let backlight = Backlight::open(cfg.config.brightness.device.as_deref())?;
                    let level = match op {
                        Some(dir) => backlight.step(dir)?,
                        None => backlight.percent()?,
                    };
                    println!("ok: brightness {level}%");
                }
                "volume" => {
                    let how: String = pargs
                        .free_from_str()
                        .map_err(|_| anyhow!("usage: handctl emit volume <up|down>"))?;
                    let dir = parse_direction(&how)?;
                    UinputSink::new()?.volume_key(dir)?;
                    println!("ok: volume {how}");
                }
                "switch" => {
                    UinputSink::new()?.alt_tab()?;
                    println!("ok: switched application");
                }
                other => return Err(anyhow!("unknown emit kind: {other}")),
            }
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn parse_direction(s: &str) -> Result<Direction> {
    match s {
        "up" => Ok(Direction::Up),
        "down" => Ok(Direction::Down),
        other => Err(anyhow!("expected up or down, got '{other}'")),
    }
}

/// `None` reads the level without changing it.
fn parse_brightness_op(s: &str) -> Result<Option<Direction>> {
    match s {
        "get" => Ok(None),
        "up" | "down" => parse_direction(s).map(Some),
        other => Err(anyhow!("unknown brightness op: {other}")),
    }
}

fn print_help() {
    println!(
        r#"handctl — hand gesture control for brightness, volume and app switching

USAGE:
  handctl help [command]                  Show general or command-specific help
  handctl start                           Start the daemon in the background
  handctl run [--input <file|->] [--dry-run]
                                          Run in the foreground
  handctl stop                            Stop the running instance
  handctl status                          Show the current gesture and brightness
  handctl doctor                          Diagnose permissions and devices
  handctl emit brightness <up|down|get>   Step or read the backlight
  handctl emit volume <up|down>           Press a volume media key
  handctl emit switch                     Send Alt+Tab

GESTURES:
  open hand  -> brightness +10%        fist       -> brightness -10%
  thumb up   -> volume up              thumb down -> volume down
  quick horizontal index swipe -> switch application

TIPS:
  - Config: ~/.config/handctl/config.toml
  - Control socket: ~/.local/run/handctl.sock
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "start" => println!("usage: handctl start\nStarts the background daemon."),
        "run" => println!(
            "usage: handctl run [--input <file|->] [--dry-run]\nReads landmarks from the configured extractor, a JSON-lines file, or stdin ('-').\n--dry-run logs actions instead of performing them."
        ),
        "stop" => println!("usage: handctl stop\nStops the running instance."),
        "status" => println!(
            "usage: handctl status\nShows the displayed gesture, brightness, hand count and frames processed."
        ),
        "doctor" => println!(
            "usage: handctl doctor\nChecks uinput access, input group membership and backlight devices."
        ),
        "emit" => println!(
            "usage:\n  handctl emit brightness <up|down|get>\n  handctl emit volume <up|down>\n  handctl emit switch"
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
