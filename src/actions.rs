use log::{info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Percent change applied per brightness action.
pub const BRIGHTNESS_STEP: u8 = 10;
/// Decrease never goes below this percent.
pub const BRIGHTNESS_FLOOR: u8 = 10;
pub const BRIGHTNESS_CEIL: u8 = 100;

const BACKLIGHT_ROOT: &str = "/sys/class/backlight";

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("no backlight device under {}", .0.display())]
    NoBacklight(PathBuf),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: not a number: {value:?}", path.display())]
    Parse { path: PathBuf, value: String },
    #[error("brightness {0}% is out of range")]
    OutOfRange(u32),
    #[error("key emit failed: {0}")]
    Keys(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Host side effects the gesture engine can trigger.
pub trait HostActions {
    /// Current backlight level in percent.
    fn brightness(&mut self) -> Result<u8, ExecutorError>;
    fn set_brightness(&mut self, percent: u8) -> Result<(), ExecutorError>;
    /// One media-key press and release.
    fn volume(&mut self, dir: Direction) -> Result<(), ExecutorError>;
    /// Alt+Tab.
    fn switch_application(&mut self) -> Result<(), ExecutorError>;

    fn brightness_increase(&mut self) -> Result<u8, ExecutorError> {
        let new = stepped(self.brightness()?, Direction::Up);
        self.set_brightness(new)?;
        info!("brightness set to {new}%");
        Ok(new)
    }

    fn brightness_decrease(&mut self) -> Result<u8, ExecutorError> {
        let new = stepped(self.brightness()?, Direction::Down);
        self.set_brightness(new)?;
        info!("brightness set to {new}%");
        Ok(new)
    }
}

/// One brightness step from `cur`, clamped to floor and ceiling.
pub fn stepped(cur: u8, dir: Direction) -> u8 {
    match dir {
        Direction::Up => cur.saturating_add(BRIGHTNESS_STEP).min(BRIGHTNESS_CEIL),
        Direction::Down => cur.saturating_sub(BRIGHTNESS_STEP).max(BRIGHTNESS_FLOOR),
    }
}

fn checked_percent(v: u32) -> Result<u8, ExecutorError> {
    if v > BRIGHTNESS_CEIL as u32 {
        return Err(ExecutorError::OutOfRange(v));
    }
    Ok(v as u8)
}

// ---------- backlight ----------

/// sysfs backlight (`brightness` / `max_brightness`).
#[derive(Debug, Clone)]
pub struct Backlight {
    dir: PathBuf,
    max: u32,
}

impl Backlight {
    /// Opens `device`, or the first device found when `None`.
    pub fn open(device: Option<&str>) -> Result<Self, ExecutorError> {
        let root = Path::new(BACKLIGHT_ROOT);
        let name = match device {
            Some(d) => d.to_string(),
            None => discover_backlights()
                .into_iter()
                .next()
                .ok_or_else(|| ExecutorError::NoBacklight(root.to_path_buf()))?,
        };
        Self::at(root.join(name))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Result<Self, ExecutorError> {
        let dir = dir.into();
        let max = read_u32(&dir.join("max_brightness"))?;
        if max == 0 {
            return Err(ExecutorError::Parse {
                path: dir.join("max_brightness"),
                value: "0".into(),
            });
        }
        info!("backlight: using {} (max {max})", dir.display());
        Ok(Self { dir, max })
    }

    pub fn percent(&self) -> Result<u8, ExecutorError> {
        let raw = read_u32(&self.dir.join("brightness"))? as u64;
        let max = self.max as u64;
        checked_percent(((raw * 100 + max / 2) / max) as u32)
    }

    pub fn set_percent(&self, percent: u8) -> Result<(), ExecutorError> {
        let pct = checked_percent(percent as u32)? as u64;
        let raw = (pct * self.max as u64 + 50) / 100;
        let path = self.dir.join("brightness");
        fs::write(&path, raw.to_string()).map_err(|source| ExecutorError::Io { path, source })
    }

    /// Reads, steps and writes back; returns the new percent.
    pub fn step(&self, dir: Direction) -> Result<u8, ExecutorError> {
        let new = stepped(self.percent()?, dir);
        self.set_percent(new)?;
        info!("brightness set to {new}%");
        Ok(new)
    }
}

pub fn discover_backlights() -> Vec<String> {
    let mut v = Vec::new();
    if let Ok(rd) = fs::read_dir(BACKLIGHT_ROOT) {
        for e in rd.flatten() {
            if let Some(name) = e.file_name().to_str() {
                v.push(name.to_string());
            }
        }
    }
    v.sort();
    v
}

fn read_u32(path: &Path) -> Result<u32, ExecutorError> {
    let txt = fs::read_to_string(path).map_err(|source| ExecutorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    txt.trim().parse().map_err(|_| ExecutorError::Parse {
        path: path.to_path_buf(),
        value: txt.trim().to_string(),
    })
}

// ---------- keys ----------

pub struct UinputSink {
    #[allow(dead_code)]
    linux: Option<Box<LinuxUinput>>,
}

impl UinputSink {
    pub fn new() -> Result<Self, ExecutorError> {
        #[cfg(target_os = "linux")]
        {
            let dev = LinuxUinput::create().map_err(|e| ExecutorError::Keys(e.to_string()))?;
            return Ok(Self {
                linux: Some(Box::new(dev)),
            });
        }
        #[allow(unreachable_code)]
        {
            warn!("uinput not available; key actions are no-ops");
            Ok(Self { linux: None })
        }
    }

    pub fn alt_tab(&mut self) -> Result<(), ExecutorError> {
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            dev.alt_tab().map_err(|e| ExecutorError::Keys(e.to_string()))?;
        }
        Ok(())
    }

    pub fn volume_key(&mut self, dir: Direction) -> Result<(), ExecutorError> {
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            dev.volume(dir).map_err(|e| ExecutorError::Keys(e.to_string()))?;
        }
        #[cfg(not(target_os = "linux"))]
        let _ = dir;
        Ok(())
    }
}

#[cfg(target_os = "linux")]
struct LinuxUinput {
    dev: uinput::device::Device,
}

#[cfg(target_os = "linux")]
impl LinuxUinput {
    const EV_KEY: i32 = 0x01;
    const KEY_VOLUMEDOWN: i32 = 114;
    const KEY_VOLUMEUP: i32 = 115;

    fn create() -> Result<Self, uinput::Error> {
        let dev = uinput::default()?
            .name("Handctl Virtual Keyboard")?
            .event(uinput::event::Keyboard::All)?
            .create()?;
        info!("uinput: created virtual keyboard");
        Ok(Self { dev })
    }

    fn alt_tab(&mut self) -> Result<(), uinput::Error> {
        use uinput::event::keyboard::Key;
        self.dev.send(Key::LeftAlt, 1)?;
        self.dev.send(Key::Tab, 1)?;
        self.dev.synchronize()?;
        self.dev.send(Key::Tab, 0)?;
        self.dev.send(Key::LeftAlt, 0)?;
        self.dev.synchronize()
    }

    fn volume(&mut self, dir: Direction) -> Result<(), uinput::Error> {
        let code = match dir {
            Direction::Up => Self::KEY_VOLUMEUP,
            Direction::Down => Self::KEY_VOLUMEDOWN,
        };
        self.dev.write(Self::EV_KEY, code, 1)?;
        self.dev.synchronize()?;
        self.dev.write(Self::EV_KEY, code, 0)?;
        self.dev.synchronize()
    }
}

// ---------- executors ----------

/// Real host: sysfs backlight plus the virtual keyboard.
pub struct HostExecutor {
    backlight: Backlight,
    keys: UinputSink,
}

impl HostExecutor {
    pub fn new(device: Option<&str>) -> Result<Self, ExecutorError> {
        Ok(Self {
            backlight: Backlight::open(device)?,
            keys: UinputSink::new()?,
        })
    }
}

impl HostActions for HostExecutor {
    fn brightness(&mut self) -> Result<u8, ExecutorError> {
        self.backlight.percent()
    }

    fn set_brightness(&mut self, percent: u8) -> Result<(), ExecutorError> {
        self.backlight.set_percent(percent)
    }

    fn volume(&mut self, dir: Direction) -> Result<(), ExecutorError> {
        self.keys.volume_key(dir)?;
        info!("volume {}", dir.as_str());
        Ok(())
    }

    fn switch_application(&mut self) -> Result<(), ExecutorError> {
        self.keys.alt_tab()?;
        info!("switched application");
        Ok(())
    }
}

/// Logs actions instead of performing them; brightness lives in memory.
#[derive(Debug, Clone)]
pub struct DryRunActions {
    pub level: u32,
    pub volume_presses: Vec<Direction>,
    pub switches: usize,
    pub brightness_writes: usize,
}

impl Default for DryRunActions {
    fn default() -> Self {
        Self::with_brightness(50)
    }
}

impl DryRunActions {
    pub fn with_brightness(level: u32) -> Self {
        Self {
            level,
            volume_presses: Vec::new(),
            switches: 0,
            brightness_writes: 0,
        }
    }

    /// Count of invocations of any executor that changes host state.
    #[cfg(test)]
    pub fn invocations(&self) -> usize {
        self.volume_presses.len() + self.switches + self.brightness_writes
    }
}

impl HostActions for DryRunActions {
    fn brightness(&mut self) -> Result<u8, ExecutorError> {
        checked_percent(self.level)
    }

    fn set_brightness(&mut self, percent: u8) -> Result<(), ExecutorError> {
        self.level = checked_percent(percent as u32)? as u32;
        self.brightness_writes += 1;
        Ok(())
    }

    fn volume(&mut self, dir: Direction) -> Result<(), ExecutorError> {
        self.volume_presses.push(dir);
        info!("[dry-run] volume {}", dir.as_str());
        Ok(())
    }

    fn switch_application(&mut self) -> Result<(), ExecutorError> {
        self.switches += 1;
        info!("[dry-run] switched application");
        Ok(())
    }
}
