//! Host vitals collection (Linux).
//!
//! Reads /proc plus a statvfs call; no daemon, no caching. The CPU figure is
//! a two-sample delta over a short window, so `collect` blocks for roughly
//! `CPU_SAMPLE_WINDOW` — callers on an async runtime should treat it as a
//! blocking operation.

use serde_json::json;
use std::ffi::CString;
use std::fs;
use std::io;
use std::time::Duration;

use crate::matrix::event::Payload;

const CPU_SAMPLE_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum VitalsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("unexpected format in {0}")]
    Parse(&'static str),
    #[error("statvfs failed: {0}")]
    Statvfs(io::Error),
}

impl VitalsError {
    /// Short tag carried in the re-emitted error event.
    pub fn kind(&self) -> &'static str {
        match self {
            VitalsError::Io { .. } => "io_error",
            VitalsError::Parse(_) => "parse_error",
            VitalsError::Statvfs(_) => "statvfs_error",
        }
    }
}

/// One full vitals sample: cpu, memory, disk, process count, load average,
/// boot time.
pub fn collect() -> Result<Payload, VitalsError> {
    let mut vitals = Payload::new();
    vitals.insert("cpu_percent".into(), json!(cpu_percent()?));
    vitals.insert("memory_percent".into(), json!(memory_percent()?));
    vitals.insert("disk_usage".into(), json!(disk_usage_percent("/")?));
    vitals.insert("active_processes".into(), json!(active_processes()?));
    vitals.insert("load_average".into(), json!(load_average()?));
    vitals.insert("boot_time".into(), json!(boot_time()?));
    Ok(vitals)
}

fn read_proc(path: &'static str) -> Result<String, VitalsError> {
    fs::read_to_string(path).map_err(|source| VitalsError::Io { path, source })
}

/// (busy, total) jiffies from the aggregate cpu line.
fn cpu_sample() -> Result<(u64, u64), VitalsError> {
    let stat = read_proc("/proc/stat")?;
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or(VitalsError::Parse("/proc/stat"))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 4 {
        return Err(VitalsError::Parse("/proc/stat"));
    }
    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0); // idle + iowait
    Ok((total - idle, total))
}

fn cpu_percent() -> Result<f64, VitalsError> {
    let (busy_a, total_a) = cpu_sample()?;
    std::thread::sleep(CPU_SAMPLE_WINDOW);
    let (busy_b, total_b) = cpu_sample()?;

    let total = total_b.saturating_sub(total_a);
    if total == 0 {
        return Ok(0.0);
    }
    let busy = busy_b.saturating_sub(busy_a);
    Ok(busy as f64 / total as f64 * 100.0)
}

fn meminfo_kb(content: &str, key: &str) -> Option<u64> {
    content
        .lines()
        .find(|l| l.starts_with(key))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

fn memory_percent() -> Result<f64, VitalsError> {
    let content = read_proc("/proc/meminfo")?;
    let total = meminfo_kb(&content, "MemTotal:").ok_or(VitalsError::Parse("/proc/meminfo"))?;
    let available =
        meminfo_kb(&content, "MemAvailable:").ok_or(VitalsError::Parse("/proc/meminfo"))?;
    if total == 0 {
        return Ok(0.0);
    }
    Ok((total.saturating_sub(available)) as f64 / total as f64 * 100.0)
}

fn disk_usage_percent(mount: &str) -> Result<f64, VitalsError> {
    let path = CString::new(mount).map_err(|_| VitalsError::Parse("mount path"))?;
    let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(path.as_ptr(), &mut stats) };
    if rc != 0 {
        return Err(VitalsError::Statvfs(io::Error::last_os_error()));
    }
    if stats.f_blocks == 0 {
        return Ok(0.0);
    }
    let used = stats.f_blocks.saturating_sub(stats.f_bfree);
    Ok(used as f64 / stats.f_blocks as f64 * 100.0)
}

fn active_processes() -> Result<usize, VitalsError> {
    let entries = fs::read_dir("/proc").map_err(|source| VitalsError::Io {
        path: "/proc",
        source,
    })?;
    let count = entries
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|name| name.bytes().all(|b| b.is_ascii_digit()))
        })
        .count();
    Ok(count)
}

fn load_average() -> Result<[f64; 3], VitalsError> {
    let content = read_proc("/proc/loadavg")?;
    let mut parts = content.split_whitespace();
    let mut load = [0.0; 3];
    for slot in &mut load {
        *slot = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or(VitalsError::Parse("/proc/loadavg"))?;
    }
    Ok(load)
}

/// Boot time as epoch seconds (the btime line).
fn boot_time() -> Result<u64, VitalsError> {
    let stat = read_proc("/proc/stat")?;
    stat.lines()
        .find(|l| l.starts_with("btime"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|v| v.parse().ok())
        .ok_or(VitalsError::Parse("/proc/stat"))
}
