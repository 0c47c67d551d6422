//! Process enumeration.
//!
//! Provides cross-platform process listing:
//! - Linux: /proc/<pid>/comm and /proc/<pid>/exe
//! - macOS: `ps -axo pid,comm`
//! - Windows: `tasklist /fo csv /nh`

use crate::core::error::{Error, Result};
use std::path::PathBuf;

/// A running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Process ID
    pub pid: u32,
    /// Short process name
    pub name: String,
    /// Full path to executable, when readable
    pub path: Option<PathBuf>,
}

impl ProcessInfo {
    /// Create a new process info entry.
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            path: None,
        }
    }

    /// Set the executable path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Executable path if known, otherwise the short name.
    pub fn executable(&self) -> String {
        match &self.path {
            Some(path) => path.to_string_lossy().into_owned(),
            None => self.name.clone(),
        }
    }
}

/// Source of running process names.
pub trait ProcessTable: Send + Sync {
    /// Executable names of all running processes.
    fn process_names(&self) -> Result<Vec<String>>;
}

/// Process table read from the operating system.
#[derive(Debug, Default, Clone)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    pub fn new() -> Self {
        Self
    }

    /// Enumerate all running processes.
    pub fn enumerate(&self) -> Result<Vec<ProcessInfo>> {
        #[cfg(target_os = "linux")]
        {
            self.enumerate_linux()
        }

        #[cfg(target_os = "macos")]
        {
            let stdout = run_command("ps", &["-axo", "pid=,comm="])?;
            Ok(parse_ps_output(&stdout))
        }

        #[cfg(target_os = "windows")]
        {
            let stdout = run_command("tasklist", &["/fo", "csv", "/nh"])?;
            Ok(parse_tasklist_csv(&stdout))
        }

        #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
        {
            Err(Error::ProcessEnumeration(
                "process enumeration is not supported on this platform".to_string(),
            ))
        }
    }

    #[cfg(target_os = "linux")]
    fn enumerate_linux(&self) -> Result<Vec<ProcessInfo>> {
        let entries = std::fs::read_dir("/proc")
            .map_err(|e| Error::ProcessEnumeration(format!("/proc: {}", e)))?;

        let mut processes = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            // Only numeric directories are processes
            let pid = match entry.file_name().to_string_lossy().parse::<u32>() {
                Ok(pid) => pid,
                Err(_) => continue,
            };
            // Processes can exit mid-enumeration
            if let Some(info) = Self::read_proc_info(pid) {
                processes.push(info);
            }
        }

        Ok(processes)
    }

    #[cfg(target_os = "linux")]
    fn read_proc_info(pid: u32) -> Option<ProcessInfo> {
        let proc_dir = format!("/proc/{}", pid);

        let name = std::fs::read_to_string(format!("{}/comm", proc_dir))
            .ok()
            .map(|s| s.trim().to_string())?;

        let mut info = ProcessInfo::new(pid, name);
        // exe is unreadable for other users' processes without privileges
        if let Ok(exe) = std::fs::read_link(format!("{}/exe", proc_dir)) {
            info.path = Some(exe);
        }

        Some(info)
    }
}

impl ProcessTable for SystemProcessTable {
    fn process_names(&self) -> Result<Vec<String>> {
        Ok(self
            .enumerate()?
            .iter()
            .map(ProcessInfo::executable)
            .collect())
    }
}

#[cfg(any(target_os = "windows", target_os = "macos"))]
fn run_command(program: &str, args: &[&str]) -> Result<String> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::ProcessEnumeration(format!("failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        return Err(Error::ProcessEnumeration(format!(
            "{} exited with {}",
            program, output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `ps -axo pid=,comm=` output.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn parse_ps_output(stdout: &str) -> Vec<ProcessInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            let (pid, comm) = line.trim().split_once(char::is_whitespace)?;
            let pid = pid.parse().ok()?;
            let comm = comm.trim();
            let name = comm.rsplit('/').next().unwrap_or(comm);
            let info = ProcessInfo::new(pid, name);
            Some(if comm.starts_with('/') {
                info.with_path(comm)
            } else {
                info
            })
        })
        .collect()
}

/// Parse `tasklist /fo csv /nh` output.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn parse_tasklist_csv(stdout: &str) -> Vec<ProcessInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            // "Image Name","PID","Session Name","Session#","Mem Usage"
            let mut fields = line.split("\",\"").map(|f| f.trim_matches('"'));
            let name = fields.next()?.trim();
            let pid = fields.next()?.parse().ok()?;
            if name.is_empty() {
                return None;
            }
            Some(ProcessInfo::new(pid, name))
        })
        .collect()
}
