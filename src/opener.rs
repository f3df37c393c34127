//! Opening the report in the operating system's default application.
//!
//! The session only asks for a [`FileOpener`]; the CLI supplies a
//! [`SystemOpener`] and tests supply a recorder.

use crate::error::ExtractError;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::thread::JoinHandle;
use tracing::debug;

/// Anything that can hand a file to a viewer.
pub trait FileOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<(), ExtractError>;
}

/// Host platform families with distinct "open with default app" commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    /// Linux and other freedesktop systems.
    Linux,
}

impl OsFamily {
    /// Family of the platform this binary was built for.
    pub fn detect() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to a family.
    pub fn from_os_name(os: &str) -> Self {
        match os {
            "windows" => OsFamily::Windows,
            "macos" => OsFamily::MacOs,
            _ => OsFamily::Linux,
        }
    }

    /// Program and arguments that open `path` with the default application.
    pub fn open_command(self, path: &Path) -> (&'static str, Vec<OsString>) {
        match self {
            // The empty string is the window title `start` expects before the target.
            OsFamily::Windows => (
                "cmd",
                vec!["/C".into(), "start".into(), "".into(), path.into()],
            ),
            OsFamily::MacOs => ("open", vec![path.into()]),
            OsFamily::Linux => ("xdg-open", vec![path.into()]),
        }
    }
}

/// Launches the platform's default-application command.
#[derive(Debug, Clone, Copy)]
pub struct SystemOpener {
    family: OsFamily,
}

impl SystemOpener {
    pub fn new(family: OsFamily) -> Self {
        Self { family }
    }

    pub fn for_host() -> Self {
        Self::new(OsFamily::detect())
    }
}

impl FileOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<(), ExtractError> {
        let (program, args) = self.family.open_command(path);
        debug!("Opening {} with {}", path.display(), program);
        spawn_detached(program, &args)
            .map(|_| ())
            .map_err(|e| ExtractError::OpenFailed {
                path: path.to_path_buf(),
                detail: format!("could not run {}: {}", program, e),
            })
    }
}

/// Start `program` without blocking the caller. The child is waited on from
/// a background thread so it is reaped when it exits.
fn spawn_detached(
    program: &str,
    args: &[OsString],
) -> std::io::Result<JoinHandle<std::io::Result<ExitStatus>>> {
    let mut child = Command::new(program).args(args).spawn()?;
    Ok(std::thread::spawn(move || child.wait()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_from_os_names() {
        assert_eq!(OsFamily::from_os_name("windows"), OsFamily::Windows);
        assert_eq!(OsFamily::from_os_name("macos"), OsFamily::MacOs);
        assert_eq!(OsFamily::from_os_name("linux"), OsFamily::Linux);
        assert_eq!(OsFamily::from_os_name("freebsd"), OsFamily::Linux);
    }

    #[test]
    fn commands_per_family() {
        let path = Path::new("policy_data.xlsx");

        let (program, args) = OsFamily::Windows.open_command(path);
        assert_eq!(program, "cmd");
        assert_eq!(args, vec!["/C", "start", "", "policy_data.xlsx"]);

        let (program, args) = OsFamily::MacOs.open_command(path);
        assert_eq!(program, "open");
        assert_eq!(args, vec!["policy_data.xlsx"]);

        let (program, _) = OsFamily::Linux.open_command(path);
        assert_eq!(program, "xdg-open");
    }

    #[test]
    fn missing_program_is_open_failed() {
        // `cmd` does not exist on unix hosts; `open`/`xdg-open` may not either.
        if cfg!(unix) {
            let err = SystemOpener::new(OsFamily::Windows)
                .open(Path::new("policy_data.xlsx"))
                .unwrap_err();
            assert!(matches!(err, ExtractError::OpenFailed { .. }));
        }
    }

    #[test]
    fn launched_viewer_is_waited_on() {
        if cfg!(unix) {
            let waiter = spawn_detached("true", &[]).unwrap();
            let status = waiter.join().unwrap().unwrap();
            assert!(status.success());
        }
    }
}
