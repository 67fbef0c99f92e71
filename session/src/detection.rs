//! Locates a Chromium-family executable when the caller does not supply one explicitly.

use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DetectionOptions {
    /// Also look for Microsoft Edge installs.
    pub msedge: bool,
    /// Also consider beta/dev/unstable channel installs.
    pub unstable: bool,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self { msedge: true, unstable: false }
    }
}

/// Returns the path to a usable browser executable.
///
/// Checked in order: the `CHROME` environment variable, well-known executable names resolved
/// through `PATH`, the Windows registry, then a table of well-known install locations per OS.
pub fn default_executable(options: &DetectionOptions) -> Result<PathBuf, String> {
    if let Some(path) = get_by_env_var() {
        return Ok(path);
    }
    if let Some(path) = get_by_name(options) {
        return Ok(path);
    }
    #[cfg(windows)]
    if let Some(path) = get_by_registry() {
        return Ok(path);
    }
    if let Some(path) = get_by_path(options) {
        return Ok(path);
    }
    Err("could not locate a browser executable".to_string())
}

fn get_by_env_var() -> Option<PathBuf> {
    let path = env::var("CHROME").ok()?;
    Path::new(&path).exists().then(|| path.into())
}

fn get_by_name(options: &DetectionOptions) -> Option<PathBuf> {
    let default_apps = [
        ("chrome", true),
        ("chrome-browser", true),
        ("google-chrome-stable", true),
        ("google-chrome-beta", options.unstable),
        ("google-chrome-dev", options.unstable),
        ("google-chrome-unstable", options.unstable),
        ("chromium", true),
        ("chromium-browser", true),
        ("msedge", options.msedge),
        ("microsoft-edge", options.msedge),
        ("microsoft-edge-stable", options.msedge),
        ("microsoft-edge-beta", options.msedge && options.unstable),
        ("microsoft-edge-dev", options.msedge && options.unstable),
    ];
    default_apps.into_iter().filter(|(_, allowed)| *allowed).find_map(|(app, _)| which::which(app).ok())
}

#[allow(unused_variables)]
fn get_by_path(options: &DetectionOptions) -> Option<PathBuf> {
    #[cfg(all(unix, not(target_os = "macos")))]
    let default_paths: [(&str, bool); 2] = [("/opt/chromium.org/chromium", true), ("/opt/google/chrome", true)];
    #[cfg(windows)]
    let default_paths = [(r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe", options.msedge)];
    #[cfg(target_os = "macos")]
    let default_paths = [
        ("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome", true),
        ("/Applications/Chromium.app/Contents/MacOS/Chromium", true),
        ("/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge", options.msedge),
    ];

    default_paths.into_iter().filter(|(_, allowed)| *allowed).map(|(p, _)| p).find(|p| Path::new(p).exists()).map(PathBuf::from)
}

#[cfg(windows)]
fn get_by_registry() -> Option<PathBuf> {
    winreg::RegKey::predef(winreg::enums::HKEY_LOCAL_MACHINE)
        .open_subkey("SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\App Paths\\chrome.exe")
        .or_else(|_| {
            winreg::RegKey::predef(winreg::enums::HKEY_CURRENT_USER)
                .open_subkey("Software\\Microsoft\\Windows\\CurrentVersion\\App Paths\\chrome.exe")
        })
        .and_then(|key| key.get_value::<String, _>(""))
        .map(PathBuf::from)
        .ok()
}
