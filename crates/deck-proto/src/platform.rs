//! Per-platform locations: data and config directories and the decoder binary.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "deckradio";
/// Overrides the decoder lookup.
pub const FFMPEG_ENV: &str = "FFMPEG_PATH";

/// `$XDG_DATA_HOME/deckradio`, falling back to `~/.local/share/deckradio` on
/// unix and the local app-data folder on Windows.
pub fn data_dir() -> PathBuf {
    xdg_or("XDG_DATA_HOME", || {
        if cfg!(windows) {
            dirs::data_local_dir()
        } else {
            dirs::home_dir().map(|h| h.join(".local").join("share"))
        }
    })
    .join(APP_DIR)
}

/// `$XDG_CONFIG_HOME/deckradio`, falling back to `~/.config/deckradio` on
/// unix and the roaming config folder on Windows.
pub fn config_dir() -> PathBuf {
    xdg_or("XDG_CONFIG_HOME", || {
        if cfg!(windows) {
            dirs::config_dir()
        } else {
            dirs::home_dir().map(|h| h.join(".config"))
        }
    })
    .join(APP_DIR)
}

fn xdg_or(var: &str, fallback: impl FnOnce() -> Option<PathBuf>) -> PathBuf {
    std::env::var_os(var)
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(fallback)
        .unwrap_or_else(std::env::temp_dir)
}

fn ffmpeg_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["ffmpeg.exe", "ffmpeg"]
    } else {
        &["ffmpeg"]
    }
}

fn first_existing(candidates: impl IntoIterator<Item = PathBuf>, names: &[&str]) -> Option<PathBuf> {
    candidates
        .into_iter()
        .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
        .find(|p| p.is_file())
}

/// Locate the ffmpeg binary used as the stream decoder: `FFMPEG_PATH`, then
/// next to the executable (or its `external/` folder), then `PATH`.
pub fn find_ffmpeg_binary() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os(FFMPEG_ENV).map(PathBuf::from) {
        if p.is_file() {
            return Some(p);
        }
    }
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let beside = exe_dir
        .into_iter()
        .flat_map(|d| [d.join("external"), d]);
    if let Some(p) = first_existing(beside, ffmpeg_names()) {
        return Some(p);
    }
    let path = std::env::var_os("PATH")?;
    first_existing(std::env::split_paths(&path), ffmpeg_names())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_namespaced() {
        assert!(data_dir().ends_with(APP_DIR));
        assert!(config_dir().ends_with(APP_DIR));
    }

    #[test]
    fn test_first_existing_checks_dirs_in_order() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(b.path().join("ffmpeg"), b"").unwrap();
        let found = first_existing(
            [a.path().to_path_buf(), b.path().to_path_buf()],
            &["ffmpeg"],
        );
        assert_eq!(found, Some(b.path().join("ffmpeg")));
        assert_eq!(first_existing([a.path().to_path_buf()], &["ffmpeg"]), None);
    }
}
