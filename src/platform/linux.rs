// watchlog platform paths for Linux
// Config: ~/.config/watchlog
// Data:   ~/.local/share/watchlog

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "watchlog";

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Uses `$XDG_CONFIG_HOME/watchlog` if set, otherwise `~/.config/watchlog`.
pub fn get_config_dir() -> PathBuf {
    match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join(APP_DIR),
        _ => home_dir().join(".config").join(APP_DIR),
    }
}

/// Uses `$XDG_DATA_HOME/watchlog` if set, otherwise `~/.local/share/watchlog`.
pub fn get_data_dir() -> PathBuf {
    match env::var("XDG_DATA_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join(APP_DIR),
        _ => home_dir().join(".local").join("share").join(APP_DIR),
    }
}
