//! Persistent viewer settings, stored as a plain key=value `.cfg` file in
//! the platform config directory. A missing or corrupt file silently falls
//! back to defaults.

use std::path::PathBuf;

/// Texture filtering preference for the zoomed-out / moderately zoomed view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ZoomFilterMode {
    /// Bilinear filtering below the sharpness threshold, nearest above it.
    #[default]
    Linear,
    /// Nearest-neighbor at every zoom level.
    Nearest,
}

pub struct AppSettings {
    /// Smooth vs always-sharp scaling of the continuous image.
    pub zoom_filter_mode: ZoomFilterMode,
    /// Directory the last image was opened from (pre-selected in dialogs).
    pub last_open_dir: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            zoom_filter_mode: ZoomFilterMode::Linear,
            last_open_dir: String::new(),
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixelfe/pixelfe_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixelFE\pixelfe_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixelFE/pixelfe_settings.cfg
    /// Fallback:   same directory as the executable.
    fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("pixelfe");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("pixelfe_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .unwrap_or_default();
            let config_dir = PathBuf::from(appdata).join("PixelFE");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("pixelfe_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("PixelFE");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("pixelfe_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("pixelfe_settings.cfg")))
        }
    }

    /// Save settings to disk. Write failures are ignored — settings are a
    /// convenience, never a hard requirement.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        let filter_str = match self.zoom_filter_mode {
            ZoomFilterMode::Linear => "linear",
            ZoomFilterMode::Nearest => "nearest",
        };
        let content = format!(
            "zoom_filter_mode={filter_str}\n\
             last_open_dir={}\n",
            self.last_open_dir,
        );
        let _ = std::fs::write(path, content);
    }

    /// Load settings from disk (returns defaults if the file is missing or corrupt).
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };

        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            match key.trim() {
                "zoom_filter_mode" => {
                    s.zoom_filter_mode = match val.trim() {
                        "nearest" => ZoomFilterMode::Nearest,
                        _ => ZoomFilterMode::Linear,
                    };
                }
                "last_open_dir" => {
                    s.last_open_dir = val.trim().to_string();
                }
                _ => {}
            }
        }
        s
    }
}
