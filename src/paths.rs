/// Centralized platform-specific path computation
///
/// Follows the XDG Base Directory specification on Unix-like systems and the
/// usual per-user locations on macOS and Windows.
use std::path::PathBuf;

const APP_DIR: &str = "history-scraper";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate cache directory for the current platform
    ///
    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Caches
    /// - Linux/Unix: $XDG_CACHE_HOME or ~/.cache
    pub fn cache_dir() -> PathBuf {
        dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {cache_dir}/history-scraper
    pub fn project_cache_dir() -> PathBuf {
        Self::cache_dir().join(APP_DIR)
    }

    /// Returns: {config_dir}/history-scraper
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR)
    }

    /// Root of the persistent content cache
    ///
    /// Returns: {cache_dir}/history-scraper/files
    pub fn default_content_cache_path() -> PathBuf {
        Self::project_cache_dir().join("files")
    }

    /// Directory that holds live clones while a repository is scraped
    ///
    /// Returns: {cache_dir}/history-scraper/checkouts
    pub fn default_checkout_root() -> PathBuf {
        Self::project_cache_dir().join("checkouts")
    }

    /// Returns: {config_dir}/history-scraper/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}
