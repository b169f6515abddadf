//! Harvest configuration.

use std::path::PathBuf;

/// Package path prefix under which man pages are installed.
pub const DEFAULT_PREFIX: &str = "/usr/share/man/";

/// Name of the hidden state file kept in the output directory.
pub const STATE_FILE_NAME: &str = ".vmandump";

/// Configuration shared by every component that computes output paths.
///
/// # Examples
///
/// ```
/// use mandump_core::DumpConfig;
/// use std::path::Path;
///
/// let config = DumpConfig::default().with_output_dir("/srv/man");
/// assert_eq!(config.prefix, "/usr/share/man/");
/// assert_eq!(config.state_path(), Path::new("/srv/man/.vmandump"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpConfig {
    /// Directory receiving extracted pages and the state file.
    pub output_dir: PathBuf,

    /// Absolute package path prefix selecting which entries are extracted.
    /// Always starts and ends with `/`.
    pub prefix: String,

    /// File name of the state file inside `output_dir`.
    pub state_file_name: String,
}

impl Default for DumpConfig {
    /// Default values:
    /// - `output_dir`: `.`
    /// - `prefix`: `/usr/share/man/`
    /// - `state_file_name`: `.vmandump`
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            prefix: DEFAULT_PREFIX.to_string(),
            state_file_name: STATE_FILE_NAME.to_string(),
        }
    }
}

impl DumpConfig {
    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the extraction prefix, adding the leading and trailing `/` if
    /// missing.
    ///
    /// ```
    /// use mandump_core::DumpConfig;
    ///
    /// let config = DumpConfig::default().with_prefix("usr/share/info");
    /// assert_eq!(config.prefix, "/usr/share/info/");
    /// ```
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = normalize_prefix(prefix);
        self
    }

    /// Sets the state file name.
    #[must_use]
    pub fn with_state_file_name(mut self, name: impl Into<String>) -> Self {
        self.state_file_name = name.into();
        self
    }

    /// Full path of the state file.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.output_dir.join(&self.state_file_name)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    format!("/{trimmed}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DumpConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.prefix, DEFAULT_PREFIX);
        assert_eq!(config.state_path(), PathBuf::from("./.vmandump"));
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(normalize_prefix("/usr/share/man/"), "/usr/share/man/");
        assert_eq!(normalize_prefix("/usr/share/man"), "/usr/share/man/");
        assert_eq!(normalize_prefix("usr/share/man"), "/usr/share/man/");
        assert_eq!(normalize_prefix("//usr/share/man//"), "/usr/share/man/");
        assert_eq!(normalize_prefix(""), "/");
    }

    #[test]
    fn test_custom_state_file() {
        let config = DumpConfig::default()
            .with_output_dir("out")
            .with_state_file_name("state.json");
        assert_eq!(config.state_path(), PathBuf::from("out/state.json"));
    }
}
