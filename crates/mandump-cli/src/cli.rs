//! CLI argument parsing using clap.

use clap::Parser;
use mandump_core::config::DEFAULT_PREFIX;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mandump")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Repository index files, e.g. /repo/x86_64-repodata
    #[arg(value_name = "REPODATA", required = true)]
    pub repodata: Vec<PathBuf>,

    /// Output directory for extracted pages and the state file
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Package path prefix to extract
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PREFIX, value_parser = parse_prefix)]
    pub prefix: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress progress output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long)]
    pub json: bool,
}

/// Accepts absolute prefixes below the root; `/` alone would match every
/// package path.
fn parse_prefix(s: &str) -> Result<String, String> {
    if !s.starts_with('/') {
        return Err(format!("prefix must be absolute: {s}"));
    }
    if s.trim_matches('/').is_empty() {
        return Err("prefix must name a directory below /".to_string());
    }
    if s.split('/').any(|part| part == "..") {
        return Err(format!("prefix must not contain '..': {s}"));
    }
    Ok(s.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_prefix() {
        assert_eq!(parse_prefix("/usr/share/man/").unwrap(), "/usr/share/man/");
        assert_eq!(parse_prefix("/usr/share/info").unwrap(), "/usr/share/info");
        assert!(parse_prefix("usr/share/man").is_err());
        assert!(parse_prefix("/").is_err());
        assert!(parse_prefix("/usr/../etc").is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mandump", "x86_64-repodata"]).unwrap();
        assert_eq!(cli.repodata, [PathBuf::from("x86_64-repodata")]);
        assert_eq!(cli.output_dir, PathBuf::from("."));
        assert_eq!(cli.prefix, DEFAULT_PREFIX);
        assert!(!cli.json);
    }

    #[test]
    fn test_repodata_required() {
        assert!(Cli::try_parse_from(["mandump", "-o", "out"]).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["mandump", "-q", "-v", "x86_64-repodata"]).is_err());
    }
}
