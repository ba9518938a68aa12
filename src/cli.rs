//! Command-line interface definitions for Text Harvest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Pacing and retry flags override whatever the optional config file sets.

use clap::Parser;

use text_harvest::policy::FetchPolicy;

/// Command-line arguments for the Text Harvest downloader.
///
/// # Examples
///
/// ```sh
/// # Download a URL list into ./fox-html, resuming past entries
/// text_harvest -i urls.txt -s ./fox-html
///
/// # Slower pacing and a JSON report of what happened
/// text_harvest -i urls.txt -s ./fox-html --inter-request-delay-secs 10 -r report.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// File of identifiers (URLs) to harvest, one per line; blank lines and
    /// `#` comments are skipped
    #[arg(short, long)]
    pub input: String,

    /// Directory the cache entries are stored in
    #[arg(short, long, default_value = "harvest")]
    pub store_root: String,

    /// Optional path for a JSON batch report
    #[arg(short, long)]
    pub report: Option<String>,

    /// Optional path to a YAML policy file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Courtesy pause before each remote request, in seconds
    #[arg(long)]
    pub inter_request_delay_secs: Option<u64>,

    /// Total fetch attempts per identifier
    #[arg(long)]
    pub retry_max_attempts: Option<u32>,

    /// Base pause after a failed attempt, in seconds
    #[arg(long)]
    pub retry_backoff_secs: Option<u64>,
}

impl Cli {
    /// Layer the CLI's pacing flags over a base policy.
    pub fn apply_overrides(&self, mut policy: FetchPolicy) -> FetchPolicy {
        if let Some(delay) = self.inter_request_delay_secs {
            policy.inter_request_delay_secs = delay;
        }
        if let Some(attempts) = self.retry_max_attempts {
            policy.retry_max_attempts = attempts;
        }
        if let Some(backoff) = self.retry_backoff_secs {
            policy.retry_backoff_secs = backoff;
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "text_harvest",
            "--input",
            "urls.txt",
            "--store-root",
            "./html",
        ]);

        assert_eq!(cli.input, "urls.txt");
        assert_eq!(cli.store_root, "./html");
        assert!(cli.report.is_none());
    }

    #[test]
    fn test_cli_short_flags_and_default_store() {
        let cli = Cli::parse_from(&["text_harvest", "-i", "/tmp/urls.txt"]);

        assert_eq!(cli.input, "/tmp/urls.txt");
        assert_eq!(cli.store_root, "harvest");
    }

    #[test]
    fn test_pacing_flags_override_policy() {
        let cli = Cli::parse_from(&[
            "text_harvest",
            "-i",
            "urls.txt",
            "--retry-max-attempts",
            "5",
            "--inter-request-delay-secs",
            "1",
        ]);

        let policy = cli.apply_overrides(FetchPolicy::default());
        assert_eq!(policy.retry_max_attempts, 5);
        assert_eq!(policy.inter_request_delay_secs, 1);
        assert_eq!(
            policy.retry_backoff_secs,
            FetchPolicy::default().retry_backoff_secs
        );
    }
}
