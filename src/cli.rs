//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Enrich the Norwegian business registry export with company websites.
///
/// Downloads the gzip-compressed registry JSON array, streams through it
/// record by record, looks up a best-guess official website per company, and
/// appends the result to a CSV file. Progress is checkpointed after every
/// row, so an interrupted run resumes where it left off.
#[derive(Parser, Debug)]
#[command(name = "brreg-enrich")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Force a full refresh without prompting (re-download the artifact,
    /// reset progress, discard prior CSV output)
    #[arg(long, conflicts_with = "resume")]
    pub refresh: bool,

    /// Resume from the saved progress marker without prompting
    #[arg(long)]
    pub resume: bool,

    /// Directory for the artifact, CSV output, and progress marker
    /// (overrides DATA_DIR)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Delay before each external API request, in milliseconds
    /// (overrides REQUEST_DELAY_MS, max 60000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub request_delay_ms: Option<u64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["brreg-enrich"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.refresh);
        assert!(!args.resume);
        assert!(args.data_dir.is_none());
        assert!(args.request_delay_ms.is_none());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["brreg-enrich", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_refresh_and_resume_conflict() {
        let result = Args::try_parse_from(["brreg-enrich", "--refresh", "--resume"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides_parse() {
        let args = Args::try_parse_from([
            "brreg-enrich",
            "--data-dir",
            "/tmp/registry",
            "--request-delay-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/registry")));
        assert_eq!(args.request_delay_ms, Some(250));
    }

    #[test]
    fn test_cli_rejects_out_of_range_delay() {
        let result = Args::try_parse_from(["brreg-enrich", "--request-delay-ms", "90000"]);
        assert!(result.is_err());
    }
}
