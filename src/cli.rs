use clap::{Args, Parser};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aws-all")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Run one AWS CLI command across every scoped account and region", long_about = None)]
#[command(after_help = "Examples:
  aws-all -p dev,prod ec2 describe-vpcs
  aws-all -r all ec2 describe-security-groups --query 'SecurityGroups[].GroupId'
  aws-all -m '^prod-' s3 ls
  aws-all iam list-users          # global service, always us-east-1")]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Regions to target: comma-separated list, `all`, or `default`
    #[arg(short, long, value_name = "REGIONS")]
    pub regions: Option<String>,

    /// Query global services in the requested regions instead of their pinned region
    #[arg(short, long)]
    pub global: bool,

    /// Append resolved profiles to the default scope file
    #[arg(short, long)]
    pub add: bool,

    /// Number of concurrent invocations
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Generate shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,

    /// The aws command to run, without `aws` (e.g. `ec2 describe-instances`)
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

/// Which profiles to run against. At most one may be given.
#[derive(Args, Debug, Default, Clone)]
pub struct ScopeArgs {
    /// Comma-separated profiles to run against
    #[arg(short, long, value_delimiter = ',', value_name = "PROFILES")]
    pub profiles: Vec<String>,

    /// Scope file with one `profile,account` line per profile
    #[arg(short, long, value_name = "PATH")]
    pub scope_file: Option<PathBuf>,

    /// Select every local profile whose name matches a regex
    #[arg(short = 'm', long = "match", value_name = "REGEX")]
    pub matching: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_command_keeps_flags() {
        let cli = Cli::try_parse_from([
            "aws-all",
            "-p",
            "dev,prod",
            "-r",
            "all",
            "ec2",
            "describe-instances",
            "--query",
            "Reservations[]",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.scope.profiles, vec!["dev", "prod"]);
        assert_eq!(cli.regions.as_deref(), Some("all"));
        assert_eq!(cli.verbose, 0);
        assert_eq!(
            cli.command,
            vec!["ec2", "describe-instances", "--query", "Reservations[]", "-v"]
        );
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "aws-all", "-vv", "-g", "-a", "-j", "3", "-m", "^prod", "iam", "list-users",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.global);
        assert!(cli.add);
        assert_eq!(cli.jobs, Some(3));
        assert_eq!(cli.scope.matching.as_deref(), Some("^prod"));
        assert!(cli.scope.profiles.is_empty());
    }

    #[test]
    fn test_completions_without_command() {
        let cli = Cli::try_parse_from(["aws-all", "--completions", "bash"]).unwrap();
        assert!(cli.completions.is_some());
        assert!(cli.command.is_empty());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
