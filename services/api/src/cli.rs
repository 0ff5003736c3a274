use clap::{Args, Parser, Subcommand};
use talentflow::error::AppError;

use crate::demo::{run_demo, DemoArgs};
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "TalentFlow",
    about = "Run the TalentFlow hiring-pipeline service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run a scripted walkthrough of the pipeline, including a forced
    /// optimistic rollback
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Number of jobs to seed on startup
    #[arg(long, default_value_t = DEFAULT_SEED_JOBS)]
    pub(crate) seed_jobs: usize,
    /// Number of candidates to seed on startup
    #[arg(long, default_value_t = DEFAULT_SEED_CANDIDATES)]
    pub(crate) seed_candidates: usize,
}

const DEFAULT_SEED_JOBS: usize = 25;
const DEFAULT_SEED_CANDIDATES: usize = 200;

// A bare invocation (no subcommand) must serve with the same seed counts
// as an explicit `serve`, so the derive is not enough here.
impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            seed_jobs: DEFAULT_SEED_JOBS,
            seed_candidates: DEFAULT_SEED_CANDIDATES,
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_seeds_the_documented_counts() {
        let args = ServeArgs::default();
        assert_eq!(args.seed_jobs, 25);
        assert_eq!(args.seed_candidates, 200);
        assert_eq!(args.host, None);
        assert_eq!(args.port, None);
    }

    #[test]
    fn explicit_serve_matches_the_bare_default() {
        let cli = Cli::try_parse_from(["talentflow", "serve"]).expect("serve parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.seed_jobs, ServeArgs::default().seed_jobs);
                assert_eq!(args.seed_candidates, ServeArgs::default().seed_candidates);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn seed_flags_override_the_defaults() {
        let cli = Cli::try_parse_from(["talentflow", "serve", "--seed-jobs", "3"])
            .expect("serve with flag parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.seed_jobs, 3);
                assert_eq!(args.seed_candidates, 200);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }
}
