use crate::demo::{run_demo, run_salary, run_score, DemoArgs, SalaryArgs, ScoreArgs};
use crate::server;
use call_qa::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Call Quality Evaluation",
    about = "Run and demonstrate the call-center quality evaluation service from the command line",
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
    /// Score a rubric from a JSON file and report whether it could be submitted
    Score(ScoreArgs),
    /// Compute an operator's monthly salary from KPI inputs
    Salary(SalaryArgs),
    /// Run an end-to-end CLI demo covering evaluations, tasks, and salary
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Salary(args) => run_salary(args),
        Command::Demo(args) => run_demo(args),
    }
}
