mod catalog;
mod cli;
mod config;
mod dispatcher;
mod error;
mod fileops;
mod guided;
mod logger;
mod progress;
mod worker;

use cli::{Cli, CliArgs, Command};
use config::{exit_codes, messages, Mode, RunConfig};
use error::Result;
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::CRITICAL_ERROR
        }
    };

    process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse_args();

    match cli.command {
        Some(Command::Cli(args)) => run_cli(args).await,
        Some(Command::Guided) | None => run_guided().await,
    }
}

async fn run_cli(args: CliArgs) -> Result<i32> {
    let quiet = args.quiet;

    let config = args.validate_and_normalize()?;

    logger::initialize_logging(quiet)?;

    if !quiet {
        cli::print_config_info(&config);
        println!("{}", messages::GATHERING_FILES);
    }
    logger::log_startup_info(&config);

    let jobs = catalog::enumerate(&config.source_root)?;

    execute(config, jobs, quiet).await
}

async fn run_guided() -> Result<i32> {
    let stdin = std::io::stdin();
    let mut prompter = guided::Prompter::new(stdin.lock(), std::io::stdout());

    let Some(plan) = guided::plan_guided_run(&mut prompter, RunConfig::default_worker_count())? else {
        return Ok(exit_codes::SUCCESS);
    };
    drop(prompter);

    logger::initialize_logging(false)?;
    logger::log_startup_info(&plan.config);

    execute(plan.config, plan.jobs, false).await
}

/// Общий путь для обоих режимов: проверки "нечего делать", пул, отчет
async fn execute(config: RunConfig, jobs: Vec<catalog::Job>, quiet: bool) -> Result<i32> {
    let total = jobs.len();
    let convertible = catalog::count_convertible(&jobs);
    logger::log_files_found(total, convertible);

    if jobs.is_empty() {
        println!("{}", messages::NO_FILES_FOUND);
        return Ok(exit_codes::SUCCESS);
    }

    if config.mode == Mode::InPlace && convertible == 0 {
        println!("{}", messages::NO_CONVERTIBLE_FILES);
        return Ok(exit_codes::SUCCESS);
    }

    if !quiet {
        println!("{}", messages::PROCESSING_STARTED);
    }

    let progress = progress::TerminalProgress::new(total, quiet);
    let pool = worker::WorkerPool::new(config.worker_count, fileops::default_decoder())
        .with_progress(progress.callback());

    let result = pool.run(jobs, &config).await;
    progress.finish();

    let summary = logger::RunSummary::from_run(&result, total, convertible, config.dry_run);
    summary.print_final_report();

    if !result.has_failures() {
        println!("\n{}", messages::ALL_DONE);
    }

    Ok(summary.exit_code())
}
