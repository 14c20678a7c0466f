//! Command line entry point: solve one detection file and print the result as JSON

mod cli;

use std::process;

use env_logger::{Builder, Target};
use log::{error, info};

use bistatic_telemetry::api::{BlockingSolverApi, JsonFormatter, SolverOutput};
use bistatic_telemetry::utils::SolverConfig;
use bistatic_telemetry::validation::PipelineError;

use cli::Cli;

fn main() {
    let mut builder = Builder::from_default_env();
    builder
        .target(Target::Stderr)
        .format_timestamp_secs()
        .init();

    let cli = Cli::new();
    process::exit(run(&cli));
}

/// Solve the input named on the command line, returning the exit code
fn run(cli: &Cli) -> i32 {
    let formatter = if cli.compact() {
        JsonFormatter::compact()
    } else {
        JsonFormatter::new()
    };

    let config = match cli.config_path() {
        Some(path) => match SolverConfig::from_file(path) {
            Ok(config) => {
                info!("loaded solver configuration from {}", path);
                config
            },
            Err(e) => {
                error!("{}", e);
                let output = SolverOutput::Error(PipelineError::from(e).to_output());
                return emit(&formatter, &output, 1);
            },
        },
        None => SolverConfig::default(),
    };

    let api = BlockingSolverApi::new(config);
    let result = api.solve_file(cli.input_path());

    let code = match &result {
        Ok(_) => 0,
        Err(e) if e.is_no_solution() => 0,
        Err(e) => {
            error!("{}", e);
            1
        },
    };
    emit(&formatter, &SolverOutput::from(&result), code)
}

fn emit(formatter: &JsonFormatter, output: &SolverOutput, code: i32) -> i32 {
    match formatter.format(output) {
        Ok(text) => {
            println!("{}", text);
            code
        },
        Err(e) => {
            error!("failed to serialize output: {}", e);
            1
        },
    }
}
