#[macro_use]
extern crate log;
use env_logger::Env;
extern crate clap;
use clap::{App, Arg, ArgMatches, SubCommand};
#[macro_use]
extern crate serde;

use std::path::{Path, PathBuf};
use std::process;

use common::HarnessError;
use queryexe::query::Connector;
use utilities::AdvisorProcess;

use crate::config::{HarnessConfig, RunOptions};

mod config;
mod runner;

fn run_args<'a, 'b>(cmd: App<'a, 'b>) -> App<'a, 'b> {
    cmd.arg(
        Arg::with_name("dir")
            .short("d")
            .long("dir")
            .value_name("DIR")
            .help("Directory of .sql workload files")
            .takes_value(true)
            .required(true),
    )
    .arg(
        Arg::with_name("output")
            .short("o")
            .long("output")
            .value_name("FILE")
            .help("Results log")
            .takes_value(true)
            .required(true),
    )
    .arg(
        Arg::with_name("db")
            .long("db")
            .value_name("NAME")
            .help("Database name, overrides the config file")
            .takes_value(true),
    )
    .arg(
        Arg::with_name("order")
            .long("order")
            .value_name("FILE")
            .help("File listing query files in execution order")
            .takes_value(true),
    )
    .arg(
        Arg::with_name("skip_processed")
            .long("skip-processed")
            .help("Skip queries that already have archived plans"),
    )
    .arg(
        Arg::with_name("chunk_size")
            .long("chunk-size")
            .value_name("N")
            .help("Queries per chunk")
            .takes_value(true),
    )
}

fn run_options(matches: &ArgMatches) -> RunOptions {
    RunOptions {
        workload_dir: PathBuf::from(matches.value_of("dir").unwrap_or_default()),
        output: PathBuf::from(matches.value_of("output").unwrap_or_default()),
        manifest: matches.value_of("order").map(PathBuf::from),
        skip_processed: matches.is_present("skip_processed"),
    }
}

/// Applies command line overrides on top of the file or default configuration.
fn apply_overrides(config: &mut HarnessConfig, matches: &ArgMatches) -> Result<(), HarnessError> {
    if let Some(db) = matches.value_of("db") {
        config.database.params.dbname = db.to_string();
    }
    if let Some(n) = matches.value_of("chunk_size") {
        config.workload.chunk_size = n
            .parse()
            .map_err(|_| HarnessError::ConfigError(format!("invalid chunk size '{}'", n)))?;
    }
    config.validate()
}

fn connect(config: &HarnessConfig) -> Result<Connector, HarnessError> {
    Connector::connect(
        &config.database.params,
        config.database.connection,
        &config.database.pool,
    )
}

fn run(matches: &ArgMatches) -> Result<(), HarnessError> {
    let config_path = matches
        .value_of("config")
        .or_else(|| matches.subcommand().1.and_then(|sub| sub.value_of("config")));
    let mut config = match config_path {
        Some(path) => HarnessConfig::from_file(Path::new(path))?,
        None => HarnessConfig::default(),
    };

    match matches.subcommand() {
        ("train", Some(sub)) => {
            apply_overrides(&mut config, sub)?;
            info!("Starting training run with config: {:?}", config);
            let opts = run_options(sub);
            let source = connect(&config)?;
            let advisor = AdvisorProcess::new(config.advisor.process.clone());
            let summary = runner::train(&source, advisor, &config, &opts)?;
            info!("Training finished: {:?}", summary);
        }
        ("evaluate", Some(sub)) => {
            apply_overrides(&mut config, sub)?;
            info!("Starting evaluation run with config: {:?}", config);
            let opts = run_options(sub);
            let source = connect(&config)?;
            let advisor = AdvisorProcess::new(config.advisor.process.clone());
            let summary = runner::evaluate(
                &source,
                advisor,
                &config,
                &opts,
                sub.value_of("final_model").map(Path::new),
                sub.is_present("frozen"),
            )?;
            info!("Evaluation finished: {:?}", summary);
        }
        ("summary", Some(sub)) => {
            let log = Path::new(sub.value_of("log").unwrap_or_default());
            let rows = runner::summary(log, config.workload.statement_timeout_ms)?;
            print!("{}", runner::format_summary(&rows));
        }
        _ => {
            return Err(HarnessError::ConfigError(String::from(
                "no subcommand given, see --help",
            )))
        }
    }
    Ok(())
}

/// Entry point for the benchmark harness.
fn main() {
    // Configure log environment
    env_logger::from_env(Env::default().default_filter_or("info")).init();

    let matches = App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file")
                .takes_value(true)
                .required(false)
                .global(true),
        )
        .subcommand(run_args(
            SubCommand::with_name("train").about("Sampled training run with retraining"),
        ))
        .subcommand(
            run_args(SubCommand::with_name("evaluate").about("Evaluation run in load order"))
                .arg(
                    Arg::with_name("final_model")
                        .long("final-model")
                        .value_name("DIR")
                        .help("Stored model to restore and load before the run")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("frozen")
                        .long("frozen")
                        .help("Never retrain during the run"),
                ),
        )
        .subcommand(
            SubCommand::with_name("summary")
                .about("Per-chunk statistics of a results log")
                .arg(
                    Arg::with_name("log")
                        .short("l")
                        .long("log")
                        .value_name("FILE")
                        .help("Results log to summarize")
                        .takes_value(true)
                        .required(true),
                ),
        )
        .get_matches();

    if let Err(e) = run(&matches) {
        error!("{}", e);
        process::exit(1);
    }
    info!("Terminated.");
}
