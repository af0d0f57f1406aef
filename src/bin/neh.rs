//! A command line interface to the NEH heuristic for permutation flow-shop instances.
//!
//! Every input is either an instance file or a directory of instance files. Results are appended to
//! one CSV report per instance size in the output directory.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Command};
use flowshop::io::{instance_files, read_instance_file, ResultWriter};
use flowshop::monitor::{CompositeMonitor, InfoLogger, LogMonitor, TimeLimitMonitor};
use flowshop::neh::{Evaluation, InsertionDepth, Neh, NehConfig, TieBreak};
use flowshop::{Error, Result};
use ordered_float::OrderedFloat;

const INPUT_ARG_NAME: &str = "INPUT";
const OUT_ARG_NAME: &str = "out";
const SUFFIX_ARG_NAME: &str = "suffix";
const TIE_BREAK_ARG_NAME: &str = "tie-break";
const DEPTH_ARG_NAME: &str = "depth";
const EVALUATION_ARG_NAME: &str = "evaluation";
const TIME_LIMIT_ARG_NAME: &str = "time-limit";
const CONFIG_ARG_NAME: &str = "config";
const VERBOSE_ARG_NAME: &str = "verbose";

type Time = OrderedFloat<f64>;

fn get_app() -> Command {
    Command::new("neh")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Solves permutation flow-shop instances with the NEH heuristic")
        .arg(
            Arg::new(INPUT_ARG_NAME)
                .help("Instance files or directories with instance files")
                .required(true)
                .num_args(1..),
        )
        .arg(
            Arg::new(OUT_ARG_NAME)
                .help("Directory for the CSV reports")
                .short('o')
                .long(OUT_ARG_NAME)
                .default_value("."),
        )
        .arg(
            Arg::new(SUFFIX_ARG_NAME)
                .help("Suffix of the CSV report names")
                .long(SUFFIX_ARG_NAME)
                .default_value(ResultWriter::DEFAULT_SUFFIX),
        )
        .arg(
            Arg::new(TIE_BREAK_ARG_NAME)
                .help("Order of jobs with equal total processing time")
                .long(TIE_BREAK_ARG_NAME)
                .value_parser(["lowest", "highest"]),
        )
        .arg(
            Arg::new(DEPTH_ARG_NAME)
                .help("Range of insertion depths")
                .long(DEPTH_ARG_NAME)
                .value_parser(["reference", "full"]),
        )
        .arg(
            Arg::new(EVALUATION_ARG_NAME)
                .help("Scoring of insertion positions")
                .long(EVALUATION_ARG_NAME)
                .value_parser(["recurrence", "accelerated"]),
        )
        .arg(
            Arg::new(TIME_LIMIT_ARG_NAME)
                .help("Time limit of a single run in seconds")
                .short('t')
                .long(TIME_LIMIT_ARG_NAME),
        )
        .arg(
            Arg::new(CONFIG_ARG_NAME)
                .help("JSON file with the heuristic configuration (overridden by explicit flags)")
                .short('c')
                .long(CONFIG_ARG_NAME),
        )
        .arg(
            Arg::new(VERBOSE_ARG_NAME)
                .help("Log every insertion depth")
                .short('v')
                .long(VERBOSE_ARG_NAME)
                .action(ArgAction::SetTrue),
        )
}

fn main() {
    let matches = get_app().get_matches();

    if let Err(err) = run(&matches) {
        eprintln!("neh: {err}");
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let config = get_config(matches)?;
    let neh = Neh::new(config);

    let mut monitor = get_monitor(matches)?;

    let out = matches
        .get_one::<String>(OUT_ARG_NAME)
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    let mut writer = ResultWriter::new(out)?;
    if let Some(suffix) = matches.get_one::<String>(SUFFIX_ARG_NAME) {
        writer = writer.with_suffix(suffix.as_str());
    }

    for path in get_inputs(matches)? {
        let instance = read_instance_file::<Time, _>(&path)?;
        let (solution, stats) = neh.solve_with(&instance, &mut monitor)?;

        let name = path
            .file_stem()
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        writer.write(
            name,
            stats.num_machines,
            stats.num_jobs,
            solution.value.into_inner(),
            stats.elapsed,
        )?;

        println!(
            "{name}: {} jobs on {} machines, makespan {} in {:.3}ms",
            stats.num_jobs,
            stats.num_machines,
            solution.value,
            stats.elapsed.as_secs_f64() * 1000.
        );
    }

    for report in writer.reports() {
        println!("report written to '{}'", report.display());
    }

    Ok(())
}

fn get_config(matches: &ArgMatches) -> Result<NehConfig> {
    let mut config = match matches.get_one::<String>(CONFIG_ARG_NAME) {
        Some(path) => read_config(path)?,
        None => NehConfig::default(),
    };

    if let Some(tie_break) = matches.get_one::<String>(TIE_BREAK_ARG_NAME) {
        config.tie_break = match tie_break.as_str() {
            "highest" => TieBreak::HighestIndex,
            _ => TieBreak::LowestIndex,
        };
    }

    if let Some(depth) = matches.get_one::<String>(DEPTH_ARG_NAME) {
        config.depth = match depth.as_str() {
            "full" => InsertionDepth::Full,
            _ => InsertionDepth::Reference,
        };
    }

    if let Some(evaluation) = matches.get_one::<String>(EVALUATION_ARG_NAME) {
        config.evaluation = match evaluation.as_str() {
            "accelerated" => Evaluation::Accelerated,
            _ => Evaluation::Recurrence,
        };
    }

    Ok(config)
}

fn read_config(path: &str) -> Result<NehConfig> {
    let file = File::open(path)
        .map_err(|err| Error::Io(format!("cannot open config file '{path}': {err}")))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn get_monitor(matches: &ArgMatches) -> Result<CompositeMonitor<Time>> {
    let logger: InfoLogger = Arc::new(|msg: &str| println!("{msg}"));

    let log = if matches.get_flag(VERBOSE_ARG_NAME) {
        LogMonitor::verbose(logger)
    } else {
        LogMonitor::summary(logger)
    };

    let mut monitor = CompositeMonitor::new().with_monitor(Box::new(log));

    if let Some(limit) = matches.get_one::<String>(TIME_LIMIT_ARG_NAME) {
        let limit = limit
            .parse::<f64>()
            .ok()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .ok_or_else(|| Error::InvalidArgument(format!("invalid time limit '{limit}'")))?;
        monitor.add_monitor(Box::new(TimeLimitMonitor::new(limit)));
    }

    Ok(monitor)
}

fn get_inputs(matches: &ArgMatches) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();

    for input in matches.get_many::<String>(INPUT_ARG_NAME).into_iter().flatten() {
        let path = Path::new(input);
        if path.is_dir() {
            inputs.extend(instance_files(path)?);
        } else {
            inputs.push(path.to_path_buf());
        }
    }

    Ok(inputs)
}
