//! Developer utility to shrink a CSV table's column storage and report the saving.

use std::path::{Path, PathBuf};

use gaitfog::dataset::{discover_csv_files, read_recordings};
use gaitfog::logging::{self, LogOptions};
use gaitfog::optimize::reduce_memory_usage;
use gaitfog::table::Table;
use gaitfog::table::csv::read_csv;
use gaitfog::table::summary::{render, summarize};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let log_options = LogOptions {
        log_to_file: false,
        ..LogOptions::default()
    };
    if let Err(err) = logging::init(&log_options) {
        eprintln!("Logging disabled: {err}");
    }

    let table = load(&options.input, options.recursive)?;
    let (optimized, report) = reduce_memory_usage(&table);
    drop(table);

    print!("{}", render(&optimized, &summarize(&optimized)));
    println!(
        "memory: {:.2} MB -> {:.2} MB ({:.1}% smaller)",
        report.before_mb(),
        report.after_mb(),
        report.reduction_percent()
    );
    Ok(())
}

fn load(input: &Path, recursive: bool) -> Result<Table, String> {
    if input.is_dir() {
        let paths = discover_csv_files(input, recursive).map_err(|err| err.to_string())?;
        read_recordings(&paths).map_err(|err| err.to_string())
    } else {
        read_csv(input).map_err(|err| err.to_string())
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    input: PathBuf,
    recursive: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut input: Option<PathBuf> = None;
    let mut recursive = false;
    for arg in &args {
        match arg.as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--recursive" => recursive = true,
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            path => {
                if input.replace(PathBuf::from(path)).is_some() {
                    return Err(format!("Only one input path is accepted\n\n{}", help_text()));
                }
            }
        }
    }
    let input = input.ok_or_else(help_text)?;
    Ok(CliOptions { input, recursive })
}

fn help_text() -> String {
    [
        "gaitfog-reduce",
        "",
        "Reads a CSV file, or every CSV file in a directory, narrows column storage,",
        "and prints a per-column summary with the memory saved.",
        "",
        "Usage:",
        "  gaitfog-reduce <file.csv | dir> [--recursive]",
        "",
        "Options:",
        "  --recursive   Descend into subdirectories when the input is a directory.",
    ]
    .join("\n")
}
