//! Train the gait event classifier and write a competition submission.

use std::path::PathBuf;

use gaitfog::config::PipelineConfig;
use gaitfog::logging::{self, LogOptions};
use gaitfog::pipeline;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config =
        PipelineConfig::load(options.config.as_deref()).map_err(|err| err.to_string())?;
    options.apply(&mut config);
    config.validate().map_err(|err| err.to_string())?;

    if options.print_config {
        print!("{}", config.to_toml().map_err(|err| err.to_string())?);
        return Ok(());
    }

    if let Err(err) = logging::init(&LogOptions::default()) {
        eprintln!("Logging disabled: {err}");
    }

    let outcome = pipeline::run(&config).map_err(|err| err.to_string())?;
    println!(
        "held-out rows: {}  accuracy: {:.4}  macro precision: {:.4}",
        outcome.evaluation.rows, outcome.evaluation.accuracy, outcome.evaluation.macro_precision
    );
    println!(
        "wrote {} submission rows to {}",
        outcome.submission_rows,
        outcome.submission_path.display()
    );
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    model_out: Option<PathBuf>,
    rounds: Option<usize>,
    learning_rate: Option<f32>,
    bins: Option<usize>,
    max_depth: Option<usize>,
    min_samples_leaf: Option<usize>,
    include_tdcsfog: bool,
    print_config: bool,
}

impl CliOptions {
    /// Flags override values from the config file.
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(out) = &self.out {
            config.output.submission = out.clone();
        }
        if let Some(model_out) = &self.model_out {
            config.output.model = Some(model_out.clone());
        }
        if let Some(rounds) = self.rounds {
            config.training.rounds = rounds;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.training.learning_rate = learning_rate;
        }
        if let Some(bins) = self.bins {
            config.training.bins = bins;
        }
        if let Some(max_depth) = self.max_depth {
            config.training.max_depth = max_depth;
        }
        if let Some(min_samples_leaf) = self.min_samples_leaf {
            config.training.min_samples_leaf = min_samples_leaf;
        }
        if self.include_tdcsfog {
            config.training.include_tdcsfog = true;
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.out = Some(PathBuf::from(value));
            }
            "--model-out" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--model-out requires a value".to_string())?;
                options.model_out = Some(PathBuf::from(value));
            }
            "--rounds" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--rounds requires a value".to_string())?;
                options.rounds = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --rounds value: {value}"))?,
                );
            }
            "--learning-rate" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--learning-rate requires a value".to_string())?;
                options.learning_rate = Some(
                    value
                        .parse::<f32>()
                        .map_err(|_| format!("Invalid --learning-rate value: {value}"))?,
                );
            }
            "--bins" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--bins requires a value".to_string())?;
                options.bins = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --bins value: {value}"))?,
                );
            }
            "--max-depth" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--max-depth requires a value".to_string())?;
                options.max_depth = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --max-depth value: {value}"))?,
                );
            }
            "--min-samples-leaf" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--min-samples-leaf requires a value".to_string())?;
                options.min_samples_leaf = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --min-samples-leaf value: {value}"))?,
                );
            }
            "--include-tdcsfog" => options.include_tdcsfog = true,
            "--print-config" => options.print_config = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "gaitfog",
        "",
        "Trains a gait event classifier on the defog recordings and writes a submission.",
        "",
        "Usage:",
        "  gaitfog [--config gaitfog.toml] [--out submission.csv] [options]",
        "",
        "Options:",
        "  --config <file>        Pipeline config (default: <app dir>/gaitfog.toml,",
        "                         else built-in defaults).",
        "  --out <file>           Submission path (default: submission.csv).",
        "  --model-out <file>     Also save the trained model as JSON.",
        "  --rounds <n>           Boosting rounds (default: 1000).",
        "  --learning-rate <f32>  Learning rate (default: 0.03).",
        "  --bins <n>             Feature bin count for split search (default: 32).",
        "  --max-depth <n>        Deepest split path per tree (default: 7).",
        "  --min-samples-leaf <n> Fewest training rows per leaf (default: 20).",
        "  --include-tdcsfog      Train on tdcsfog recordings as well.",
        "  --print-config         Print the effective config as TOML and exit.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn flags_override_config_values() {
        let options = parse_args(args(&[
            "--rounds",
            "7",
            "--out",
            "sub.csv",
            "--max-depth",
            "2",
            "--include-tdcsfog",
        ]))
        .unwrap();
        let mut config = PipelineConfig::default();
        options.apply(&mut config);
        assert_eq!(config.training.rounds, 7);
        assert_eq!(config.output.submission, PathBuf::from("sub.csv"));
        assert!(config.training.include_tdcsfog);
        assert_eq!(config.training.bins, 32);
        assert_eq!(config.training.max_depth, 2);
        assert_eq!(config.training.train_options().max_depth, 2);
        assert_eq!(config.training.min_samples_leaf, 20);
    }

    #[test]
    fn rejects_bad_values_and_unknown_flags() {
        assert!(parse_args(args(&["--rounds", "many"])).is_err());
        assert!(parse_args(args(&["--bins"])).is_err());
        assert!(parse_args(args(&["--max-depth", "deep"])).is_err());
        assert!(parse_args(args(&["--verbose"])).is_err());
        assert!(parse_args(args(&["--help"])).is_err());
    }
}
