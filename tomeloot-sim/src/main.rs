mod reports;
mod seeds;
mod sim;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use reports::SimReport;
use seeds::{resolve_seed_inputs, split_csv};
use sim::{SimSettings, run_all, validate_pity};
use tomeloot_engine::{EmbeddedCatalog, RewardConfig, RewardEngine};

#[derive(Debug, Parser)]
#[command(name = "tomeloot-sim", version = "0.1.0")]
#[command(about = "Seeded reading-session sweeps for the Tomeloot reward engine")]
struct Args {
    /// Seeds to run (comma-separated, decimal or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Sessions chained per seed, one per simulated day
    #[arg(long, default_value_t = 10)]
    sessions: u32,

    /// Length of every session in minutes
    #[arg(long, default_value_t = 45)]
    minutes: u32,

    /// Reading streak in days at the start of the run
    #[arg(long, default_value_t = 0)]
    streak: u32,

    /// Book size in pages; enables the completion bonus
    #[arg(long)]
    size: Option<u32>,

    /// Book genres (comma-separated)
    #[arg(long, default_value = "")]
    genres: String,

    /// Global XP boost modifier
    #[arg(long, default_value_t = 0.0)]
    xp_boost: f64,

    /// Global luck modifier
    #[arg(long, default_value_t = 0.0)]
    luck: f64,

    /// Global bonus-drop boost modifier
    #[arg(long, default_value_t = 0.0)]
    drop_boost: f64,

    /// Mark the final session as finishing the book
    #[arg(long)]
    complete: bool,

    /// Earn blank boxes and resolve their tier when opened
    #[arg(long)]
    defer: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn settings(&self) -> SimSettings {
        SimSettings {
            sessions: self.sessions,
            minutes: self.minutes,
            streak: self.streak,
            size: self.size,
            genres: split_csv(&self.genres),
            xp_boost: self.xp_boost,
            luck: self.luck,
            drop_boost: self.drop_boost,
            complete: self.complete,
            verbose: self.verbose,
        }
    }

    fn config(&self) -> RewardConfig {
        RewardConfig {
            defer_tier_resolution: self.defer,
            ..RewardConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    announce_banner();

    let start_time = Instant::now();
    let settings = args.settings();
    settings.validate()?;
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let engine = RewardEngine::from_source(&EmbeddedCatalog, args.config())
        .context("failed to assemble the reward engine")?;

    let runs = run_all(&engine, &settings, &seeds)?;
    let report = SimReport::new(&settings, args.defer, &runs);
    write_report(&args, &report, start_time)?;

    validate_pity(&runs, engine.config().pity.hard_cap)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn announce_banner() {
    eprintln!("{}", "📚 Tomeloot Session Simulator".bright_cyan().bold());
    eprintln!("{}", "=============================".cyan());
}

fn write_report(args: &Args, report: &SimReport<'_>, start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::open(args.output.as_deref())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, report)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, report)?,
        _ => {
            reports::generate_console_report(&mut output_target, report)?;
            let duration = start_time.elapsed();
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush()?;
    Ok(())
}

/// Report sink: a buffered file when `--output` is given, stdout otherwise.
enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn open(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::Stdout(BufWriter::new(stdout())));
        };
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Self::File(BufWriter::new(file)))
    }

    fn sink(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(out) => out,
            Self::File(out) => out,
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.sink().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.sink().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SeedRun;

    fn base_args() -> Args {
        Args {
            seeds: "1337".to_string(),
            sessions: 2,
            minutes: 30,
            streak: 0,
            size: None,
            genres: String::new(),
            xp_boost: 0.0,
            luck: 0.0,
            drop_boost: 0.0,
            complete: false,
            defer: false,
            report: "json".to_string(),
            output: None,
            verbose: false,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tomeloot-{name}-{}", std::process::id()))
    }

    #[test]
    fn args_map_into_settings_and_config() {
        let args = Args {
            genres: "fantasy, essays".to_string(),
            defer: true,
            size: Some(240),
            ..base_args()
        };
        let settings = args.settings();
        assert_eq!(settings.genres, vec!["fantasy", "essays"]);
        assert_eq!(settings.size, Some(240));
        assert!(args.config().defer_tier_resolution);
        assert!(!base_args().config().defer_tier_resolution);
    }

    #[test]
    fn clap_parses_long_flags() {
        let args = Args::try_parse_from([
            "tomeloot-sim",
            "--seeds",
            "1,2",
            "--drop-boost",
            "0.25",
            "--report",
            "markdown",
            "--complete",
        ])
        .unwrap();
        assert_eq!(args.seeds, "1,2");
        assert!((args.drop_boost - 0.25).abs() < f64::EPSILON);
        assert_eq!(args.report, "markdown");
        assert!(args.complete);
        assert!(Args::try_parse_from(["tomeloot-sim", "--report", "csv"]).is_err());
    }

    #[test]
    fn write_report_emits_markdown_to_file() {
        let path = temp_file("report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(path.clone()),
            ..base_args()
        };
        let settings = args.settings();
        let runs = vec![SeedRun {
            seed: 1337,
            ..SeedRun::default()
        }];
        write_report(&args, &SimReport::new(&settings, false, &runs), Instant::now()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("# Tomeloot Simulation Results"));
        assert!(content.contains("| 1337 |"));
    }

    #[test]
    fn write_report_console_includes_total_time() {
        let path = temp_file("report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(path.clone()),
            ..base_args()
        };
        let settings = args.settings();
        write_report(&args, &SimReport::new(&settings, false, &[]), Instant::now()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Drop-Rate Summary"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn output_target_flushes_file_on_request() {
        let path = temp_file("sink.txt");
        let mut target = OutputTarget::open(Some(path.as_path())).unwrap();
        writeln!(target, "seed 7").unwrap();
        target.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "seed 7\n");
    }
}
