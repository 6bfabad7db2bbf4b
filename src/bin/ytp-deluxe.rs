use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use time::OffsetDateTime;
use time::macros::format_description;
use ytp_core::error::AppError;
use ytp_core::ffmpeg::{DryRunRunner, verify_video};
use ytp_core::token::generate_legacy_key;
use ytp_core::{EffectKind, Engine, EngineOptions, GenerationConfig, PREVIEW_SECONDS};

#[derive(Parser)]
#[command(name = "ytp-deluxe")]
#[command(about = "Apply randomized meme effects to a video with FFmpeg", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// FFmpeg binary to use instead of discovery
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    /// Directory for intermediate files [default: <system temp>/ytp_temp]
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Asset directory scanned for overlay images and sounds [default: ./assets]
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// Seed the random source for reproducible output
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print FFmpeg invocations instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the configured effects to one video
    Generate {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        effects: EffectArgs,
        /// Decode the result afterwards to check it is intact
        #[arg(long)]
        verify: bool,
        /// Play the result with ffplay when done
        #[arg(long)]
        play: bool,
    },
    /// Produce several randomized variants (requires a beta key)
    Batch {
        input: PathBuf,
        out_dir: PathBuf,
        #[arg(short, long, default_value = "3")]
        count: u32,
        /// Beta key; read from beta_key.txt when omitted
        #[arg(short, long)]
        key: Option<String>,
        #[command(flatten)]
        effects: EffectArgs,
    },
    /// Play a file, or render and play a short low-res preview of an input
    Preview {
        file: PathBuf,
        /// Render the first seconds of FILE as a preview before playing
        #[arg(long)]
        render: bool,
        #[arg(long, default_value_t = PREVIEW_SECONDS)]
        seconds: f64,
    },
    /// Generate legacy-style beta keys
    Keygen {
        #[arg(short, long, default_value = "OLD")]
        prefix: String,
        #[arg(short, long, default_value = "1")]
        count: u32,
    },
    /// List effects in the order they are applied
    Effects {
        /// Print the default configuration as JSON instead
        #[arg(long)]
        template: bool,
    },
}

#[derive(Args)]
struct EffectArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Enable an effect (repeatable); names as listed by `effects`
    #[arg(short, long = "enable", value_name = "EFFECT")]
    enable: Vec<EffectKind>,
    /// Enable every effect
    #[arg(long)]
    all: bool,
    #[arg(long)]
    sentence_mix: bool,
    #[arg(long)]
    mode_2009: bool,
    #[arg(long)]
    mode_2012: bool,
}

impl EffectArgs {
    fn build(&self) -> Result<GenerationConfig, AppError> {
        let mut config = match &self.config {
            Some(path) => GenerationConfig::load(path)?,
            None => GenerationConfig::default(),
        };
        let kinds = if self.all {
            EffectKind::ORDER.to_vec()
        } else {
            self.enable.clone()
        };
        for kind in kinds {
            config.enable(kind);
        }
        config.sentence_mix.enabled |= self.sentence_mix;
        config.mode_2009 |= self.mode_2009;
        config.mode_2012 |= self.mode_2012;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let time_fmt = format_description!("[hour]:[minute]:[second]");
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(move |buf, record| {
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            let ts = now.format(&time_fmt).unwrap_or_else(|_| "??:??:??".into());
            let target = record
                .target()
                .strip_prefix("ytp::")
                .unwrap_or(record.target());
            writeln!(
                buf,
                "{ts}  {level:5}  {target}  {message}",
                level = record.level(),
                message = record.args()
            )
        })
        .init();
}

fn engine(cli: &Cli) -> Result<Engine, AppError> {
    let options = EngineOptions {
        ffmpeg_path: cli.ffmpeg.clone(),
        work_dir: cli.work_dir.clone(),
        assets_dir: cli.assets.clone(),
        seed: cli.seed,
    };
    if cli.dry_run {
        Engine::with_runner(Arc::new(DryRunRunner), options)
    } else {
        Engine::new(options)
    }
}

fn report(json: bool, outputs: &[PathBuf]) {
    if json {
        println!("{}", json!({ "outputs": outputs }));
    } else {
        for path in outputs {
            println!("{}", path.display());
        }
    }
}

fn verify(engine: &Engine, path: &Path) -> Result<(), AppError> {
    match engine.ffmpeg_path() {
        Some(ffmpeg) => verify_video(ffmpeg, path),
        None => {
            log::info!(target: "ytp::cli", "Skipping verification of {} (dry run)", path.display());
            Ok(())
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    match &cli.command {
        Commands::Generate {
            input,
            output,
            effects,
            verify: check,
            play,
        } => {
            let config = effects.build()?;
            let engine = engine(cli)?;
            let written = engine.generate(input, output, &config)?;
            if *check {
                verify(&engine, &written)?;
            }
            report(cli.json, std::slice::from_ref(&written));
            if *play && !cli.dry_run {
                engine.preview(&written)?;
            }
        }
        Commands::Batch {
            input,
            out_dir,
            count,
            key,
            effects,
        } => {
            let config = effects.build()?;
            let engine = engine(cli)?;
            let written = engine.batch(input, out_dir, &config, *count, key.as_deref())?;
            report(cli.json, &written);
        }
        Commands::Preview {
            file,
            render,
            seconds,
        } => {
            let engine = engine(cli)?;
            if *render {
                engine.preview_input(file, *seconds)?;
            } else {
                engine.preview(file)?;
            }
        }
        Commands::Keygen { prefix, count } => {
            let mut rng = match cli.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let keys: Vec<String> = (0..*count)
                .map(|_| generate_legacy_key(prefix, &mut rng))
                .collect();
            if cli.json {
                println!("{}", json!({ "keys": keys }));
            } else {
                for key in keys {
                    println!("{}", key);
                }
            }
        }
        Commands::Effects { template } => {
            if *template {
                println!("{}", GenerationConfig::default().to_json_pretty()?);
            } else {
                for (n, kind) in EffectKind::ORDER.iter().enumerate() {
                    let level = kind
                        .default_level()
                        .map(|l| format!("level {}", l))
                        .unwrap_or_default();
                    let alias = if kind.legacy_name() != kind.name() {
                        format!("(alias {})", kind.legacy_name())
                    } else {
                        String::new()
                    };
                    println!("{:>2}. {:<17} {:<11} {}", n + 1, kind.name(), level, alias);
                }
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if cli.json {
                println!("{}", json!({ "error": err }));
            } else {
                log::error!(target: "ytp::cli", "{}", err);
            }
            ExitCode::FAILURE
        }
    }
}
