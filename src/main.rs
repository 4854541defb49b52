use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use attention_monitor::simulate::{self, SubjectProfile, SyntheticMicrophone};
use attention_monitor::{
    init_logging, AnalyzerConfig, AttentionFusionEngine, Database, MonotonicClock, SqliteSink,
};

#[derive(Parser)]
#[command(name = "attention-monitor", version, about = "Real-time attention scoring engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a session against a simulated subject and print its summary.
    Simulate(SimulateArgs),
    /// Print the default configuration, or write it to a file.
    Config {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the sessions stored for a subject.
    Sessions {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        subject: String,
    },
}

#[derive(clap::Args)]
struct SimulateArgs {
    /// Session length in seconds.
    #[arg(long, default_value_t = 30.0)]
    duration: f64,
    #[arg(long, default_value_t = 15)]
    fps: u32,
    #[arg(long, default_value = "simulated-subject")]
    subject: String,
    /// SQLite file to persist samples into.
    #[arg(long)]
    db: Option<PathBuf>,
    /// JSON configuration file; defaults apply to missing fields.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Run without the noise channel.
    #[arg(long)]
    no_audio: bool,
    #[arg(long, default_value_t = 320)]
    width: u32,
    #[arg(long, default_value_t = 240)]
    height: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Simulate(args) => run_simulation(args).await,
        Command::Config { output } => {
            let config = AnalyzerConfig::default();
            match output {
                Some(path) => config.save(&path),
                None => {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                    Ok(())
                }
            }
        }
        Command::Sessions { db, subject } => {
            let database = Database::new(db)?;
            let sessions = database.list_sessions_for_subject(&subject).await?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
            Ok(())
        }
    }
}

async fn run_simulation(args: SimulateArgs) -> Result<()> {
    if args.fps == 0 {
        return Err(anyhow!("fps must be greater than zero"));
    }
    let config = match &args.config {
        Some(path) => AnalyzerConfig::load(path)?,
        None => AnalyzerConfig::default(),
    };

    let perception = simulate::perception(&SubjectProfile::default(), args.seed);
    let clock = Arc::new(MonotonicClock::new());
    let mut engine = AttentionFusionEngine::new(config, perception, clock);
    if !args.no_audio {
        engine = engine.with_audio(Arc::new(SyntheticMicrophone::new(0.0005, 0.05, args.seed)));
    }
    let database = match &args.db {
        Some(path) => {
            let database = Database::new(path.clone())?;
            let recovered = database.close_incomplete_sessions(Utc::now()).await?;
            if recovered > 0 {
                log::warn!("closed {recovered} session(s) left open by an earlier run");
            }
            engine = engine.with_sink(Arc::new(SqliteSink::new(database.clone())));
            Some(database)
        }
        None => None,
    };
    let engine = Arc::new(engine);

    let context = engine.start(&args.subject)?;
    log::info!(
        "simulating {:.0}s at {} fps (session {})",
        args.duration,
        args.fps,
        context.session_id
    );

    let cancel_token = CancellationToken::new();
    {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("interrupt received, stopping session");
                token.cancel();
            }
        });
    }

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(args.fps)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let deadline = tokio::time::sleep(Duration::from_secs_f64(args.duration.max(0.0)));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = simulate_frame(args.width, args.height);
                engine.process_frame(frame);
            }
            _ = &mut deadline => break,
            _ = cancel_token.cancelled() => break,
        }
    }

    let stopper = Arc::clone(&engine);
    let summary = tokio::task::spawn_blocking(move || stopper.stop())
        .await
        .context("stop task panicked")??;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(database) = database {
        let stored = database.get_samples_for_session(&summary.session_id).await?;
        log::info!(
            "{} samples stored at {}",
            stored.len(),
            database.path().display()
        );
    }
    Ok(())
}

fn simulate_frame(width: u32, height: u32) -> attention_monitor::perception::Frame {
    attention_monitor::perception::Frame::from_pixel(width, height, image::Rgb([24, 24, 24]))
}
