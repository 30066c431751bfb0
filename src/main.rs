use anyhow::{Context, Result};
use blockcast::cli::{Cli, Command, EncodeArgs, PlayArgs};
use blockcast::utils::{format_duration, playback_duration};
use blockcast::{
    encode_frame, load_image, load_video, Cancellation, CrosstermTerminal, MediaArtifact,
    MonotonicClock, PlaybackOutcome, Player,
};
use clap::Parser;
use log::{debug, error, info, warn};
use std::io::{stdout, Write};

/// Conventional exit status for a process ended by SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    debug!("Starting {} v{}", blockcast::PACKAGE_NAME, blockcast::VERSION);

    match cli.command {
        Command::Encode(args) => {
            if let Err(e) = args.validate() {
                error!("Invalid arguments: {}", e);
                std::process::exit(1);
            }
            encode(args).await
        }
        Command::Play(args) => {
            if let Err(e) = args.validate() {
                error!("Invalid arguments: {}", e);
                std::process::exit(1);
            }
            play(args).await
        }
    }
}

async fn encode(args: EncodeArgs) -> Result<()> {
    let artifact = if args.video {
        let encoder = args.batch_encoder()?;
        let input = args.input.clone();
        info!(
            "Encoding video '{}' at {} columns on {} workers",
            input.display(),
            args.columns,
            encoder.workers()
        );
        let frames = tokio::task::spawn_blocking(move || -> blockcast::Result<_> {
            let frames = load_video(&input)?;
            encoder.encode(frames)
        })
        .await
        .context("encoding task failed")?
        .with_context(|| format!("failed to encode video '{}'", args.input.display()))?;
        MediaArtifact::video(frames)?
    } else {
        let frame = load_image(&args.input)
            .with_context(|| format!("failed to read image '{}'", args.input.display()))?;
        let rendered = encode_frame(frame, args.columns)
            .with_context(|| format!("failed to encode image '{}'", args.input.display()))?;
        MediaArtifact::Image(rendered)
    };

    artifact
        .save(&args.output)
        .with_context(|| format!("failed to write artifact '{}'", args.output.display()))?;
    Ok(())
}

async fn play(args: PlayArgs) -> Result<()> {
    let artifact = MediaArtifact::load(&args.artifact)
        .with_context(|| format!("failed to load artifact '{}'", args.artifact.display()))?;
    let config = args.playback_config();

    if args.info {
        let (width, height) = artifact.cell_dimensions();
        println!("Artifact Information:");
        println!("  File: {}", args.artifact.display());
        println!("  Media Type: {}", artifact.kind());
        println!("  Frames: {}", artifact.frame_count());
        println!("  Dimensions: {}x{} cells", width, height);
        if let MediaArtifact::Video(frames) = &artifact {
            let seconds = playback_duration(frames.len(), config.fps);
            println!("  Duration: {} at {} FPS", format_duration(seconds), config.fps);
        }
        return Ok(());
    }

    match artifact {
        MediaArtifact::Image(frame) => {
            let mut out = stdout();
            out.write_all(frame.as_str().as_bytes())?;
            out.flush()?;
            Ok(())
        }
        MediaArtifact::Video(frames) => {
            if !atty::is(atty::Stream::Stdout) {
                warn!("Standard output is not a terminal; cursor positioning may not work");
            }

            let cancel = Cancellation::new();
            let listener = cancel.listen_for_ctrl_c();
            let mut player = Player::new(
                CrosstermTerminal::new(),
                MonotonicClock::new(),
                cancel,
                config,
            );

            let outcome = player.play(&frames).await?;
            listener.abort();
            match outcome {
                PlaybackOutcome::Completed {
                    frames_drawn,
                    frames_skipped,
                } => {
                    debug!(
                        "Playback finished: {} frames drawn, {} skipped",
                        frames_drawn, frames_skipped
                    );
                    Ok(())
                }
                PlaybackOutcome::Interrupted { .. } => std::process::exit(INTERRUPTED_EXIT_CODE),
            }
        }
    }
}
