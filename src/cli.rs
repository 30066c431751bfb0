use crate::batch::BatchEncoder;
use crate::player::PlaybackConfig;
use crate::{Result, DEFAULT_COLUMNS, DEFAULT_FPS};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode an image or video into a playable artifact
    Encode(EncodeArgs),
    /// Display an encoded artifact in the terminal
    Play(PlayArgs),
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Image or video file to encode
    pub input: PathBuf,

    /// Where to write the artifact
    pub output: PathBuf,

    /// Output width in terminal columns
    #[arg(short = 'c', long = "width", default_value_t = DEFAULT_COLUMNS)]
    pub columns: u32,

    /// Treat the input as a video and encode every frame
    #[arg(short, long)]
    pub video: bool,

    /// Number of encoding threads (defaults to one per CPU)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Artifact produced by `encode`
    pub artifact: PathBuf,

    /// Playback frame rate
    #[arg(short, long, default_value_t = DEFAULT_FPS)]
    pub fps: u32,

    /// Repeat the video until interrupted
    #[arg(short, long = "loop")]
    pub loop_playback: bool,

    /// Show artifact information only (don't play)
    #[arg(long)]
    pub info: bool,
}

impl EncodeArgs {
    /// Validate command line arguments
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.input.exists() {
            return Err(format!("Input file does not exist: {}", self.input.display()));
        }

        if self.columns == 0 {
            return Err("Width must be greater than 0".to_string());
        }

        if self.jobs == Some(0) {
            return Err("Job count must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Worker pool for video encoding
    pub fn batch_encoder(&self) -> Result<BatchEncoder> {
        BatchEncoder::new(self.columns, self.jobs)
    }
}

impl PlayArgs {
    /// Validate command line arguments
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.artifact.exists() {
            return Err(format!(
                "Artifact file does not exist: {}",
                self.artifact.display()
            ));
        }

        if self.fps == 0 {
            return Err("FPS must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            fps: f64::from(self.fps),
            loop_playback: self.loop_playback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_encode_defaults() {
        let cli = parse(&["blockcast", "encode", "in.png", "out.json"]);
        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.input, PathBuf::from("in.png"));
                assert_eq!(args.output, PathBuf::from("out.json"));
                assert_eq!(args.columns, 80);
                assert!(!args.video);
                assert_eq!(args.jobs, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_encode_short_flags() {
        let cli = parse(&["blockcast", "encode", "in.mp4", "out.json", "-c", "120", "-v"]);
        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.columns, 120);
                assert!(args.video);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_play_flags() {
        let cli = parse(&["blockcast", "play", "clip.json", "--fps", "24", "-l", "--verbose"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Play(args) => {
                assert_eq!(args.fps, 24);
                assert!(args.loop_playback);
                assert!(!args.info);
                assert_eq!(
                    args.playback_config(),
                    PlaybackConfig {
                        fps: 24.0,
                        loop_playback: true
                    }
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_play_defaults() {
        let cli = parse(&["blockcast", "play", "clip.json"]);
        match cli.command {
            Command::Play(args) => {
                assert_eq!(args.fps, 30);
                assert!(!args.loop_playback);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_validation_failures() {
        let args = PlayArgs {
            artifact: PathBuf::from("nonexistent.json"),
            fps: 30,
            loop_playback: false,
            info: false,
        };
        assert!(args.validate().unwrap_err().contains("does not exist"));

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        std::fs::write(&input, b"x").unwrap();
        let args = EncodeArgs {
            input,
            output: dir.path().join("out.json"),
            columns: 0,
            video: false,
            jobs: None,
        };
        assert!(args.validate().unwrap_err().contains("Width"));
    }
}
