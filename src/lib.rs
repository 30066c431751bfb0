//! Blockcast - truecolor half-block images and videos for the terminal
//!
//! Frames are reduced to a grid of tiles and drawn with the upper half block
//! glyph, so every terminal cell shows two vertically stacked pixels. Videos
//! are encoded up front in parallel, stored as an artifact, and played back
//! with wall-clock pacing.

pub mod artifact;
pub mod batch;
pub mod cli;
pub mod converter;
pub mod decoder;
pub mod player;
pub mod terminal;

pub use artifact::MediaArtifact;
pub use batch::BatchEncoder;
pub use cli::{Cli, Command, EncodeArgs, PlayArgs};
pub use converter::{
    average_tile, encode_frame, pixelate, render_grid, ColorPair, PixelColor, PixelGrid,
    RenderedFrame,
};
pub use decoder::{load_image, load_video, RawFrame, VideoDecoder};
pub use player::{
    pace, Cancellation, Clock, MonotonicClock, Pace, PlaybackConfig, PlaybackOutcome, Player,
};
pub use terminal::{CrosstermTerminal, TerminalAdapter, TerminalSession};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Default output width in terminal columns
pub const DEFAULT_COLUMNS: u32 = 80;

/// Default playback frame rate
pub const DEFAULT_FPS: u32 = 30;

/// Error types used throughout the application
#[derive(thiserror::Error, Debug)]
pub enum BlockcastError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Image decoding error: {0}")]
    ImageDecoding(#[from] image::ImageError),

    #[error("Video decoding error: {0}")]
    VideoDecoding(#[from] ffmpeg_next::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Artifact format error: {0}")]
    ArtifactFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, BlockcastError>;

/// Utility functions
pub mod utils {
    /// Format duration in a human-readable way
    pub fn format_duration(seconds: f64) -> String {
        let total_seconds = seconds as u64;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let secs = total_seconds % 60;

        if hours > 0 {
            format!("{}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{}:{:02}", minutes, secs)
        }
    }

    /// Nominal running time of `frames` frames at `fps`
    pub fn playback_duration(frames: usize, fps: f64) -> f64 {
        if fps <= 0.0 {
            0.0
        } else {
            frames as f64 / fps
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        average_tile, encode_frame, load_image, load_video, pace, pixelate, render_grid,
        utils::*,
        BatchEncoder, BlockcastError, Cancellation, Clock, ColorPair, MediaArtifact,
        MonotonicClock, Pace, PixelColor, PixelGrid, PlaybackConfig, PlaybackOutcome, Player,
        RawFrame, RenderedFrame, Result, TerminalAdapter,
    };
}
