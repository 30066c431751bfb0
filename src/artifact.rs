//! The persisted result of encoding: one image frame or an ordered video.
//!
//! Stored as JSON with named fields:
//!
//! ```json
//! {"media_type": "video", "media": ["<frame 0>", "<frame 1>"]}
//! ```
//!
//! Older artifacts used a positional `[media_type, media]` pair; those are
//! still accepted on load and are always written back in the named form.

use crate::converter::RenderedFrame;
use crate::{BlockcastError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "media_type", content = "media", rename_all = "lowercase")]
pub enum MediaArtifact {
    Image(RenderedFrame),
    Video(Vec<RenderedFrame>),
}

impl MediaArtifact {
    /// Build a video artifact, refusing an empty frame sequence
    pub fn video(frames: Vec<RenderedFrame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(BlockcastError::Encoding(
                "a video artifact needs at least one frame".to_string(),
            ));
        }
        Ok(MediaArtifact::Video(frames))
    }

    /// Discriminant as stored on disk
    pub fn kind(&self) -> &'static str {
        match self {
            MediaArtifact::Image(_) => "image",
            MediaArtifact::Video(_) => "video",
        }
    }

    pub fn frame_count(&self) -> usize {
        match self {
            MediaArtifact::Image(_) => 1,
            MediaArtifact::Video(frames) => frames.len(),
        }
    }

    /// Width and height of the first frame in terminal cells
    pub fn cell_dimensions(&self) -> (usize, usize) {
        let first = match self {
            MediaArtifact::Image(frame) => Some(frame),
            MediaArtifact::Video(frames) => frames.first(),
        };
        first
            .map(|frame| (frame.cell_width(), frame.line_count()))
            .unwrap_or((0, 0))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| BlockcastError::Encoding(format!("failed to serialize artifact: {}", e)))
    }

    /// Parse an artifact in either the named or the legacy positional layout
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(format_error)?;
        let value = match value {
            Value::Array(items) => migrate_positional(items)?,
            other => other,
        };

        let artifact: MediaArtifact = serde_json::from_value(value).map_err(format_error)?;
        if let MediaArtifact::Video(frames) = &artifact {
            if frames.is_empty() {
                return Err(BlockcastError::ArtifactFormat(
                    "video artifact contains no frames".to_string(),
                ));
            }
        }
        Ok(artifact)
    }

    /// Write the artifact to `path`; nothing is written if serialization fails
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)?;
        info!(
            "Wrote {} artifact with {} frame(s) to '{}'",
            self.kind(),
            self.frame_count(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let artifact = Self::from_json(&text)?;
        debug!(
            "Loaded {} artifact with {} frame(s) from '{}'",
            artifact.kind(),
            artifact.frame_count(),
            path.display()
        );
        Ok(artifact)
    }
}

fn migrate_positional(items: Vec<Value>) -> Result<Value> {
    let [kind, media]: [Value; 2] = items.try_into().map_err(|items: Vec<Value>| {
        BlockcastError::ArtifactFormat(format!(
            "positional artifact must have 2 entries, found {}",
            items.len()
        ))
    })?;
    debug!("Migrating positional artifact to named fields");

    let mut record = serde_json::Map::new();
    record.insert("media_type".to_string(), kind);
    record.insert("media".to_string(), media);
    Ok(Value::Object(record))
}

fn format_error(e: serde_json::Error) -> BlockcastError {
    BlockcastError::ArtifactFormat(e.to_string())
}
