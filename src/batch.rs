//! Parallel encoding of video frames.
//!
//! Frames are independent, so each one is encoded on a rayon worker. Results
//! come back in input order; the first failing frame fails the whole batch.

use crate::converter::{encode_frame, RenderedFrame};
use crate::decoder::RawFrame;
use crate::{BlockcastError, Result};
use log::{debug, info};
use rayon::prelude::*;
use std::time::Instant;

/// Frame batch encoder backed by a dedicated worker pool
pub struct BatchEncoder {
    pool: rayon::ThreadPool,
    columns: u32,
}

impl BatchEncoder {
    /// Create an encoder with `jobs` workers, or one per hardware thread
    pub fn new(columns: u32, jobs: Option<usize>) -> Result<Self> {
        let pool = build_thread_pool(jobs)?;
        debug!("Batch encoder using {} worker threads", pool.current_num_threads());
        Ok(Self { pool, columns })
    }

    /// Number of worker threads in the pool
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Encode every frame, preserving order
    pub fn encode(&self, frames: Vec<RawFrame>) -> Result<Vec<RenderedFrame>> {
        let total = frames.len();
        let columns = self.columns;
        info!("Processing {} frames...", total);
        let start = Instant::now();

        // Collecting an indexed parallel iterator keeps input order
        let rendered = self.pool.install(|| {
            frames
                .into_par_iter()
                .enumerate()
                .map(|(index, frame)| {
                    encode_frame(frame, columns).map_err(|e| {
                        BlockcastError::Encoding(format!("frame {}: {}", index, e))
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        info!(
            "Finished processing {} frames in {:.2} seconds",
            rendered.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(rendered)
    }
}

fn build_thread_pool(jobs: Option<usize>) -> Result<rayon::ThreadPool> {
    if jobs == Some(0) {
        return Err(BlockcastError::InvalidConfig(
            "worker count must be >= 1 when set".to_string(),
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = jobs {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| BlockcastError::Encoding(format!("failed to build worker pool: {}", e)))
}
