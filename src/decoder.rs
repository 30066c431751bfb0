use crate::{BlockcastError, Result};
use ffmpeg_next as ffmpeg;
use log::{debug, info};
use std::path::Path;

/// A decoded frame as tightly packed RGB24, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Raw RGB data, `width * height * 3` bytes
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl RawFrame {
    /// Wrap an RGB24 buffer, checking that its length matches the dimensions
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let frame = Self { data, width, height };
        frame.check_layout()?;
        Ok(frame)
    }

    /// Build a frame where every pixel has the same color
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb.repeat((width * height) as usize);
        Self { data, width, height }
    }

    /// Verify that the buffer holds exactly `width * height` RGB pixels
    pub fn check_layout(&self) -> Result<()> {
        let expected = self.width as usize * self.height as usize * 3;
        if self.data.len() != expected {
            return Err(BlockcastError::Encoding(format!(
                "malformed frame buffer: {}x{} needs {} bytes, got {}",
                self.width,
                self.height,
                expected,
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// Decode a still image from disk into an RGB frame
pub fn load_image(path: &Path) -> Result<RawFrame> {
    debug!("Attempting to open image file: {}", path.display());
    let image = image::open(path)?.to_rgb8();
    let (width, height) = image.dimensions();
    info!("Loaded image '{}' ({}x{})", path.display(), width, height);
    RawFrame::new(image.into_raw(), width, height)
}

/// Video decoder that extracts every frame of the best video stream
pub struct VideoDecoder {
    input_context: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: Option<ffmpeg::software::scaling::Context>,
    fps: f64,
    duration: f64,
}

impl VideoDecoder {
    /// Create a new VideoDecoder from a file path
    pub fn new(path: &Path) -> Result<Self> {
        if let Err(e) = ffmpeg::init() {
            debug!("FFmpeg init error: {:?}", e);
        }

        debug!("Attempting to open video file: {}", path.display());
        let input_context = ffmpeg::format::input(&path).map_err(|e| {
            BlockcastError::Input(format!(
                "failed to open video file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let stream = input_context
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| {
                BlockcastError::Input(format!("no video stream found in file '{}'", path.display()))
            })?;
        let stream_index = stream.index();
        info!("Found video stream {} in file '{}'", stream_index, path.display());

        let context_decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = context_decoder.decoder().video()?;

        let rate = stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let duration = if stream.duration() != ffmpeg::ffi::AV_NOPTS_VALUE {
            stream.duration() as f64 * f64::from(stream.time_base())
        } else {
            0.0
        };

        Ok(Self {
            input_context,
            stream_index,
            decoder,
            scaler: None,
            fps,
            duration,
        })
    }

    /// Source frame rate as reported by the container, 0 if unknown
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Source duration in seconds, 0 if unknown
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Get video dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.decoder.width(), self.decoder.height())
    }

    /// Decode every frame of the stream, in presentation order
    pub fn decode_all(mut self) -> Result<Vec<RawFrame>> {
        let mut frames = Vec::new();
        let mut decoded = ffmpeg::frame::Video::empty();

        let stream_index = self.stream_index;
        let packets: Vec<ffmpeg::Packet> = self
            .input_context
            .packets()
            .filter(|(stream, _)| stream.index() == stream_index)
            .map(|(_, packet)| packet)
            .collect();

        for packet in packets {
            self.decoder.send_packet(&packet)?;
            self.drain_frames(&mut decoded, &mut frames)?;
        }

        self.decoder.send_eof()?;
        self.drain_frames(&mut decoded, &mut frames)?;

        if frames.is_empty() {
            return Err(BlockcastError::Input(
                "video contains no decodable frames".to_string(),
            ));
        }

        info!("Decoded {} frames", frames.len());
        Ok(frames)
    }

    /// Receive every frame the decoder has ready
    fn drain_frames(
        &mut self,
        decoded: &mut ffmpeg::frame::Video,
        frames: &mut Vec<RawFrame>,
    ) -> Result<()> {
        loop {
            match classify_receive(self.decoder.receive_frame(decoded))? {
                Received::Frame => frames.push(self.convert_frame(decoded)?),
                Received::NeedsInput | Received::Finished => return Ok(()),
            }
        }
    }

    /// Convert an FFmpeg frame to packed RGB24
    fn convert_frame(&mut self, frame: &ffmpeg::frame::Video) -> Result<RawFrame> {
        let width = frame.width();
        let height = frame.height();

        if self.scaler.is_none() {
            self.scaler = Some(ffmpeg::software::scaling::Context::get(
                frame.format(),
                width,
                height,
                ffmpeg::format::Pixel::RGB24,
                width,
                height,
                ffmpeg::software::scaling::Flags::BILINEAR,
            )?);
        }

        let mut rgb_frame = ffmpeg::frame::Video::empty();
        if let Some(ref mut scaler) = self.scaler {
            scaler.run(frame, &mut rgb_frame)?;
        }

        // ffmpeg pads each line to `stride` bytes
        let stride = rgb_frame.stride(0);
        let row_bytes = width as usize * 3;
        let plane = rgb_frame.data(0);
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in plane.chunks(stride).take(height as usize) {
            data.extend_from_slice(&row[..row_bytes]);
        }

        RawFrame::new(data, width, height)
    }
}

/// Result of asking the decoder for its next frame
#[derive(Debug, PartialEq, Eq)]
enum Received {
    Frame,
    /// The decoder needs another packet
    NeedsInput,
    /// The decoder has been flushed
    Finished,
}

fn classify_receive(result: std::result::Result<(), ffmpeg::Error>) -> Result<Received> {
    match result {
        Ok(()) => Ok(Received::Frame),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::ffi::EAGAIN => {
            Ok(Received::NeedsInput)
        }
        Err(ffmpeg::Error::Eof) => Ok(Received::Finished),
        Err(e) => Err(BlockcastError::VideoDecoding(e)),
    }
}

/// Decode every frame of the video at `path`
pub fn load_video(path: &Path) -> Result<Vec<RawFrame>> {
    let decoder = VideoDecoder::new(path)?;
    let (width, height) = decoder.dimensions();
    info!(
        "Video info: {}x{}, {:.2}s duration",
        width,
        height,
        decoder.duration()
    );
    if decoder.fps() > 0.0 {
        info!(
            "Source frame rate is {:.2} FPS (pass it to `play --fps` for real-time playback)",
            decoder.fps()
        );
    }
    decoder.decode_all()
}
