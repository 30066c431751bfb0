use assert_cmd::Command;
use blockcast::prelude::*;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Helper function to create a two-color PNG: red top half, blue bottom half
fn create_test_image(dir: &TempDir, width: u32, height: u32) -> PathBuf {
    let path = dir.path().join("test_image.png");
    let image = image::RgbImage::from_fn(width, height, |_, y| {
        if y < height / 2 {
            image::Rgb([255, 0, 0])
        } else {
            image::Rgb([0, 0, 255])
        }
    });
    image.save(&path).unwrap();
    path
}

fn blockcast_cmd() -> Command {
    Command::cargo_bin("blockcast").unwrap()
}

fn encode_image(input: &Path, output: &Path, width: &str) -> assert_cmd::assert::Assert {
    blockcast_cmd()
        .arg("encode")
        .arg(input)
        .arg(output)
        .arg("--width")
        .arg(width)
        .assert()
}

#[test]
fn test_cli_help() {
    blockcast_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("encode"))
        .stdout(predicate::str::contains("play"));
}

#[test]
fn test_cli_version() {
    blockcast_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_encode_missing_input() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.json");

    blockcast_cmd()
        .args(["encode", "nonexistent.png"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    assert!(!output.exists());
}

#[test]
fn test_encode_undecodable_input_writes_nothing() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.png");
    std::fs::write(&input, b"definitely not an image").unwrap();
    let output = dir.path().join("out.json");

    encode_image(&input, &output, "4").failure();
    assert!(!output.exists());
}

#[test]
fn test_encode_too_many_columns_fails() {
    let dir = tempdir().unwrap();
    let input = create_test_image(&dir, 8, 8);
    let output = dir.path().join("out.json");

    encode_image(&input, &output, "9").failure();
    assert!(!output.exists());
}

#[test]
fn test_encode_image_artifact() {
    let dir = tempdir().unwrap();
    let input = create_test_image(&dir, 8, 8);
    let output = dir.path().join("out.json");

    encode_image(&input, &output, "4").success();

    let artifact = MediaArtifact::load(&output).unwrap();
    let MediaArtifact::Image(frame) = artifact else {
        panic!("expected an image artifact");
    };
    // tile 2: two rows of cells, the top row all red over red
    assert_eq!(frame.line_count(), 2);
    assert_eq!(frame.cell_width(), 4);
    assert!(frame
        .as_str()
        .starts_with("\x1b[48;2;255;0;0m\x1b[38;2;255;0;0m▀\x1b[0m"));
}

#[test]
fn test_play_image_prints_frame() {
    let dir = tempdir().unwrap();
    let input = create_test_image(&dir, 8, 8);
    let output = dir.path().join("out.json");
    encode_image(&input, &output, "4").success();

    let expected = match MediaArtifact::load(&output).unwrap() {
        MediaArtifact::Image(frame) => frame.into_string(),
        MediaArtifact::Video(_) => panic!("expected an image artifact"),
    };

    let result = blockcast_cmd().arg("play").arg(&output).assert().success();
    let stdout = String::from_utf8_lossy(&result.get_output().stdout);
    assert_eq!(stdout, expected);
}

#[test]
fn test_play_info() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clip.json");
    let frames = vec![RenderedFrame::new("▀▀\n"); 60];
    MediaArtifact::video(frames).unwrap().save(&path).unwrap();

    blockcast_cmd()
        .arg("play")
        .arg(&path)
        .args(["--info", "--fps", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Media Type: video"))
        .stdout(predicate::str::contains("Frames: 60"))
        .stdout(predicate::str::contains("Dimensions: 2x1 cells"))
        .stdout(predicate::str::contains("Duration: 0:02"));
}

#[test]
fn test_play_missing_artifact() {
    blockcast_cmd()
        .args(["play", "nonexistent.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_play_unknown_media_type() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"media_type": "audio", "media": "x"}"#).unwrap();

    blockcast_cmd()
        .arg("play")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Artifact format error"));
}

#[test]
fn test_play_zero_fps_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clip.json");
    MediaArtifact::Image(RenderedFrame::new("x\n"))
        .save(&path)
        .unwrap();

    blockcast_cmd()
        .arg("play")
        .arg(&path)
        .args(["--fps", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FPS must be greater than 0"));
}

mod encoder_tests {
    use super::*;

    #[test]
    fn test_pixelation_shape() {
        // 30x22 at 7 columns: tile 4, 7 columns, ceil(22 / 8) rows
        let frame = RawFrame::filled(30, 22, [40, 80, 120]);
        let grid = pixelate(&frame, 7).unwrap();
        assert_eq!(grid.len(), 3);
        assert!(grid.iter().all(|row| row.len() == 7));
        assert!(grid[2].iter().all(|pair| pair.bottom == PixelColor::BLACK));
        assert!(grid[2].iter().all(|pair| pair.top == PixelColor::new(40, 80, 120)));
    }

    #[test]
    fn test_batch_order_matches_single_frames() {
        let frames: Vec<RawFrame> = (0..40u8)
            .map(|i| RawFrame::filled(16, 9, [i, i.wrapping_mul(3), 255 - i]))
            .collect();
        let expected: Vec<RenderedFrame> = frames
            .iter()
            .cloned()
            .map(|frame| encode_frame(frame, 8).unwrap())
            .collect();

        let rendered = BatchEncoder::new(8, Some(4))
            .unwrap()
            .encode(frames)
            .unwrap();
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_artifact_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.json");
        let frames: Vec<RenderedFrame> = (0..3u8)
            .map(|i| encode_frame(RawFrame::filled(4, 4, [i, i, i]), 2).unwrap())
            .collect();
        let artifact = MediaArtifact::video(frames).unwrap();

        artifact.save(&path).unwrap();
        assert_eq!(MediaArtifact::load(&path).unwrap(), artifact);
    }
}

#[cfg(feature = "ffmpeg-test")]
mod ffmpeg_integration_tests {
    use super::*;

    /// Helper function to create a test video file with the ffmpeg binary
    fn create_test_video(dir: &TempDir) -> Option<PathBuf> {
        let video_path = dir.path().join("test_video.mp4");
        let output = std::process::Command::new("ffmpeg")
            .args([
                "-f",
                "lavfi",
                "-i",
                "testsrc=duration=1:size=160x120:rate=10",
                "-pix_fmt",
                "yuv420p",
                "-y",
            ])
            .arg(&video_path)
            .output();

        match output {
            Ok(result) if result.status.success() => Some(video_path),
            _ => None,
        }
    }

    #[test]
    fn test_video_decoding() {
        let dir = tempdir().unwrap();
        let Some(video_path) = create_test_video(&dir) else {
            eprintln!("FFmpeg test skipped: ffmpeg binary unavailable");
            return;
        };

        let frames = load_video(&video_path).unwrap();
        assert!(!frames.is_empty());
        for frame in &frames {
            assert_eq!((frame.width, frame.height), (160, 120));
            assert_eq!(frame.data.len(), 160 * 120 * 3);
        }
    }

    #[test]
    fn test_encode_video_artifact() {
        let dir = tempdir().unwrap();
        let Some(video_path) = create_test_video(&dir) else {
            eprintln!("FFmpeg test skipped: ffmpeg binary unavailable");
            return;
        };
        let output = dir.path().join("clip.json");

        blockcast_cmd()
            .arg("encode")
            .arg(&video_path)
            .arg(&output)
            .args(["-c", "40", "--video"])
            .assert()
            .success();

        let artifact = MediaArtifact::load(&output).unwrap();
        assert_eq!(artifact.kind(), "video");
        assert!(artifact.frame_count() >= 1);
        // 160 / 40 = tile 4, 120 / 8 = 15 rows
        assert_eq!(artifact.cell_dimensions(), (40, 15));
    }
}
