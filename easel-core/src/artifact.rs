use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use image::DynamicImage;
use tracing::{debug, warn};

use crate::MediaKind;

/// Raw media handed back by a pipeline, before it is written anywhere.
#[derive(Debug, Clone)]
pub enum Artifact {
    Image(DynamicImage),
    Video { frames: Vec<DynamicImage>, fps: usize },
}

impl Artifact {
    pub fn kind(&self) -> MediaKind {
        match self {
            Artifact::Image(_) => MediaKind::Image,
            Artifact::Video { .. } => MediaKind::Video,
        }
    }

    pub fn extension(&self) -> &'static str {
        extension_for(self.kind())
    }

    /// Serializes the artifact to `path` in its container format.
    pub fn export(&self, path: &Path) -> Result<()> {
        match self {
            Artifact::Image(image) => image
                .save(path)
                .with_context(|| format!("failed to save image to {}", path.display())),
            Artifact::Video { frames, fps } => export_video(frames, *fps, path),
        }
    }
}

pub fn extension_for(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "png",
        MediaKind::Video => "mp4",
    }
}

/// Encodes RGB frames as H.264 MP4 by piping them through `ffmpeg`.
fn export_video(frames: &[DynamicImage], fps: usize, path: &Path) -> Result<()> {
    encode_with("ffmpeg", frames, fps, path)
}

/// Pipes `frames` into `program` (an ffmpeg-compatible encoder).
///
/// On failure the reason comes from the encoder's stderr and any partial file
/// at `path` is removed.
fn encode_with(
    program: impl AsRef<OsStr>,
    frames: &[DynamicImage],
    fps: usize,
    path: &Path,
) -> Result<()> {
    let Some(first) = frames.first() else {
        bail!("cannot export a video with no frames");
    };
    let (width, height) = (first.width(), first.height());
    if frames
        .iter()
        .any(|f| f.width() != width || f.height() != height)
    {
        bail!("all video frames must share the same size ({width}x{height})");
    }

    debug!(
        frames = frames.len(),
        fps,
        path = %path.display(),
        "encoding video with ffmpeg"
    );
    let mut ffmpeg = Command::new(program)
        .args(["-y", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgb24"])
        .args(["-s", &format!("{width}x{height}")])
        .args(["-r", &fps.to_string()])
        .args(["-i", "-", "-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .arg(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to start ffmpeg; is it installed and on PATH?")?;

    // A write error usually means ffmpeg already quit; its stderr says why.
    let streamed = stream_frames(&mut ffmpeg, frames);
    let outcome = match ffmpeg.wait_with_output() {
        Ok(output) if !output.status.success() => Err(anyhow!(
            "ffmpeg exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )),
        Ok(_) => streamed.context("failed to stream frames to ffmpeg"),
        Err(e) => Err(anyhow::Error::new(e).context("failed to wait for ffmpeg")),
    };

    if outcome.is_err() && path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), "failed to remove partial video: {e}");
        }
    }
    outcome
}

fn stream_frames(ffmpeg: &mut Child, frames: &[DynamicImage]) -> std::io::Result<()> {
    let mut stdin = ffmpeg
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("ffmpeg stdin is not piped"))?;
    for frame in frames {
        stdin.write_all(frame.to_rgb8().as_raw())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    #[test]
    fn extension_follows_kind() {
        let image = Artifact::Image(DynamicImage::new_rgb8(2, 2));
        assert_eq!(image.extension(), "png");
        let video = Artifact::Video {
            frames: vec![],
            fps: 8,
        };
        assert_eq!(video.extension(), "mp4");
    }

    #[test]
    fn image_export_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fast_20240101_120000.png");
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10])));

        Artifact::Image(image).export(&path).unwrap();

        let reloaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(reloaded.dimensions(), (4, 4));
        assert_eq!(reloaded.get_pixel(0, 0), &image::Rgb([200, 10, 10]));
    }

    #[test]
    fn empty_video_is_rejected_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        let video = Artifact::Video {
            frames: vec![],
            fps: 8,
        };
        assert!(video.export(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn mismatched_frames_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        let video = Artifact::Video {
            frames: vec![DynamicImage::new_rgb8(4, 4), DynamicImage::new_rgb8(8, 4)],
            fps: 8,
        };
        assert!(video.export(&path).is_err());
        assert!(!path.exists());
    }

    #[cfg(unix)]
    fn fake_encoder(dir: &Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-ffmpeg");
        std::fs::write(&script, format!("#!/bin/sh\nfor out; do :; done\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn encoder_failure_reports_stderr_and_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = fake_encoder(
            dir.path(),
            "echo partial > \"$out\"\necho \"Unknown encoder 'libx264'\" >&2\nexit 1",
        );
        let path = dir.path().join("cogvideo-2b_20240101_120000.mp4");
        // Larger than a pipe buffer, so the first write hits a closed pipe.
        let frames = vec![DynamicImage::new_rgb8(256, 256); 4];

        let err = encode_with(&encoder, &frames, 8, &path).unwrap_err();

        let message = format!("{err:#}");
        assert!(message.contains("Unknown encoder 'libx264'"), "{message}");
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn encoder_success_keeps_output() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = fake_encoder(dir.path(), "cat > /dev/null\necho mp4 > \"$out\"");
        let path = dir.path().join("clip.mp4");
        let frames = vec![DynamicImage::new_rgb8(64, 64); 3];

        encode_with(&encoder, &frames, 8, &path).unwrap();

        assert!(path.exists());
    }
}
