use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Settings for the preview video.
pub struct EncoderSettings<'a> {
    pub width: u32,
    pub height: u32,
    pub tick_ms: u32,
    pub codec: &'a str,
    pub pix_fmt: &'a str,
    pub crf: u32,
}

/// Pipes raw RGBA frames into ffmpeg, muxing the source track as audio.
pub struct FfmpegEncoder {
    child: Child,
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, input_audio: &Path, settings: &EncoderSettings) -> Result<Self> {
        // One video frame per display tick
        let framerate = format!("1000/{}", settings.tick_ms.max(1));

        let child = Command::new("ffmpeg")
            .args(["-y", "-loglevel", "error", "-f", "rawvideo", "-pixel_format", "rgba"])
            .args(["-video_size", format!("{}x{}", settings.width, settings.height).as_str()])
            .args(["-framerate", framerate.as_str()])
            .args(["-i", "pipe:0", "-i"])
            .arg(input_audio)
            .args(["-c:v", settings.codec, "-pix_fmt", settings.pix_fmt])
            .args(["-crf", settings.crf.to_string().as_str(), "-preset", "medium"])
            .args(["-c:a", "aac", "-b:a", "192k", "-shortest"])
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            settings.width,
            settings.height,
            framerate,
            settings.codec
        );

        Ok(Self { child })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}
