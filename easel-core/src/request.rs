use std::path::PathBuf;
use std::time::Duration;

use candle_core::{DType, Device};

use crate::{GenerationError, MediaKind};

/// Numeric precision asked of the engine.
///
/// Half precisions are only honoured on an accelerator; on the CPU they are
/// resolved to `F32`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Precision {
    F16,
    Bf16,
    #[default]
    F32,
}

impl Precision {
    pub fn dtype_for(self, device: &Device) -> DType {
        match (self, device) {
            (_, Device::Cpu) => DType::F32,
            (Precision::F16, _) => DType::F16,
            (Precision::Bf16, _) => device.bf16_default_to_f32(),
            (Precision::F32, _) => DType::F32,
        }
    }
}

/// Spatial or temporal size of the requested artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaSpec {
    Image { width: usize, height: usize },
    Video { frames: usize, fps: usize },
}

impl MediaSpec {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaSpec::Image { .. } => MediaKind::Image,
            MediaSpec::Video { .. } => MediaKind::Video,
        }
    }

    pub fn image_size(&self) -> Option<(usize, usize)> {
        match *self {
            MediaSpec::Image { width, height } => Some((width, height)),
            MediaSpec::Video { .. } => None,
        }
    }

    /// Playback length in seconds, for videos.
    pub fn duration_secs(&self) -> Option<f64> {
        match *self {
            MediaSpec::Video { frames, fps } => Some(frames as f64 / fps as f64),
            MediaSpec::Image { .. } => None,
        }
    }
}

/// Everything one generation run needs, fixed before the engine is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model_id: String,
    pub model_name: String,
    pub steps: usize,
    pub guidance: Option<f64>,
    pub media: MediaSpec,
    pub precision: Precision,
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
}

impl GenerationRequest {
    /// Checks the invariants the runner relies on.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        if self.model_id.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "model identifier is empty".to_string(),
            ));
        }
        if self.steps == 0 {
            return Err(GenerationError::InvalidRequest(
                "step count must be positive".to_string(),
            ));
        }
        if let Some(guidance) = self.guidance {
            if !guidance.is_finite() || guidance < 0.0 {
                return Err(GenerationError::InvalidRequest(format!(
                    "guidance scale must be a non-negative number, got {guidance}"
                )));
            }
        }
        let sizes = match self.media {
            MediaSpec::Image { width, height } => [("width", width), ("height", height)],
            MediaSpec::Video { frames, fps } => [("frame count", frames), ("fps", fps)],
        };
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(GenerationError::InvalidRequest(format!(
                "{name} must be positive"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub load_duration: Duration,
    pub generation_duration: Duration,
    pub output_path: PathBuf,
}

impl GenerationResult {
    pub fn total_duration(&self) -> Duration {
        self.load_duration + self.generation_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_request() -> GenerationRequest {
        GenerationRequest {
            prompt: "a lighthouse at dusk".to_string(),
            model_id: "stabilityai/sdxl-turbo".to_string(),
            model_name: "SDXL-Turbo".to_string(),
            steps: 4,
            guidance: Some(0.0),
            media: MediaSpec::Image {
                width: 512,
                height: 512,
            },
            precision: Precision::F16,
            seed: None,
            output_dir: PathBuf::from("images"),
        }
    }

    #[test]
    fn accepts_a_complete_request() {
        assert!(image_request().validate().is_ok());
    }

    #[test]
    fn rejects_blank_prompt() {
        let request = GenerationRequest {
            prompt: " \t ".to_string(),
            ..image_request()
        };
        assert!(matches!(
            request.validate(),
            Err(GenerationError::EmptyPrompt)
        ));
    }

    #[test]
    fn rejects_zero_sizes_and_steps() {
        let zero_steps = GenerationRequest {
            steps: 0,
            ..image_request()
        };
        assert!(matches!(
            zero_steps.validate(),
            Err(GenerationError::InvalidRequest(_))
        ));

        let zero_frames = GenerationRequest {
            media: MediaSpec::Video { frames: 0, fps: 8 },
            ..image_request()
        };
        assert!(matches!(
            zero_frames.validate(),
            Err(GenerationError::InvalidRequest(msg)) if msg.contains("frame count")
        ));
    }

    #[test]
    fn rejects_negative_guidance() {
        let request = GenerationRequest {
            guidance: Some(-1.0),
            ..image_request()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn half_precision_falls_back_to_f32_on_cpu() {
        assert_eq!(Precision::F16.dtype_for(&Device::Cpu), DType::F32);
        assert_eq!(Precision::Bf16.dtype_for(&Device::Cpu), DType::F32);
    }

    #[test]
    fn video_duration_uses_fps() {
        let media = MediaSpec::Video { frames: 24, fps: 8 };
        assert_eq!(media.duration_secs(), Some(3.0));
        assert_eq!(media.kind(), MediaKind::Video);
    }
}
