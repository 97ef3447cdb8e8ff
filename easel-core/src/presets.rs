//! The question sequences behind `easel image` and `easel video`.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::{
    ChoiceMenu, Configurator, GenerationError, GenerationRequest, MediaSpec, Precision,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePreset {
    pub label: &'static str,
    pub model_id: &'static str,
    pub model_name: &'static str,
    pub guidance: f64,
    pub steps: &'static [usize],
    pub precision: Precision,
}

pub const IMAGE_PRESETS: &[ImagePreset] = &[
    ImagePreset {
        label: "Fast - SDXL-Turbo (~2 sec, experimental quality)",
        model_id: "stabilityai/sdxl-turbo",
        model_name: "SDXL-Turbo",
        guidance: 0.0,
        steps: &[4, 8],
        precision: Precision::F16,
    },
    ImagePreset {
        label: "Slow - SDXL Base (better quality, ~30 sec)",
        model_id: "stabilityai/stable-diffusion-xl-base-1.0",
        model_name: "SDXL Base",
        guidance: 7.5,
        steps: &[20, 35, 50],
        precision: Precision::F16,
    },
    ImagePreset {
        label: "Flux Schnell - FLUX.1 [schnell] (4 steps, large download)",
        model_id: "black-forest-labs/FLUX.1-schnell",
        model_name: "FLUX.1-schnell",
        guidance: 0.0,
        steps: &[4],
        precision: Precision::Bf16,
    },
    ImagePreset {
        label: "Flux Dev - FLUX.1 [dev] (gated model, best quality)",
        model_id: "black-forest-labs/FLUX.1-dev",
        model_name: "FLUX.1-dev",
        guidance: 3.5,
        steps: &[28, 50],
        precision: Precision::Bf16,
    },
];

pub const IMAGE_SIZES: &[(usize, usize)] = &[(512, 512), (1024, 1024)];

pub const VIDEO_FPS: usize = 8;
pub const VIDEO_GUIDANCE: f64 = 6.0;
pub const VIDEO_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoModel {
    pub label: &'static str,
    pub model_id: &'static str,
    pub model_name: &'static str,
}

pub const VIDEO_MODELS: &[VideoModel] = &[
    VideoModel {
        label: "CogVideoX-2B - Fast (~8GB download, faster generation)",
        model_id: "THUDM/CogVideoX-2b",
        model_name: "CogVideoX-2B",
    },
    VideoModel {
        label: "CogVideoX-5B - High Quality (~20GB download, better results)",
        model_id: "THUDM/CogVideoX-5b",
        model_name: "CogVideoX-5B",
    },
];

pub const VIDEO_QUALITY: &[(&str, usize)] = &[
    ("Fast - 30 steps", 30),
    ("Medium - 50 steps", 50),
    ("High - 80 steps", 80),
];

pub const VIDEO_LENGTHS: &[(&str, usize)] = &[
    ("Short - 3 seconds (24 frames)", 24),
    ("Long - 6 seconds (49 frames)", 49),
];

/// Walks the operator through mode, steps, size and prompt.
pub fn configure_image<R: BufRead, W: Write>(
    cfg: &mut Configurator<R, W>,
    output_dir: PathBuf,
) -> Result<GenerationRequest, GenerationError> {
    let modes = ChoiceMenu::new(IMAGE_PRESETS.iter().map(|p| (p.label, *p)), 0)?;
    let preset = cfg.ask("Select generation mode:", &modes)?;

    let steps_menu = ChoiceMenu::new(preset.steps.iter().map(|s| (s.to_string(), *s)), 0)?;
    let steps = cfg.ask("Select number of inference steps:", &steps_menu)?;

    let sizes = ChoiceMenu::new(
        IMAGE_SIZES
            .iter()
            .map(|&(w, h)| (format!("{w}x{h}"), (w, h))),
        0,
    )?;
    let (width, height) = cfg.ask("Select image size:", &sizes)?;

    let prompt = cfg.prompt_text("Enter your image description (prompt):", None)?;

    Ok(GenerationRequest {
        prompt,
        model_id: preset.model_id.to_string(),
        model_name: preset.model_name.to_string(),
        steps,
        guidance: Some(preset.guidance),
        media: MediaSpec::Image { width, height },
        precision: preset.precision,
        seed: None,
        output_dir,
    })
}

/// Walks the operator through model, quality, length and prompt.
pub fn configure_video<R: BufRead, W: Write>(
    cfg: &mut Configurator<R, W>,
    output_dir: PathBuf,
) -> Result<GenerationRequest, GenerationError> {
    let models = ChoiceMenu::new(VIDEO_MODELS.iter().map(|m| (m.label, *m)), 0)?;
    let model = cfg.ask("Select model:", &models)?;

    let quality = ChoiceMenu::new(VIDEO_QUALITY.iter().copied(), 1)?;
    let steps = cfg.ask("Select quality (inference steps):", &quality)?;

    let lengths = ChoiceMenu::new(VIDEO_LENGTHS.iter().copied(), 0)?;
    let frames = cfg.ask("Select video length:", &lengths)?;

    let prompt = cfg.prompt_text(
        "Enter your video description (prompt):",
        Some("A cat walks on the grass, realistic style"),
    )?;

    Ok(GenerationRequest {
        prompt,
        model_id: model.model_id.to_string(),
        model_name: model.model_name.to_string(),
        steps,
        guidance: Some(VIDEO_GUIDANCE),
        media: MediaSpec::Video {
            frames,
            fps: VIDEO_FPS,
        },
        precision: Precision::F16,
        seed: Some(VIDEO_SEED),
        output_dir,
    })
}
