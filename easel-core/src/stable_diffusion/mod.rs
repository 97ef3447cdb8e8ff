//! Stable Diffusion XL (base and turbo) on candle.

use anyhow::{Context, Error, Result};
use candle_core::{DType, Device, IndexOp, Module, Tensor, D};
use candle_transformers::models::stable_diffusion::{
    self, clip::ClipTextTransformer, schedulers::Scheduler, unet_2d::UNet2DConditionModel,
    vae::AutoEncoderKL, StableDiffusionConfig,
};
use hf_hub::api::tokio::Api;
use tokenizers::Tokenizer;
use tracing::debug;

use crate::{
    select_best_device, tensor_to_image, Artifact, DeviceMap, GenerationRequest, Loader,
    ModelLike, Precision,
};

const MAX_TOKENS: usize = 77;
const VAE_SCALE: f64 = 0.13025;
const LATENT_CHANNELS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdxlVariant {
    Turbo,
    Base,
}

impl SdxlVariant {
    fn repo(self) -> &'static str {
        match self {
            SdxlVariant::Turbo => "stabilityai/sdxl-turbo",
            SdxlVariant::Base => "stabilityai/stable-diffusion-xl-base-1.0",
        }
    }

    fn config(self, height: usize, width: usize) -> StableDiffusionConfig {
        match self {
            SdxlVariant::Turbo => {
                StableDiffusionConfig::sdxl_turbo(None, Some(height), Some(width))
            }
            SdxlVariant::Base => StableDiffusionConfig::sdxl(None, Some(height), Some(width)),
        }
    }
}

/// One CLIP text encoder with the tokenizer and pad token it expects.
struct TextEncoder {
    tokenizer: Tokenizer,
    model: ClipTextTransformer,
    pad_id: u32,
}

impl TextEncoder {
    fn encode(&self, prompt: &str, device: &Device) -> Result<Tensor> {
        let mut tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(Error::msg)?
            .get_ids()
            .to_vec();
        tokens.truncate(MAX_TOKENS);
        tokens.resize(MAX_TOKENS, self.pad_id);
        let tokens = Tensor::new(tokens.as_slice(), device)?.unsqueeze(0)?;
        Ok(self.model.forward(&tokens)?)
    }
}

pub struct SdxlModel {
    variant: SdxlVariant,
    device: Device,
    dtype: DType,
    encoders: [TextEncoder; 2],
    unet: UNet2DConditionModel,
    vae: AutoEncoderKL,
}

impl SdxlModel {
    /// Text embeddings of both encoders concatenated on the feature axis,
    /// preceded by the unconditional batch when guidance is active.
    fn text_embeddings(&self, prompt: &str, guided: bool) -> Result<Tensor> {
        let per_encoder = self
            .encoders
            .iter()
            .map(|encoder| {
                let cond = encoder.encode(prompt, &self.device)?;
                if guided {
                    let uncond = encoder.encode("", &self.device)?;
                    Ok(Tensor::cat(&[uncond, cond], 0)?)
                } else {
                    Ok(cond)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::cat(&per_encoder, D::Minus1)?.to_dtype(self.dtype)?)
    }
}

impl ModelLike for SdxlModel {
    fn run(&mut self, request: &GenerationRequest) -> Result<Artifact> {
        let (width, height) = request
            .media
            .image_size()
            .context("SDXL pipelines only produce images")?;
        if width % 8 != 0 || height % 8 != 0 {
            anyhow::bail!("SDXL needs width and height divisible by 8, got {width}x{height}");
        }
        let guidance = request.guidance.unwrap_or(0.0);
        let guided = guidance > 1.0;

        if let Some(seed) = request.seed {
            self.device.set_seed(seed)?;
        }

        let sd_config = self.variant.config(height, width);
        let mut scheduler = sd_config.build_scheduler(request.steps)?;
        let text_embeddings = self.text_embeddings(&request.prompt, guided)?;

        let latents = Tensor::randn(
            0f32,
            1f32,
            (1, LATENT_CHANNELS, height / 8, width / 8),
            &self.device,
        )?;
        let mut latents = (latents * scheduler.init_noise_sigma())?.to_dtype(self.dtype)?;

        let timesteps = scheduler.timesteps().to_vec();
        for (index, &timestep) in timesteps.iter().enumerate() {
            let latent_model_input = if guided {
                Tensor::cat(&[&latents, &latents], 0)?
            } else {
                latents.clone()
            };
            let latent_model_input = scheduler.scale_model_input(latent_model_input, timestep)?;
            let noise_pred =
                self.unet
                    .forward(&latent_model_input, timestep as f64, &text_embeddings)?;

            let noise_pred = if guided {
                let chunks = noise_pred.chunk(2, 0)?;
                let (uncond, text) = (&chunks[0], &chunks[1]);
                (uncond + ((text - uncond)? * guidance)?)?
            } else {
                noise_pred
            };

            latents = scheduler.step(&noise_pred, timestep, &latents)?;
            debug!(step = index + 1, of = timesteps.len(), "denoising");
        }

        let images = self.vae.decode(&(latents / VAE_SCALE)?)?;
        let images = ((images.to_dtype(DType::F32)? / 2.)? + 0.5)?.to_device(&Device::Cpu)?;
        let images = (images.clamp(0f32, 1.)? * 255.)?.to_dtype(DType::U8)?;

        Ok(Artifact::Image(tensor_to_image(&images.i(0)?)?))
    }
}

pub struct SdxlLoader;

async fn fetch_tokenizer(api: &Api, repo: &str) -> Result<Tokenizer> {
    let file = api
        .model(repo.to_string())
        .get("tokenizer.json")
        .await
        .with_context(|| format!("failed to get tokenizer from {repo}"))?;
    Tokenizer::from_file(file)
        .map_err(Error::msg)
        .with_context(|| format!("failed to load tokenizer from {repo}"))
}

impl Loader for SdxlLoader {
    type Variant = SdxlVariant;
    type Model = SdxlModel;

    async fn load(
        variant: SdxlVariant,
        api: Api,
        device_map: DeviceMap,
        precision: Precision,
    ) -> Result<Self::Model> {
        let device = select_best_device(device_map).context("failed to set up device")?;
        let dtype = precision.dtype_for(&device);
        let half = dtype == DType::F16;
        let sd_config = variant.config(1024, 1024);
        let repo = api.repo(hf_hub::Repo::model(variant.repo().to_string()));

        // --- Text encoders, always in F32 ---
        let clip2_config = sd_config
            .clip2
            .as_ref()
            .context("SDXL configuration is missing its second text encoder")?;
        let mut encoders = Vec::with_capacity(2);
        for (weights, config, tokenizer_repo, pad) in [
            (
                "text_encoder/model.safetensors",
                &sd_config.clip,
                "openai/clip-vit-large-patch14",
                "<|endoftext|>",
            ),
            (
                "text_encoder_2/model.safetensors",
                clip2_config,
                "laion/CLIP-ViT-bigG-14-laion2B-39B-b160k",
                "!",
            ),
        ] {
            let file = repo
                .get(weights)
                .await
                .with_context(|| format!("failed to get {weights}"))?;
            let model =
                stable_diffusion::build_clip_transformer(config, file, &device, DType::F32)
                    .with_context(|| format!("failed to load {weights}"))?;
            let tokenizer = fetch_tokenizer(&api, tokenizer_repo).await?;
            let pad_id = tokenizer
                .token_to_id(pad)
                .with_context(|| format!("tokenizer from {tokenizer_repo} has no {pad} token"))?;
            encoders.push(TextEncoder {
                tokenizer,
                model,
                pad_id,
            });
        }
        let encoders: [TextEncoder; 2] = encoders
            .try_into()
            .map_err(|_| Error::msg("expected exactly two SDXL text encoders"))?;

        // --- UNet ---
        let unet_weights = if half {
            "unet/diffusion_pytorch_model.fp16.safetensors"
        } else {
            "unet/diffusion_pytorch_model.safetensors"
        };
        let unet_file = repo
            .get(unet_weights)
            .await
            .context("failed to get unet weights")?;
        let unet = sd_config
            .build_unet(unet_file, &device, LATENT_CHANNELS, cfg!(feature = "flash-attn"), dtype)
            .context("failed to load unet")?;

        // --- VAE; the stock SDXL VAE overflows in F16 ---
        let vae_file = if half {
            api.model("madebyollin/sdxl-vae-fp16-fix".to_string())
                .get("diffusion_pytorch_model.safetensors")
                .await
        } else {
            repo.get("vae/diffusion_pytorch_model.safetensors").await
        };
        let vae_file = vae_file.context("failed to get vae weights")?;
        let vae = sd_config
            .build_vae(vae_file, &device, dtype)
            .context("failed to load vae")?;

        Ok(SdxlModel {
            variant,
            device,
            dtype,
            encoders,
            unet,
            vae,
        })
    }
}
