use anyhow::{Context, Error, Result};
use candle_core::{DType, Device, IndexOp};
use candle_nn::Module;
use candle_transformers::models::{
    clip::text_model::{Activation, ClipTextConfig, ClipTextTransformer},
    flux::{
        autoencoder::{self, AutoEncoder},
        model::{self, Flux},
        sampling,
    },
    t5::{self, T5EncoderModel},
};
use hf_hub::api::tokio::Api;
use tokenizers::Tokenizer;
use tracing::debug;

use crate::{
    select_best_device, tensor_to_image, Artifact, DeviceMap, GenerationRequest, Loader,
    ModelLike, Precision,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxVariant {
    Schnell,
    Dev,
}

impl FluxVariant {
    fn repo(self) -> &'static str {
        match self {
            FluxVariant::Schnell => "black-forest-labs/FLUX.1-schnell",
            FluxVariant::Dev => "black-forest-labs/FLUX.1-dev",
        }
    }

    fn weights(self) -> &'static str {
        match self {
            FluxVariant::Schnell => "flux1-schnell.safetensors",
            FluxVariant::Dev => "flux1-dev.safetensors",
        }
    }

    fn t5_max_tokens(self) -> usize {
        match self {
            FluxVariant::Schnell => 256,
            FluxVariant::Dev => 512,
        }
    }
}

pub struct FluxModel {
    variant: FluxVariant,
    device: Device,
    dtype: DType,
    t5_model: T5EncoderModel,
    t5_tokenizer: Tokenizer,
    clip_model: ClipTextTransformer,
    clip_tokenizer: Tokenizer,
    autoencoder: AutoEncoder,
    flux_model: Flux,
}

impl ModelLike for FluxModel {
    fn run(&mut self, request: &GenerationRequest) -> Result<Artifact> {
        let (width, height) = request
            .media
            .image_size()
            .context("FLUX pipelines only produce images")?;
        let guidance = request.guidance.unwrap_or(0.0);

        if let Some(seed) = request.seed {
            self.device.set_seed(seed)?;
        }

        let noise_img = sampling::get_noise(1, height, width, &self.device)?.to_dtype(self.dtype)?;

        let mut t5_tokens = self
            .t5_tokenizer
            .encode(request.prompt.as_str(), true)
            .map_err(Error::msg)?
            .get_ids()
            .to_vec();
        t5_tokens.resize(self.variant.t5_max_tokens(), 0);
        let input_token_ids = candle_core::Tensor::new(&*t5_tokens, &self.device)?.unsqueeze(0)?;
        let t5_emb = self.t5_model.forward(&input_token_ids)?;

        let clip_tokens = self
            .clip_tokenizer
            .encode(request.prompt.as_str(), true)
            .map_err(Error::msg)?
            .get_ids()
            .to_vec();
        let input_token_ids_clip =
            candle_core::Tensor::new(&*clip_tokens, &self.device)?.unsqueeze(0)?;
        let clip_emb = self.clip_model.forward(&input_token_ids_clip)?;

        let state = sampling::State::new(&t5_emb.to_dtype(self.dtype)?, &clip_emb.to_dtype(self.dtype)?, &noise_img)?;
        let timesteps = match self.variant {
            FluxVariant::Schnell => sampling::get_schedule(request.steps, None),
            FluxVariant::Dev => {
                sampling::get_schedule(request.steps, Some((state.img.dim(1)?, 0.5, 1.15)))
            }
        };

        let latent_img = sampling::denoise(
            &self.flux_model,
            &state.img,
            &state.img_ids,
            &state.txt,
            &state.txt_ids,
            &state.vec,
            &timesteps,
            guidance,
        )?;
        let unpacked = sampling::unpack(&latent_img, height, width)?;
        debug!("generated latent image");

        let decoded = self.autoencoder.decode(&unpacked)?;
        debug!("decoded image");

        let img = ((decoded.to_dtype(DType::F32)?.clamp(-1f32, 1f32)? + 1.0)? * 127.5)?
            .to_dtype(DType::U8)?;
        let img_tensor = img.i(0)?;

        Ok(Artifact::Image(tensor_to_image(&img_tensor)?))
    }
}

pub struct FluxLoader;

impl Loader for FluxLoader {
    type Variant = FluxVariant;
    type Model = FluxModel;

    async fn load(
        variant: FluxVariant,
        api: Api,
        device_map: DeviceMap,
        precision: Precision,
    ) -> Result<Self::Model> {
        let device = select_best_device(device_map).context("failed to set up device")?;
        let dtype = precision.dtype_for(&device);

        // --- T5 encoder and tokenizer ---
        let t5_repo = api.repo(hf_hub::Repo::with_revision(
            "google/t5-v1_1-xxl".to_string(),
            hf_hub::RepoType::Model,
            "refs/pr/2".to_string(),
        ));
        let t5_model_file = t5_repo
            .get("model.safetensors")
            .await
            .context("failed to load T5 model file")?;
        let t5_vb = unsafe {
            candle_nn::VarBuilder::from_mmaped_safetensors(&[t5_model_file], dtype, &device)
                .context("failed to build T5 var builder")?
        };
        let config_filename = t5_repo
            .get("config.json")
            .await
            .context("failed to get T5 config")?;
        let config_str =
            std::fs::read_to_string(&config_filename).context("failed to read T5 config")?;
        let t5_config: t5::Config =
            serde_json::from_str(&config_str).context("failed to parse T5 config")?;
        let t5_model =
            T5EncoderModel::load(t5_vb, &t5_config).context("failed to load T5 model")?;
        let t5_tokenizer_filename = api
            .model("lmz/mt5-tokenizers".to_string())
            .get("t5-v1_1-xxl.tokenizer.json")
            .await
            .context("failed to get T5 tokenizer")?;
        let t5_tokenizer = Tokenizer::from_file(t5_tokenizer_filename)
            .map_err(Error::msg)
            .context("failed to load T5 tokenizer")?;

        // --- CLIP encoder and tokenizer ---
        let clip_repo = api.repo(hf_hub::Repo::model(
            "openai/clip-vit-large-patch14".to_string(),
        ));
        let clip_model_file = clip_repo
            .get("model.safetensors")
            .await
            .context("failed to get CLIP model file")?;
        let clip_vb = unsafe {
            candle_nn::VarBuilder::from_mmaped_safetensors(&[clip_model_file], dtype, &device)
                .context("failed to build CLIP var builder")?
        };
        let clip_config = ClipTextConfig {
            vocab_size: 49408,
            projection_dim: 768,
            activation: Activation::QuickGelu,
            intermediate_size: 3072,
            embed_dim: 768,
            max_position_embeddings: 77,
            pad_with: None,
            num_hidden_layers: 12,
            num_attention_heads: 12,
        };
        let clip_model = ClipTextTransformer::new(clip_vb.pp("text_model"), &clip_config)
            .context("failed to load CLIP model")?;
        let clip_tokenizer_filename = clip_repo
            .get("tokenizer.json")
            .await
            .context("failed to get CLIP tokenizer")?;
        let clip_tokenizer = Tokenizer::from_file(clip_tokenizer_filename)
            .map_err(Error::msg)
            .context("failed to load CLIP tokenizer")?;

        // --- Autoencoder and flow transformer ---
        let bf_repo = api.repo(hf_hub::Repo::model(variant.repo().to_string()));
        let autoencoder_model_file = bf_repo
            .get("ae.safetensors")
            .await
            .context("failed to get autoencoder model file")?;
        let autoencoder_vb = unsafe {
            candle_nn::VarBuilder::from_mmaped_safetensors(
                &[autoencoder_model_file],
                dtype,
                &device,
            )
            .context("failed to build autoencoder var builder")?
        };
        let autoencoder_config = match variant {
            FluxVariant::Schnell => autoencoder::Config::schnell(),
            FluxVariant::Dev => autoencoder::Config::dev(),
        };
        let autoencoder = AutoEncoder::new(&autoencoder_config, autoencoder_vb)
            .context("failed to load autoencoder")?;

        let flux_model_file = bf_repo
            .get(variant.weights())
            .await
            .context("failed to get flux model file")?;
        debug!(file = %flux_model_file.display(), "mapping flux weights");
        let flux_vb = unsafe {
            candle_nn::VarBuilder::from_mmaped_safetensors(&[flux_model_file], dtype, &device)
                .context("failed to build flux var builder")?
        };
        let flux_config = match variant {
            FluxVariant::Schnell => model::Config::schnell(),
            FluxVariant::Dev => model::Config::dev(),
        };
        let flux_model = Flux::new(&flux_config, flux_vb).context("failed to load flux model")?;

        Ok(FluxModel {
            variant,
            device,
            dtype,
            t5_model,
            t5_tokenizer,
            clip_model,
            clip_tokenizer,
            autoencoder,
            flux_model,
        })
    }
}
