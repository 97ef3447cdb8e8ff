use anyhow::{anyhow, Result};
use hf_hub::api::tokio::Api;
use tracing::info;

use crate::{
    accelerator_available, DeviceMap, Engine, FluxLoader, GenerationRequest, Loader, ModelLike,
    Precision, SdxlLoader,
};

use crate::{flux, stable_diffusion};

/// Enum of supported model types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelType {
    Flux,
    StableDiffusionXl,
    CogVideoX,
}

impl ModelType {
    /// Detect model type from model name
    pub fn from_name(model_name: &str) -> Option<Self> {
        let name_upper = model_name.to_uppercase();

        if name_upper.contains("FLUX") {
            Some(ModelType::Flux)
        } else if name_upper.contains("SDXL") || name_upper.contains("STABLE-DIFFUSION-XL") {
            Some(ModelType::StableDiffusionXl)
        } else if name_upper.contains("COGVIDEOX") {
            Some(ModelType::CogVideoX)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CogVideoVariant {
    TwoB,
    FiveB,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelVariant {
    Flux(flux::FluxVariant),
    Sdxl(stable_diffusion::SdxlVariant),
    CogVideo(CogVideoVariant),
}

impl ModelVariant {
    /// Detect model variant from model name
    pub fn from_name(model_name: &str) -> Option<Self> {
        let name_upper = model_name.to_uppercase();

        match ModelType::from_name(model_name)? {
            ModelType::Flux => Some(ModelVariant::Flux(if name_upper.contains("DEV") {
                flux::FluxVariant::Dev
            } else {
                flux::FluxVariant::Schnell
            })),
            ModelType::StableDiffusionXl => {
                Some(ModelVariant::Sdxl(if name_upper.contains("TURBO") {
                    stable_diffusion::SdxlVariant::Turbo
                } else {
                    stable_diffusion::SdxlVariant::Base
                }))
            }
            ModelType::CogVideoX => Some(ModelVariant::CogVideo(if name_upper.contains("2B") {
                CogVideoVariant::TwoB
            } else {
                CogVideoVariant::FiveB
            })),
        }
    }
}

/// Load a model based on its name, automatically detecting the appropriate loader
pub async fn load_model(
    model_name: &str,
    api: Api,
    device_map: DeviceMap,
    precision: Precision,
) -> Result<Box<dyn ModelLike>> {
    let model_variant = ModelVariant::from_name(model_name)
        .ok_or_else(|| anyhow!("Unsupported model: {}", model_name))?;

    info!(
        "Loading model: {} (detected variant: {:?}, precision: {:?})",
        model_name, model_variant, precision
    );

    match model_variant {
        ModelVariant::Flux(variant) => {
            let model = FluxLoader::load(variant, api, device_map, precision).await?;
            Ok(Box::new(model))
        }
        ModelVariant::Sdxl(variant) => {
            let model = SdxlLoader::load(variant, api, device_map, precision).await?;
            Ok(Box::new(model))
        }
        ModelVariant::CogVideo(_) => Err(anyhow!(
            "Model variant {:?} is recognized but not yet implemented by the candle backend",
            model_variant
        )),
    }
}

/// The candle + hf-hub backend used by the command line tools.
#[derive(Clone)]
pub struct CandleEngine {
    api: Api,
}

impl CandleEngine {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

impl Engine for CandleEngine {
    type Model = Box<dyn ModelLike>;

    fn accelerator_available(&self) -> bool {
        accelerator_available()
    }

    async fn load(&self, request: &GenerationRequest, device_map: DeviceMap) -> Result<Self::Model> {
        load_model(&request.model_id, self.api.clone(), device_map, request.precision).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_variants_from_hub_ids() {
        assert_eq!(
            ModelVariant::from_name("black-forest-labs/FLUX.1-schnell"),
            Some(ModelVariant::Flux(flux::FluxVariant::Schnell))
        );
        assert_eq!(
            ModelVariant::from_name("black-forest-labs/FLUX.1-dev"),
            Some(ModelVariant::Flux(flux::FluxVariant::Dev))
        );
        assert_eq!(
            ModelVariant::from_name("stabilityai/sdxl-turbo"),
            Some(ModelVariant::Sdxl(stable_diffusion::SdxlVariant::Turbo))
        );
        assert_eq!(
            ModelVariant::from_name("stabilityai/stable-diffusion-xl-base-1.0"),
            Some(ModelVariant::Sdxl(stable_diffusion::SdxlVariant::Base))
        );
        assert_eq!(
            ModelVariant::from_name("THUDM/CogVideoX-2b"),
            Some(ModelVariant::CogVideo(CogVideoVariant::TwoB))
        );
        assert_eq!(ModelVariant::from_name("openai/whisper-tiny"), None);
    }

    #[tokio::test]
    async fn unknown_and_unported_models_fail_to_load() {
        let api = Api::new().unwrap();
        let err = load_model("openai/whisper-tiny", api.clone(), DeviceMap::ForceCpu, Precision::F32)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unsupported model"));

        let err = load_model("THUDM/CogVideoX-5b", api, DeviceMap::ForceCpu, Precision::F16)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("not yet implemented"));
    }
}
