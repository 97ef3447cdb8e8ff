use std::future::Future;
use std::path::Path;

use anyhow::Result;
use hf_hub::api::tokio::Api;

use crate::{Artifact, DeviceMap, GenerationRequest, Precision};

/// A loaded, ready-to-run pipeline.
pub trait ModelLike: Send {
    fn run(&mut self, request: &GenerationRequest) -> Result<Artifact>;
}

impl<M: ModelLike + ?Sized> ModelLike for Box<M> {
    fn run(&mut self, request: &GenerationRequest) -> Result<Artifact> {
        (**self).run(request)
    }
}

/// Builds one model family's pipeline from hub weights.
pub trait Loader {
    type Variant;
    type Model: ModelLike;

    fn load(
        variant: Self::Variant,
        api: Api,
        device_map: DeviceMap,
        precision: Precision,
    ) -> impl Future<Output = Result<Self::Model>>
    where
        Self: Sized;
}

/// Everything the runner needs from an inference backend.
pub trait Engine {
    type Model: ModelLike;

    fn accelerator_available(&self) -> bool;

    /// Constructs the pipeline for `request.model_id` and places it on `device_map`.
    fn load(
        &self,
        request: &GenerationRequest,
        device_map: DeviceMap,
    ) -> impl Future<Output = Result<Self::Model>>;

    fn export(&self, artifact: &Artifact, path: &Path) -> Result<()> {
        artifact.export(path)
    }
}
