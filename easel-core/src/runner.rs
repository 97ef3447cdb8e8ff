use std::time::Instant;

use tracing::info;

use crate::{
    naming, AcceleratorPolicy, DeviceMap, Engine, GenerationError, GenerationRequest,
    GenerationResult, ModelLike,
};

/// Executes one [`GenerationRequest`] against an [`Engine`].
pub struct Runner<E> {
    engine: E,
    policy: AcceleratorPolicy,
    device_map: DeviceMap,
}

impl<E: Engine> Runner<E> {
    pub fn new(engine: E, policy: AcceleratorPolicy) -> Self {
        Self {
            engine,
            policy,
            device_map: DeviceMap::default(),
        }
    }

    pub fn with_device_map(mut self, device_map: DeviceMap) -> Self {
        self.device_map = device_map;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Resolves the device the run will use, warning on CPU fallback.
    pub fn resolve_device(
        &self,
        request: &GenerationRequest,
    ) -> Result<DeviceMap, GenerationError> {
        self.policy
            .choose(self.device_map, || self.engine.accelerator_available())
            .ok_or(GenerationError::AcceleratorUnavailable {
                kind: request.media.kind(),
            })
    }

    pub async fn run(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        request.validate()?;
        let device_map = self.resolve_device(&request)?;
        self.run_on(request, device_map).await
    }

    /// Runs `request` on a device already picked by [`resolve_device`](Self::resolve_device).
    pub async fn run_on(
        &self,
        request: GenerationRequest,
        device_map: DeviceMap,
    ) -> Result<GenerationResult, GenerationError> {
        request.validate()?;

        std::fs::create_dir_all(&request.output_dir)?;

        info!(model = %request.model_id, "Loading {} model...", request.model_name);
        let load_start = Instant::now();
        let mut model = self
            .engine
            .load(&request, device_map)
            .await
            .map_err(GenerationError::Engine)?;
        let load_duration = load_start.elapsed();
        info!("Model loaded in {:.2} seconds", load_duration.as_secs_f64());

        info!(steps = request.steps, "Generating {}...", request.media.kind());
        let gen_start = Instant::now();
        let artifact = model.run(&request).map_err(GenerationError::Engine)?;
        let generation_duration = gen_start.elapsed();
        info!(
            "Generation finished in {:.2} seconds",
            generation_duration.as_secs_f64()
        );

        let file_name = naming::output_file_name(
            &request.model_id,
            &naming::local_timestamp(),
            artifact.extension(),
        );
        let path = request.output_dir.join(file_name);
        self.engine
            .export(&artifact, &path)
            .map_err(GenerationError::Engine)?;

        Ok(GenerationResult {
            load_duration,
            generation_duration,
            output_path: std::path::absolute(&path)?,
        })
    }
}
