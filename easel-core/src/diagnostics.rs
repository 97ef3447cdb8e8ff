//! Accelerator diagnostics for `easel doctor`.

use anyhow::Result;
use candle_core::utils::{self, cuda_is_available, metal_is_available};
use candle_core::{Device, Shape, Tensor};

/// Build flags and device probes for the current process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceleratorReport {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
    pub crate_version: &'static str,
    pub num_threads: usize,
    pub with_avx: bool,
    pub with_neon: bool,
    pub with_f16c: bool,
    pub with_mkl: bool,
    pub with_accelerate: bool,
    pub cuda_built: bool,
    pub cuda_available: bool,
    pub metal_built: bool,
    pub metal_available: bool,
}

/// Overall verdict, mirroring the summary printed by the doctor command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ready,
    BuiltButUnavailable,
    NotBuilt,
}

impl AcceleratorReport {
    pub fn probe() -> Self {
        let cuda_built = cuda_is_available();
        let metal_built = metal_is_available();
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
            crate_version: env!("CARGO_PKG_VERSION"),
            num_threads: utils::get_num_threads(),
            with_avx: utils::with_avx(),
            with_neon: utils::with_neon(),
            with_f16c: utils::with_f16c(),
            with_mkl: utils::has_mkl(),
            with_accelerate: utils::has_accelerate(),
            cuda_built,
            cuda_available: cuda_built && Device::new_cuda(0).is_ok(),
            metal_built,
            metal_available: metal_built && Device::new_metal(0).is_ok(),
        }
    }

    pub fn verdict(&self) -> Verdict {
        match (
            self.cuda_built || self.metal_built,
            self.cuda_available || self.metal_available,
        ) {
            (_, true) => Verdict::Ready,
            (true, false) => Verdict::BuiltButUnavailable,
            (false, false) => Verdict::NotBuilt,
        }
    }

    /// The device a smoke test should run on, if any accelerator answered.
    pub fn accelerator(&self) -> Result<Option<Device>> {
        if self.cuda_available {
            Ok(Some(Device::new_cuda(0)?))
        } else if self.metal_available {
            Ok(Some(Device::new_metal(0)?))
        } else {
            Ok(None)
        }
    }
}

/// Multiplies two random 3x3 matrices on `device` and returns the result shape.
pub fn smoke_test(device: &Device) -> Result<Shape> {
    let x = Tensor::randn(0f32, 1f32, (3, 3), device)?;
    let y = Tensor::randn(0f32, 1f32, (3, 3), device)?;
    let z = x.matmul(&y)?;
    Ok(z.shape().clone())
}
