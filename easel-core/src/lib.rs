#[cfg(feature = "accelerate")]
extern crate accelerate_src;
#[cfg(feature = "mkl")]
extern crate intel_mkl_src;

pub mod artifact;
pub mod configurator;
pub mod device_map;
pub mod diagnostics;
pub mod engine;
pub mod error;
mod loader_factory;
pub mod menu;
pub mod naming;
pub mod presets;
pub mod request;
pub mod runner;
pub mod sentiment;
mod util;

mod flux;
mod stable_diffusion;

pub use artifact::*;
pub use configurator::*;
pub use device_map::*;
pub use engine::*;
pub use error::*;
pub use flux::{FluxLoader, FluxVariant};
pub use loader_factory::*;
pub use menu::*;
pub use request::*;
pub use runner::*;
pub use stable_diffusion::{SdxlLoader, SdxlVariant};
pub(crate) use util::*;
