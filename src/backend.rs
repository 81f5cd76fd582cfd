//! Backend abstraction - CPU (NdArray) with optional CUDA
//!
//! The compute device is an explicit configuration value: it is resolved
//! once at startup and the resulting device is handed to every component.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, TrainerError};

// --------------------------------------------------------------------------------
// BACKEND TYPES
// --------------------------------------------------------------------------------

/// CPU inference backend
pub type CpuBackend = NdArray<f32>;

/// CPU training backend
pub type CpuTrainingBackend = Autodiff<CpuBackend>;

/// CUDA inference backend
#[cfg(feature = "cuda")]
pub type CudaBackend = burn_cuda::Cuda;

/// CUDA training backend
#[cfg(feature = "cuda")]
pub type CudaTrainingBackend = Autodiff<CudaBackend>;

/// Requested compute device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    /// CUDA when the binary was built with it, CPU otherwise
    #[default]
    Auto,
    Cpu,
    Cuda,
}

/// A concrete device together with the backend it belongs to
#[derive(Debug, Clone)]
pub enum ResolvedDevice {
    Cpu(NdArrayDevice),
    #[cfg(feature = "cuda")]
    Cuda(burn_cuda::CudaDevice),
}

impl ComputeDevice {
    /// Pick the backend and device for this run
    pub fn resolve(self) -> Result<ResolvedDevice> {
        match self {
            ComputeDevice::Cpu => Ok(ResolvedDevice::Cpu(NdArrayDevice::Cpu)),
            ComputeDevice::Cuda => cuda_device().ok_or_else(|| {
                TrainerError::Config(
                    "CUDA requested but this binary was built without the `cuda` feature"
                        .to_string(),
                )
            }),
            ComputeDevice::Auto => {
                Ok(cuda_device().unwrap_or(ResolvedDevice::Cpu(NdArrayDevice::Cpu)))
            }
        }
    }
}

#[cfg(feature = "cuda")]
fn cuda_device() -> Option<ResolvedDevice> {
    Some(ResolvedDevice::Cuda(burn_cuda::CudaDevice::default()))
}

#[cfg(not(feature = "cuda"))]
fn cuda_device() -> Option<ResolvedDevice> {
    None
}

impl ResolvedDevice {
    /// Human-readable backend name
    pub fn backend_name(&self) -> &'static str {
        match self {
            ResolvedDevice::Cpu(_) => "NdArray (CPU)",
            #[cfg(feature = "cuda")]
            ResolvedDevice::Cuda(_) => "CUDA (GPU)",
        }
    }
}
