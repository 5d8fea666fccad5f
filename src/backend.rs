//! Backend selection for the burn networks
//!
//! CUDA (GPU) when the `cuda` feature is on, NdArray (CPU) with `ndarray`.
//! With neither, the crate still builds and every model load reports
//! `ModelUnavailable`, so diagnosis runs on the heuristic classifier alone.

#[cfg(feature = "cuda")]
pub type InferenceBackend = burn_cuda::Cuda;

#[cfg(all(not(feature = "cuda"), feature = "ndarray"))]
pub type InferenceBackend = burn_ndarray::NdArray;

/// Get the default device
#[cfg(any(feature = "cuda", feature = "ndarray"))]
pub fn default_device() -> <InferenceBackend as burn::tensor::backend::Backend>::Device {
    <InferenceBackend as burn::tensor::backend::Backend>::Device::default()
}

/// Whether a classifier backend was compiled in
pub const fn backend_available() -> bool {
    cfg!(any(feature = "cuda", feature = "ndarray"))
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA (GPU)"
    } else if cfg!(feature = "ndarray") {
        "NdArray (CPU)"
    } else {
        "none (heuristic only)"
    }
}
