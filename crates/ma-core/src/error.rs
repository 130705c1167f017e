use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatAddError {
    #[error("invalid dimensions {dx}x{dy}: both must be greater than zero")]
    InvalidDims { dx: usize, dy: usize },
    #[error("dimensions {dx}x{dy} overflow the addressable element count")]
    SizeOverflow { dx: usize, dy: usize },
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },
    #[error("failed to allocate {elements} host elements")]
    HostAlloc { elements: usize },
    #[error("no compatible accelerator adapter found: {0}")]
    NoAdapter(String),
    #[error("failed to request accelerator device: {0}")]
    DeviceRequest(String),
    #[error("{what} of {requested} exceeds device limit {limit}")]
    DeviceLimit {
        what: &'static str,
        requested: u64,
        limit: u64,
    },
    #[error("accelerator buffer allocation failed: {0}")]
    DeviceAlloc(String),
    #[error("kernel dispatch failed: {0}")]
    Dispatch(String),
    #[error("result readback failed: {0}")]
    Readback(String),
}

pub type Result<T> = std::result::Result<T, MatAddError>;
