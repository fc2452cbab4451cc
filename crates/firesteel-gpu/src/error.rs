//! GPU error types.

use ash::vk;
use thiserror::Error;

/// Errors raised while bootstrapping the renderer.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Generic Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// No physical device passed the suitability filter.
    #[error("no suitable GPU found")]
    NoSuitableDevice,

    /// A graphics- or present-capable queue family is missing.
    #[error("queue families incomplete (graphics: {graphics:?}, present: {present:?})")]
    QueueFamilyIncomplete {
        /// Resolved graphics family, if any.
        graphics: Option<u32>,
        /// Resolved present family, if any.
        present: Option<u32>,
    },

    /// A requested instance extension or layer is not supported.
    #[error("unsupported instance extension or layer: {0}")]
    UnsupportedInstance(String),

    /// The driver rejected logical device creation.
    #[error("device creation rejected by driver: {0}")]
    DeviceCreation(vk::Result),

    /// Surface creation failed.
    #[error("surface creation failed: {0}")]
    SurfaceCreation(String),

    /// The driver rejected swapchain creation.
    #[error("swapchain creation rejected by driver: {0}")]
    SwapchainCreation(vk::Result),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
