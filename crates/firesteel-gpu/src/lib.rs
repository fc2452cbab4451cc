//! Vulkan bootstrap layer for the Firesteel engine.
//!
//! This crate provides:
//! - Instance creation and validation-layer message routing
//! - Physical device selection and logical device setup
//! - Queue family resolution
//! - Swapchain construction and rebuild
//!
//! Everything is owned by a [`RenderContext`], created once per window
//! and torn down in strict reverse dependency order on drop.

pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod instance;
pub mod queue;
pub mod surface;
pub mod swapchain;

pub use context::{ContextConfig, RenderContext};
pub use error::{GpuError, Result};
pub use queue::QueueFamilyIndices;
pub use swapchain::{SwapchainBundle, SwapchainFrame, SwapchainSupport};
