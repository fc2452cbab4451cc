//! Render context management.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::debug::create_debug_messenger;
use crate::device::{create_logical_device, get_queues, pick_physical_device};
use crate::error::{GpuError, Result};
use crate::instance::create_instance;
use crate::queue::{find_queue_families, QueueFamilyIndices};
use crate::surface::create_surface;
use crate::swapchain::{create_swapchain, SwapchainBundle};

/// Render context configuration.
#[derive(Clone)]
pub struct ContextConfig {
    /// Application name reported to the driver.
    pub app_name: String,
    /// Requested swapchain width, used when the surface extent is undefined.
    pub width: u32,
    /// Requested swapchain height, used when the surface extent is undefined.
    pub height: u32,
    /// Enable validation layers and the debug messenger (default: debug builds only).
    pub validation: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            app_name: "Firesteel".to_string(),
            width: 800,
            height: 600,
            validation: cfg!(debug_assertions),
        }
    }
}

impl ContextConfig {
    /// Create a new config with the given application name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Set the requested swapchain dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }
}

/// Owns the full Vulkan bootstrap chain for one window.
///
/// Construction follows the dependency order instance → debug messenger →
/// surface → physical device → logical device and queues → swapchain;
/// drop tears down in exactly the reverse order. All operations are
/// single-threaded and blocking.
pub struct RenderContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    entry: ash::Entry,
    instance: ash::Instance,
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    queue_families: QueueFamilyIndices,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: SwapchainBundle,
}

impl RenderContext {
    /// Bootstrap the rendering chain for a window.
    ///
    /// # Safety
    /// The window must have valid handles and outlive the context.
    pub unsafe fn new<W>(config: &ContextConfig, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let entry = ash::Entry::load()
            .map_err(|e| GpuError::Other(format!("failed to load Vulkan: {e}")))?;

        let display_handle = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("failed to get display handle: {e}")))?
            .as_raw();

        let instance =
            create_instance(&entry, &config.app_name, display_handle, config.validation)?;

        let debug_messenger = if config.validation {
            let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger = create_debug_messenger(&loader)?;
            Some((loader, messenger))
        } else {
            None
        };

        let surface = create_surface(&entry, &instance, window)?;
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let physical_device = pick_physical_device(&instance)?;
        let queue_families =
            find_queue_families(&instance, &surface_loader, physical_device, surface)?;

        let device = create_logical_device(
            &instance,
            &surface_loader,
            physical_device,
            surface,
            config.validation,
        )?;
        let (graphics_queue, present_queue) =
            get_queues(&instance, &surface_loader, physical_device, &device, surface)?;

        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
        let swapchain = create_swapchain(
            &instance,
            &device,
            &surface_loader,
            &swapchain_loader,
            physical_device,
            surface,
            config.width,
            config.height,
        )?;

        Ok(Self {
            entry,
            instance,
            debug_messenger,
            surface_loader,
            surface,
            physical_device,
            device,
            queue_families,
            graphics_queue,
            present_queue,
            swapchain_loader,
            swapchain,
        })
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the logical device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the presentation surface.
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Get the resolved queue family indices.
    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the present queue.
    ///
    /// May be the same underlying queue as the graphics queue.
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Get the swapchain extension loader.
    pub fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    /// Get the current swapchain bundle.
    pub fn swapchain(&self) -> &SwapchainBundle {
        &self.swapchain
    }

    /// Get the current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    /// Wait for the device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }

    /// Tear down and rebuild the swapchain for a new surface extent.
    ///
    /// Must complete before any frame that observes the changed extent.
    /// Always a full teardown and rebuild; no old-swapchain recycling.
    ///
    /// # Safety
    /// The swapchain must not be in use.
    pub unsafe fn rebuild_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        self.swapchain.destroy(&self.device, &self.swapchain_loader);

        self.swapchain = create_swapchain(
            &self.instance,
            &self.device,
            &self.surface_loader,
            &self.swapchain_loader,
            self.physical_device,
            self.surface,
            width,
            height,
        )?;

        tracing::info!(
            "Swapchain rebuilt: {}x{}",
            self.swapchain.extent.width,
            self.swapchain.extent.height
        );

        Ok(())
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // Strict reverse dependency order: image views, swapchain,
            // surface, device, debug messenger, instance.
            self.swapchain.destroy(&self.device, &self.swapchain_loader);
            self.surface_loader.destroy_surface(self.surface, None);
            self.device.destroy_device(None);
            if let Some((loader, messenger)) = self.debug_messenger.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}
