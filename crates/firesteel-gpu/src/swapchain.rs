//! Swapchain support probing, selection rules, and construction.

use ash::vk;

use crate::error::{GpuError, Result};
use crate::queue::find_queue_families;

/// Surface capabilities, formats, and present modes for one
/// (device, surface) pair.
///
/// Valid only for the pair it was queried against; a window resize
/// invalidates `capabilities.current_extent`.
pub struct SwapchainSupport {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats, in driver order.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes, in driver order.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// One presentable image and its view.
///
/// The image is owned by the swapchain and must not be destroyed
/// directly; the view is owned by this code and must be destroyed before
/// the swapchain.
#[derive(Clone, Copy)]
pub struct SwapchainFrame {
    /// Driver-owned image handle.
    pub image: vk::Image,
    /// 2D color view onto the image.
    pub view: vk::ImageView,
}

/// A complete swapchain: handle, per-image frames, chosen format and extent.
///
/// Frames are ordered parallel to the driver-reported image array.
pub struct SwapchainBundle {
    /// Swapchain handle, owned by the logical device.
    pub swapchain: vk::SwapchainKHR,
    /// One frame per swapchain image, in presentation order.
    pub frames: Vec<SwapchainFrame>,
    /// Chosen surface format.
    pub format: vk::Format,
    /// Chosen extent.
    pub extent: vk::Extent2D,
}

impl SwapchainBundle {
    /// Destroy the image views, then the swapchain.
    ///
    /// # Safety
    /// All handles must be valid and the swapchain must not be in use.
    pub unsafe fn destroy(
        &self,
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) {
        for frame in &self.frames {
            device.destroy_image_view(frame.view, None);
        }
        swapchain_loader.destroy_swapchain(self.swapchain, None);
    }
}

/// Query surface capabilities, formats, and present modes.
///
/// # Safety
/// The physical device and surface must be valid.
pub unsafe fn query_swapchain_support(
    surface_loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<SwapchainSupport> {
    Ok(SwapchainSupport {
        capabilities: surface_loader
            .get_physical_device_surface_capabilities(physical_device, surface)?,
        formats: surface_loader.get_physical_device_surface_formats(physical_device, surface)?,
        present_modes: surface_loader
            .get_physical_device_surface_present_modes(physical_device, surface)?,
    })
}

/// Select the surface format, preferring 8-bit BGRA with the standard
/// non-linear sRGB color space.
///
/// Falls back to the first supported entry; driver ordering is not
/// guaranteed optimal.
pub fn select_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    for &format in formats {
        if format.format == vk::Format::B8G8R8A8_UNORM
            && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        {
            return format;
        }
    }

    formats[0]
}

/// Select the present mode, preferring low-latency mailbox.
///
/// FIFO is guaranteed by the specification, so this is total.
pub fn select_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    for &mode in present_modes {
        if mode == vk::PresentModeKHR::MAILBOX {
            return mode;
        }
    }

    vk::PresentModeKHR::FIFO
}

/// Select the swapchain extent.
///
/// An undefined current extent (the `u32::MAX` sentinel) means the window
/// size is negotiable: the requested size is clamped componentwise into
/// the supported range. Otherwise the windowing system has already fixed
/// the extent and the requested size is ignored.
pub fn select_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Requested image count: one past the minimum, capped by the device.
///
/// A `max_image_count` of 0 means unbounded and must not participate in
/// the cap.
pub fn image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let requested = capabilities.min_image_count + 1;
    if capabilities.max_image_count == 0 {
        requested
    } else {
        requested.min(capabilities.max_image_count)
    }
}

/// Image sharing configuration for the resolved queue families.
///
/// Differing graphics and present families require concurrent sharing
/// across exactly those two indices; exclusive mode across differing
/// families is undefined behavior on the underlying API.
fn sharing_config(graphics: u32, present: u32) -> (vk::SharingMode, Vec<u32>) {
    if graphics == present {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    } else {
        (vk::SharingMode::CONCURRENT, vec![graphics, present])
    }
}

/// Create a swapchain and one image view per driver-owned image.
///
/// Always builds fresh rather than recycling an old swapchain, so every
/// resize pays the full teardown and rebuild. Creation failure is fatal
/// and propagated without retry.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn create_swapchain(
    instance: &ash::Instance,
    device: &ash::Device,
    surface_loader: &ash::khr::surface::Instance,
    swapchain_loader: &ash::khr::swapchain::Device,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    width: u32,
    height: u32,
) -> Result<SwapchainBundle> {
    let support = query_swapchain_support(surface_loader, physical_device, surface)?;
    let surface_format = select_surface_format(&support.formats);
    let present_mode = select_present_mode(&support.present_modes);
    let extent = select_extent(&support.capabilities, width, height);

    let indices = find_queue_families(instance, surface_loader, physical_device, surface)?;
    let (graphics, present) = indices.require_complete()?;
    let (sharing_mode, family_indices) = sharing_config(graphics, present);

    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count(&support.capabilities))
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(sharing_mode)
        .queue_family_indices(&family_indices)
        .pre_transform(support.capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(vk::SwapchainKHR::null());

    let swapchain = swapchain_loader
        .create_swapchain(&create_info, None)
        .map_err(GpuError::SwapchainCreation)?;

    // Driver-owned images; one view each, parallel ordering.
    let images = swapchain_loader.get_swapchain_images(swapchain)?;

    let mut frames = Vec::with_capacity(images.len());
    for &image in &images {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(surface_format.format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = device.create_image_view(&view_info, None)?;
        frames.push(SwapchainFrame { image, view });
    }

    tracing::info!(
        "Swapchain created: {}x{}, {} image(s), {:?}, {:?}",
        extent.width,
        extent.height,
        frames.len(),
        surface_format.format,
        present_mode,
    );

    Ok(SwapchainBundle {
        swapchain,
        frames,
        format: surface_format.format,
        extent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn capabilities() -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 8,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 100,
                height: 100,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        }
    }

    #[test]
    fn preferred_format_found_even_when_listed_last() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let chosen = select_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn format_falls_back_to_first_entry() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let chosen = select_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn mailbox_preferred_when_available() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(select_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn fifo_fallback_when_mailbox_absent() {
        let modes = [vk::PresentModeKHR::FIFO];
        assert_eq!(select_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_clamped_when_current_undefined() {
        let caps = capabilities();

        let extent = select_extent(&caps, 50, 8000);
        assert_eq!(extent.width, 100);
        assert_eq!(extent.height, 4096);
    }

    #[test]
    fn extent_fixed_by_surface_ignores_request() {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            ..capabilities()
        };

        let extent = select_extent(&caps, 50, 8000);
        assert_eq!(extent.width, 1280);
        assert_eq!(extent.height, 720);
    }

    #[test]
    fn image_count_one_past_minimum_when_unbounded() {
        let caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..capabilities()
        };

        assert_eq!(image_count(&caps), 3);
    }

    #[test]
    fn image_count_capped_by_device() {
        let caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 3,
            max_image_count: 3,
            ..capabilities()
        };

        assert_eq!(image_count(&caps), 3);
    }

    #[test]
    fn shared_family_uses_exclusive_mode() {
        let (mode, indices) = sharing_config(0, 0);
        assert_eq!(mode, vk::SharingMode::EXCLUSIVE);
        assert!(indices.is_empty());
    }

    #[test]
    fn split_families_use_concurrent_mode() {
        let (mode, indices) = sharing_config(1, 2);
        assert_eq!(mode, vk::SharingMode::CONCURRENT);
        assert_eq!(indices, vec![1, 2]);
    }
}
