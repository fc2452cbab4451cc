//! Physical device selection and logical device creation.

use std::collections::HashSet;
use std::ffi::{c_char, CStr};

use ash::vk;

use crate::error::{GpuError, Result};
use crate::instance::validation_layers;
use crate::queue::find_queue_families;

/// Device extensions every candidate must support.
pub const REQUIRED_DEVICE_EXTENSIONS: [&CStr; 1] = [ash::khr::swapchain::NAME];

/// Select the first suitable physical device.
///
/// Candidates are tried in enumeration order and the first one supporting
/// the required extension set wins. No scoring of device type or memory is
/// applied; changing to a scored heuristic would change observable
/// selection on multi-GPU hosts.
///
/// # Safety
/// The instance must be valid.
pub unsafe fn pick_physical_device(instance: &ash::Instance) -> Result<vk::PhysicalDevice> {
    let devices = instance.enumerate_physical_devices()?;
    tracing::info!("{} physical device(s) available", devices.len());

    for device in devices {
        if cfg!(debug_assertions) {
            log_device_properties(instance, device);
        }
        if is_suitable(instance, device)? {
            return Ok(device);
        }
    }

    Err(GpuError::NoSuitableDevice)
}

/// Log a candidate's name and coarse type classification.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn log_device_properties(instance: &ash::Instance, device: vk::PhysicalDevice) {
    let properties = instance.get_physical_device_properties(device);
    let name = CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy();

    let device_type = match properties.device_type {
        vk::PhysicalDeviceType::CPU => "CPU",
        vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
        vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
        _ => "Other",
    };

    tracing::debug!("  {name} | {device_type}");
}

/// Whether a device can drive the renderer: it must support the required
/// extension set, at minimum swapchain presentation.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn is_suitable(instance: &ash::Instance, device: vk::PhysicalDevice) -> Result<bool> {
    let available = instance.enumerate_device_extension_properties(device)?;
    let missing = missing_extensions(&REQUIRED_DEVICE_EXTENSIONS, &available);

    if missing.is_empty() {
        tracing::info!("Device can support requested extensions");
        Ok(true)
    } else {
        tracing::info!("Device can't support requested extensions: {missing:?}");
        Ok(false)
    }
}

/// Required extensions not present in the available set.
fn missing_extensions<'a>(
    required: &[&'a CStr],
    available: &[vk::ExtensionProperties],
) -> Vec<&'a CStr> {
    let available: HashSet<&CStr> = available
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .collect();

    required
        .iter()
        .copied()
        .filter(|ext| !available.contains(ext))
        .collect()
}

/// Create the logical device.
///
/// Queue family indices are re-resolved from the (device, surface) pair;
/// an incomplete result is fatal. Queue-create entries are deduplicated
/// when the graphics and present families coincide, avoiding the
/// duplicate-family error the API raises otherwise. Driver rejection is
/// surfaced as-is; there is no retry with reduced feature requests.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn create_logical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    validation: bool,
) -> Result<ash::Device> {
    let indices = find_queue_families(instance, surface_loader, physical_device, surface)?;
    let (graphics, present) = indices.require_complete()?;

    let mut unique_families = vec![graphics];
    if present != graphics {
        unique_families.push(present);
    }

    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extension_names: Vec<*const c_char> = REQUIRED_DEVICE_EXTENSIONS
        .iter()
        .map(|ext| ext.as_ptr())
        .collect();

    let layers = if validation {
        validation_layers()
    } else {
        vec![]
    };
    let layer_names: Vec<*const c_char> = layers.iter().map(|layer| layer.as_ptr()).collect();

    let features = vk::PhysicalDeviceFeatures::default();

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_layer_names(&layer_names)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let device = instance
        .create_device(physical_device, &create_info, None)
        .map_err(GpuError::DeviceCreation)?;

    tracing::info!("GPU has been successfully abstracted");
    Ok(device)
}

/// Retrieve the graphics and present queue handles.
///
/// Both are taken at queue index 0 within their families and may alias
/// the same underlying queue.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn get_queues(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    device: &ash::Device,
    surface: vk::SurfaceKHR,
) -> Result<(vk::Queue, vk::Queue)> {
    let indices = find_queue_families(instance, surface_loader, physical_device, surface)?;
    let (graphics, present) = indices.require_complete()?;

    Ok((
        device.get_device_queue(graphics, 0),
        device.get_device_queue(present, 0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension(name: &CStr) -> vk::ExtensionProperties {
        let mut props = vk::ExtensionProperties::default();
        for (dst, &src) in props
            .extension_name
            .iter_mut()
            .zip(name.to_bytes_with_nul())
        {
            *dst = src as c_char;
        }
        props
    }

    #[test]
    fn all_required_extensions_available() {
        let available = [
            extension(c"VK_KHR_swapchain"),
            extension(c"VK_KHR_maintenance1"),
        ];

        let missing = missing_extensions(&REQUIRED_DEVICE_EXTENSIONS, &available);
        assert!(missing.is_empty());
    }

    #[test]
    fn swapchain_extension_missing() {
        let available = [extension(c"VK_KHR_maintenance1")];

        let missing = missing_extensions(&REQUIRED_DEVICE_EXTENSIONS, &available);
        assert_eq!(missing, vec![ash::khr::swapchain::NAME]);
    }

    #[test]
    fn no_extensions_available() {
        let missing = missing_extensions(&REQUIRED_DEVICE_EXTENSIONS, &[]);
        assert_eq!(missing.len(), REQUIRED_DEVICE_EXTENSIONS.len());
    }
}
