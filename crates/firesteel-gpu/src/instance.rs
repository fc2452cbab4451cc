//! Vulkan instance creation.

use std::ffi::{c_char, CStr, CString};

use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::error::{GpuError, Result};

/// Validation layers requested when validation is enabled.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![c"VK_LAYER_KHRONOS_validation"]
}

/// Create a Vulkan instance for the given display.
///
/// The windowing system's required extension list is consumed verbatim;
/// the debug-utils extension is appended when validation is enabled.
/// Requests fail closed: a missing extension or layer is an error, not a
/// reduced request.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    display_handle: RawDisplayHandle,
    validation: bool,
) -> Result<ash::Instance> {
    log_instance_version(entry)?;

    let app_name = CString::new(app_name).unwrap();
    let engine_name = CString::new("Firesteel").unwrap();

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(&engine_name)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_0);

    // Platform extension list from the windowing system, verbatim.
    let mut extensions: Vec<&CStr> = ash_window::enumerate_required_extensions(display_handle)?
        .iter()
        .map(|&ptr| CStr::from_ptr(ptr))
        .collect();
    if validation {
        extensions.push(ash::ext::debug_utils::NAME);
    }

    tracing::debug!("Requested instance extensions:");
    for ext in &extensions {
        tracing::debug!("  {:?}", ext);
    }

    let layers = if validation {
        validation_layers()
    } else {
        vec![]
    };

    let supported_extensions = entry.enumerate_instance_extension_properties(None)?;
    let supported_layers = entry.enumerate_instance_layer_properties()?;
    if let Some(missing) =
        first_unsupported(&extensions, &layers, &supported_extensions, &supported_layers)
    {
        return Err(GpuError::UnsupportedInstance(
            missing.to_string_lossy().into_owned(),
        ));
    }

    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();
    let layer_names: Vec<*const c_char> = layers.iter().map(|layer| layer.as_ptr()).collect();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_layer_names(&layer_names)
        .enabled_extension_names(&extension_names);

    let instance = entry.create_instance(&create_info, None)?;

    Ok(instance)
}

/// Log the loader-reported instance version.
unsafe fn log_instance_version(entry: &ash::Entry) -> Result<()> {
    let version = entry
        .try_enumerate_instance_version()?
        .unwrap_or(vk::API_VERSION_1_0);

    tracing::debug!(
        "Vulkan instance version: {}.{}.{} (variant {})",
        vk::api_version_major(version),
        vk::api_version_minor(version),
        vk::api_version_patch(version),
        vk::api_version_variant(version),
    );

    Ok(())
}

/// First requested extension or layer missing from the supported sets.
fn first_unsupported<'a>(
    extensions: &[&'a CStr],
    layers: &[&'a CStr],
    supported_extensions: &[vk::ExtensionProperties],
    supported_layers: &[vk::LayerProperties],
) -> Option<&'a CStr> {
    for &ext in extensions {
        let found = supported_extensions
            .iter()
            .any(|props| props.extension_name_as_c_str().ok() == Some(ext));
        if !found {
            return Some(ext);
        }
    }

    for &layer in layers {
        let found = supported_layers
            .iter()
            .any(|props| props.layer_name_as_c_str().ok() == Some(layer));
        if !found {
            return Some(layer);
        }
    }

    None
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

    fn layer(name: &CStr) -> vk::LayerProperties {
        let mut props = vk::LayerProperties::default();
        for (dst, &src) in props.layer_name.iter_mut().zip(name.to_bytes_with_nul()) {
            *dst = src as c_char;
        }
        props
    }

    #[test]
    fn all_requested_names_supported() {
        let supported_ext = [extension(c"VK_KHR_surface"), extension(c"VK_EXT_debug_utils")];
        let supported_layers = [layer(c"VK_LAYER_KHRONOS_validation")];

        let missing = first_unsupported(
            &[c"VK_KHR_surface"],
            &[c"VK_LAYER_KHRONOS_validation"],
            &supported_ext,
            &supported_layers,
        );
        assert_eq!(missing, None);
    }

    #[test]
    fn missing_extension_reported() {
        let supported_ext = [extension(c"VK_KHR_surface")];

        let missing = first_unsupported(
            &[c"VK_KHR_surface", c"VK_KHR_win32_surface"],
            &[],
            &supported_ext,
            &[],
        );
        assert_eq!(missing, Some(c"VK_KHR_win32_surface"));
    }

    #[test]
    fn missing_layer_reported() {
        let supported_ext = [extension(c"VK_KHR_surface")];

        let missing = first_unsupported(
            &[c"VK_KHR_surface"],
            &[c"VK_LAYER_KHRONOS_validation"],
            &supported_ext,
            &[],
        );
        assert_eq!(missing, Some(c"VK_LAYER_KHRONOS_validation"));
    }
}
