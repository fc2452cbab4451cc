//! Validation layer message routing.

use std::ffi::{c_void, CStr};

use ash::vk;

use crate::error::Result;

/// Create a debug-utils messenger forwarding validation messages to tracing.
///
/// # Safety
/// The debug-utils instance must be valid.
pub unsafe fn create_debug_messenger(
    debug_utils: &ash::ext::debug_utils::Instance,
) -> Result<vk::DebugUtilsMessengerEXT> {
    let create_info = messenger_create_info();
    let messenger = debug_utils.create_debug_utils_messenger(&create_info, None)?;

    tracing::debug!("Debug messenger created");
    Ok(messenger)
}

/// Messenger configuration: verbose, warning, and error severities across
/// general, validation, and performance message types.
fn messenger_create_info<'a>() -> vk::DebugUtilsMessengerCreateInfoEXT<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
}

/// Diagnostic only; never affects control flow.
unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!("Validation layer [{message_type:?}]: {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!("Validation layer [{message_type:?}]: {message}");
    } else {
        tracing::trace!("Validation layer [{message_type:?}]: {message}");
    }

    vk::FALSE
}
