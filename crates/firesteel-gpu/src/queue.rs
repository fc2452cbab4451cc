//! Queue family resolution.

use ash::vk;

use crate::error::{GpuError, Result};

/// Graphics and present queue family indices for a (device, surface) pair.
///
/// Resolved fresh per query; nothing is cached across calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// First graphics-capable family, in enumeration order.
    pub graphics: Option<u32>,
    /// First present-capable family, in enumeration order.
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Whether both indices have been resolved.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Unwrap both indices, failing if either is missing.
    ///
    /// A device without a graphics- or present-capable family is unusable.
    pub fn require_complete(self) -> Result<(u32, u32)> {
        match (self.graphics, self.present) {
            (Some(graphics), Some(present)) => Ok((graphics, present)),
            (graphics, present) => Err(GpuError::QueueFamilyIncomplete { graphics, present }),
        }
    }
}

/// Find graphics and present queue families on a physical device.
///
/// First match wins for each role independently, and the scan stops as
/// soon as both are recorded. A later family that could serve both roles
/// at once is deliberately never considered; callers that want a shared
/// queue only get one when the first matches coincide.
///
/// # Safety
/// The instance, physical device, and surface must be valid.
pub unsafe fn find_queue_families(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<QueueFamilyIndices> {
    let families = instance.get_physical_device_queue_family_properties(physical_device);

    scan_queue_families(&families, |index| {
        Ok(surface_loader.get_physical_device_surface_support(physical_device, index, surface)?)
    })
}

/// Scan a family property list for the first graphics-capable and first
/// present-capable indices, stopping once both are set.
fn scan_queue_families(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: impl FnMut(u32) -> Result<bool>,
) -> Result<QueueFamilyIndices> {
    let mut indices = QueueFamilyIndices::default();

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;

        if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics = Some(index);
        }

        if indices.present.is_none() && supports_present(index)? {
            indices.present = Some(index);
        }

        if indices.is_complete() {
            break;
        }
    }

    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn first_matching_indices_win() {
        let families = [
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        ];

        let indices = scan_queue_families(&families, |_| Ok(true)).unwrap();
        assert!(indices.is_complete());
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.present, Some(0));
    }

    #[test]
    fn graphics_and_present_resolved_independently() {
        let families = [
            family(vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::GRAPHICS),
        ];

        let indices = scan_queue_families(&families, |index| Ok(index == 0)).unwrap();
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(0));
    }

    #[test]
    fn no_graphics_family_leaves_graphics_unset() {
        let families = [
            family(vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::TRANSFER),
        ];

        let indices = scan_queue_families(&families, |_| Ok(true)).unwrap();
        assert_eq!(indices.graphics, None);
        assert_eq!(indices.present, Some(0));
        assert!(!indices.is_complete());
        assert!(indices.require_complete().is_err());
    }

    #[test]
    fn later_combined_family_not_discovered() {
        // Family 2 could serve both roles, but the scan stops as soon as
        // the split pair (graphics=1, present=0) is complete.
        let families = [
            family(vk::QueueFlags::empty()),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
        ];

        let indices = scan_queue_families(&families, |index| Ok(index != 1)).unwrap();
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(0));
    }

    #[test]
    fn scan_stops_once_complete() {
        let families = [
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
        ];

        let mut probed = Vec::new();
        let indices = scan_queue_families(&families, |index| {
            probed.push(index);
            Ok(true)
        })
        .unwrap();

        assert!(indices.is_complete());
        assert_eq!(probed, vec![0]);
    }

    #[test]
    fn present_probe_errors_propagate() {
        let families = [family(vk::QueueFlags::GRAPHICS)];

        let result = scan_queue_families(&families, |_| {
            Err(GpuError::Vulkan(vk::Result::ERROR_SURFACE_LOST_KHR))
        });
        assert!(result.is_err());
    }
}
