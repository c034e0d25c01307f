use std::collections::HashSet;
use std::ffi::{CStr, CString};

use anyhow::Result;
use ash::vk;
use derivative::Derivative;

use crate::util::wrap_c_str;

/// Device extensions every candidate must carry
pub const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

/// Queue families a device must provide before it is usable.
///
/// An incomplete result means the candidate cannot drive both rendering and
/// presentation; selection moves on to the next device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Scan the candidate's queue families for graphics and present support
    pub fn find(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface: &crate::wsi::Surface,
    ) -> Result<Self> {
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        let mut indices = Self::default();
        for (index, family) in queue_families.iter().enumerate() {
            let index = index as u32;
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics_family = Some(index);
            }
            if surface.supports_present(physical_device, index)? {
                indices.present_family = Some(index);
            }
            if indices.is_complete() {
                break;
            }
        }
        Ok(indices)
    }
}

/// A selected [`vk::PhysicalDevice`] along with the properties selection
/// already had to query
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct PhysicalDevice {
    handle: vk::PhysicalDevice,
    #[derivative(Debug = "ignore")]
    instance: ash::Instance,
    #[derivative(Debug = "ignore")]
    properties: vk::PhysicalDeviceProperties,
    #[derivative(Debug = "ignore")]
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    queue_families: QueueFamilyIndices,
}

impl PhysicalDevice {
    /// Selects the first enumerated device which has complete queue
    /// families, the required extensions, a workable swapchain, and sampler
    /// anisotropy.
    pub fn select(instance: &ash::Instance, surface: &crate::wsi::Surface) -> Result<Self> {
        let candidates = unsafe { instance.enumerate_physical_devices()? };
        for candidate in candidates {
            let queue_families = QueueFamilyIndices::find(instance, candidate, surface)?;
            if !queue_families.is_complete() {
                continue;
            }
            if !Self::supports_required_extensions(instance, candidate)? {
                continue;
            }
            let support = surface.query_support(candidate)?;
            if support.formats.is_empty() || support.present_modes.is_empty() {
                continue;
            }
            let features = unsafe { instance.get_physical_device_features(candidate) };
            if features.sampler_anisotropy == vk::FALSE {
                continue;
            }

            let properties = unsafe { instance.get_physical_device_properties(candidate) };
            let memory_properties =
                unsafe { instance.get_physical_device_memory_properties(candidate) };
            tracing::info!(
                "selected physical device {}",
                wrap_c_str(properties.device_name.as_ptr()).to_string_lossy()
            );
            return Ok(Self {
                handle: candidate,
                instance: instance.clone(),
                properties,
                memory_properties,
                queue_families,
            });
        }
        Err(crate::RhiError::NoSuitablePhysicalDevice.into())
    }

    fn supports_required_extensions(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<bool> {
        let available: HashSet<CString> =
            unsafe { instance.enumerate_device_extension_properties(physical_device)? }
                .iter()
                .map(|ext| wrap_c_str(ext.extension_name.as_ptr()))
                .collect();
        Ok(REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .all(|ext| available.contains(&wrap_c_str(ext.as_ptr()))))
    }

    pub fn get_handle(&self) -> &vk::PhysicalDevice {
        &self.handle
    }

    pub fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    pub(crate) fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    pub fn limits(&self) -> &vk::PhysicalDeviceLimits {
        &self.properties.limits
    }

    pub fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(self.handle, format)
        }
    }

    /// First candidate format whose tiling supports the requested features
    pub fn find_supported_format(
        &self,
        candidates: &[vk::Format],
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> Result<vk::Format> {
        for format in candidates.iter().copied() {
            let properties = self.format_properties(format);
            let supported = match tiling {
                vk::ImageTiling::LINEAR => properties.linear_tiling_features.contains(features),
                _ => properties.optimal_tiling_features.contains(features),
            };
            if supported {
                return Ok(format);
            }
        }
        Err(crate::RhiError::NoSupportedDepthFormat.into())
    }

    /// Depth attachment format used for the shared depth image
    pub fn find_depth_format(&self) -> Result<vk::Format> {
        self.find_supported_format(
            &[
                vk::Format::D32_SFLOAT,
                vk::Format::D32_SFLOAT_S8_UINT,
                vk::Format::D24_UNORM_S8_UINT,
            ],
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        )
    }
}
