use std::collections::HashSet;
use std::ffi::{c_char, c_void};
use std::ptr;
use std::sync::Arc;

use anyhow::Result;
use ash::vk;
use derivative::Derivative;

use crate::device::physical_device::{PhysicalDevice, REQUIRED_DEVICE_EXTENSIONS};
use crate::traits::Destructible;

#[derive(Derivative)]
#[derivative(Debug)]
struct LogicalDeviceInner {
    #[derivative(Debug = "ignore")]
    handle: ash::Device,
    /// Debug utils
    #[derivative(Debug = "ignore")]
    debug_utils: Option<ash::ext::debug_utils::Device>,
}

/// Effectively the same as [`ash::Device`], reference counted so every
/// resource wrapper can hold a cheap handle back to its device.
///
/// Destruction stays explicit through [`Destructible`]; dropping the last
/// clone never tears the device down on its own.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct LogicalDevice {
    inner: Arc<LogicalDeviceInner>,
}

impl PartialEq for LogicalDevice {
    fn eq(&self, other: &Self) -> bool {
        self.inner.handle.handle() == other.inner.handle.handle()
    }
}

impl Eq for LogicalDevice {}

pub struct LogicalDeviceCreateInfo<'a> {
    pub instance: &'a ash::Instance,
    pub physical_device: &'a PhysicalDevice,
    pub enable_debug_utils: bool,
}

impl LogicalDevice {
    pub fn new(create_info: LogicalDeviceCreateInfo) -> Result<Self> {
        let queue_families = create_info.physical_device.queue_families();
        let (graphics_family, present_family) = match (
            queue_families.graphics_family,
            queue_families.present_family,
        ) {
            (Some(graphics), Some(present)) => (graphics, present),
            _ => return Err(crate::RhiError::IncompleteQueueFamilies.into()),
        };

        let unique_families: HashSet<u32> =
            HashSet::from_iter([graphics_family, present_family]);
        let queue_priorities = [1.0f32];
        let queue_cis: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .into_iter()
            .map(|family_index| vk::DeviceQueueCreateInfo {
                s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
                p_next: ptr::null(),
                flags: vk::DeviceQueueCreateFlags::empty(),
                queue_family_index: family_index,
                queue_count: 1,
                p_queue_priorities: queue_priorities.as_ptr(),
                _marker: Default::default(),
            })
            .collect();

        let extensions_ptr: Vec<*const c_char> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();

        // sync2 drives every submission and barrier in this crate
        let mut vulkan_1_3_features = vk::PhysicalDeviceVulkan13Features {
            synchronization2: vk::TRUE,
            ..Default::default()
        };
        let features_2 = vk::PhysicalDeviceFeatures2 {
            s_type: vk::StructureType::PHYSICAL_DEVICE_FEATURES_2,
            p_next: &mut vulkan_1_3_features as *mut _ as *mut c_void,
            features: vk::PhysicalDeviceFeatures {
                sampler_anisotropy: vk::TRUE,
                ..Default::default()
            },
            _marker: Default::default(),
        };

        let handle = unsafe {
            create_info.instance.create_device(
                create_info.physical_device.handle(),
                &vk::DeviceCreateInfo {
                    s_type: vk::StructureType::DEVICE_CREATE_INFO,
                    p_next: &features_2 as *const _ as *const c_void,
                    flags: vk::DeviceCreateFlags::empty(),
                    queue_create_info_count: queue_cis.len() as u32,
                    p_queue_create_infos: queue_cis.as_ptr(),
                    enabled_layer_count: 0,
                    pp_enabled_layer_names: ptr::null(),
                    enabled_extension_count: extensions_ptr.len() as u32,
                    pp_enabled_extension_names: extensions_ptr.as_ptr(),
                    p_enabled_features: ptr::null(),
                    _marker: Default::default(),
                },
                None,
            )?
        };

        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Creating VkDevice {:p}", handle.handle());

        let debug_utils = create_info
            .enable_debug_utils
            .then(|| ash::ext::debug_utils::Device::new(create_info.instance, &handle));

        Ok(Self {
            inner: Arc::new(LogicalDeviceInner {
                handle,
                debug_utils,
            }),
        })
    }

    /// Get reference to the underlying [`ash::Device`]
    pub fn get_handle(&self) -> &ash::Device {
        &self.inner.handle
    }

    /// Acquire a [`vk::Queue`]
    pub fn get_queue(&self, family_index: u32, index: u32) -> vk::Queue {
        unsafe { self.inner.handle.get_device_queue(family_index, index) }
    }

    /// Get debug utils with the device
    pub fn get_debug_utils(&self) -> Option<&ash::ext::debug_utils::Device> {
        self.inner.debug_utils.as_ref()
    }

    /// Blocks until every queue on the device has gone idle
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.inner.handle.device_wait_idle()? }
        Ok(())
    }
}

impl Destructible for LogicalDevice {
    /// **Safety:** the device must not be referenced again after this; every
    /// clone shares the same now-dead handle.
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkDevice {:p}", self.inner.handle.handle());

        unsafe {
            self.inner.handle.destroy_device(None);
        }
    }
}
