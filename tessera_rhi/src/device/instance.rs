use std::ffi::{c_char, CString};
use std::ptr;

use anyhow::Result;
use ash::vk;
use derivative::Derivative;
use raw_window_handle::RawDisplayHandle;

use crate::traits::Destructible;

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

pub struct InstanceCreateInfo<'a> {
    pub app_name: &'a str,
    pub display_handle: RawDisplayHandle,
    pub enable_validation: bool,
}

/// Represents a Vulkan Instance
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Instance {
    #[derivative(Debug = "ignore")]
    entry: ash::Entry,
    #[derivative(Debug = "ignore")]
    handle: ash::Instance,
    validation_enabled: bool,
}

impl Instance {
    pub fn new(create_info: InstanceCreateInfo) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let application_name = CString::new(create_info.app_name)?;
        let engine_name = CString::new("tessera")?;
        let application_info = vk::ApplicationInfo {
            s_type: vk::StructureType::APPLICATION_INFO,
            p_next: ptr::null(),
            p_application_name: application_name.as_ptr(),
            application_version: vk::make_api_version(0, 0, 1, 0),
            p_engine_name: engine_name.as_ptr(),
            engine_version: vk::make_api_version(0, 0, 1, 0),
            api_version: vk::API_VERSION_1_3,
            _marker: Default::default(),
        };

        let mut layers: Vec<CString> = Vec::new();
        let mut validation_enabled = false;
        if create_info.enable_validation {
            if Self::validation_layer_available(&entry)? {
                layers.push(CString::new(VALIDATION_LAYER)?);
                validation_enabled = true;
            } else {
                tracing::warn!(
                    "validation requested, but {} is not installed",
                    VALIDATION_LAYER
                );
            }
        }

        let mut extensions: Vec<CString> =
            ash_window::enumerate_required_extensions(create_info.display_handle)?
                .iter()
                .map(|ext| crate::util::wrap_c_str(*ext))
                .collect();
        if validation_enabled {
            extensions.push(crate::util::wrap_c_str(ash::ext::debug_utils::NAME.as_ptr()));
        }

        let layers_ptr: Vec<*const c_char> = layers.iter().map(|s| s.as_ptr()).collect();
        let extensions_ptr: Vec<*const c_char> = extensions.iter().map(|s| s.as_ptr()).collect();
        let handle = unsafe {
            entry.create_instance(
                &vk::InstanceCreateInfo {
                    s_type: vk::StructureType::INSTANCE_CREATE_INFO,
                    p_next: ptr::null(),
                    flags: vk::InstanceCreateFlags::empty(),
                    p_application_info: &application_info,
                    enabled_layer_count: layers_ptr.len() as u32,
                    pp_enabled_layer_names: layers_ptr.as_ptr(),
                    enabled_extension_count: extensions_ptr.len() as u32,
                    pp_enabled_extension_names: extensions_ptr.as_ptr(),
                    _marker: Default::default(),
                },
                None,
            )?
        };

        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Creating VkInstance {:p}", handle.handle());

        Ok(Self {
            entry,
            handle,
            validation_enabled,
        })
    }

    fn validation_layer_available(entry: &ash::Entry) -> Result<bool> {
        let available = unsafe { entry.enumerate_instance_layer_properties()? };
        Ok(available.iter().any(|layer| {
            crate::util::wrap_c_str(layer.layer_name.as_ptr())
                .to_string_lossy()
                .as_ref()
                == VALIDATION_LAYER
        }))
    }

    /// Get the [`ash::Entry`]
    pub fn get_entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Get the [`ash::Instance`]
    pub fn get_instance(&self) -> &ash::Instance {
        &self.handle
    }

    /// Whether the validation layer was actually enabled
    pub fn validation_enabled(&self) -> bool {
        self.validation_enabled
    }
}

impl Destructible for Instance {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkInstance {:p}", self.handle.handle());

        unsafe {
            self.handle.destroy_instance(None);
        }
    }
}
