use std::ptr;

use anyhow::Result;
use ash::vk;
use derivative::Derivative;

use crate::traits::Destructible;

/// Represents a [`VkDebugUtilsMessengerEXT`](ash::ext::debug_utils)
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DebugMessenger {
    #[derivative(Debug = "ignore")]
    handle: vk::DebugUtilsMessengerEXT,
    #[derivative(Debug = "ignore")]
    ext: ash::ext::debug_utils::Instance,
}

impl DebugMessenger {
    pub fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let ext = ash::ext::debug_utils::Instance::new(entry, instance);
        let debug_ci = vk::DebugUtilsMessengerCreateInfoEXT {
            s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
            p_next: ptr::null(),
            flags: vk::DebugUtilsMessengerCreateFlagsEXT::empty(),
            message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            pfn_user_callback: Some(vk_debug_callback),
            p_user_data: ptr::null_mut(),
            _marker: Default::default(),
        };
        let handle = unsafe { ext.create_debug_utils_messenger(&debug_ci, None)? };

        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Creating VkDebugUtilsMessenger {:p}", handle);

        Ok(Self { handle, ext })
    }
}

impl Destructible for DebugMessenger {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkDebugUtilsMessenger {:p}", self.handle);

        unsafe { self.ext.destroy_debug_utils_messenger(self.handle, None) }
    }
}

/// The messenger callback. It only ever logs; validation output must not be
/// able to alter control flow or abort the process.
extern "system" fn vk_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    msg_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let callback_data = unsafe { *p_callback_data };
    let message_id_name = crate::util::wrap_c_str(callback_data.p_message_id_name)
        .to_string_lossy()
        .into_owned();
    let message = crate::util::wrap_c_str(callback_data.p_message)
        .to_string_lossy()
        .into_owned();

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!("[{:?}] {}: {}", msg_type, message_id_name, message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!("[{:?}] {}: {}", msg_type, message_id_name, message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        tracing::info!("[{:?}] {}: {}", msg_type, message_id_name, message);
    } else {
        tracing::debug!("[{:?}] {}: {}", msg_type, message_id_name, message);
    }

    vk::FALSE
}
