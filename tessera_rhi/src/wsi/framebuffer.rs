use std::ptr;

use anyhow::Result;
use ash::vk;

use crate::traits::Destructible;

#[derive(Debug, Clone)]
pub struct Framebuffer {
    handle: vk::Framebuffer,
    device: crate::device::LogicalDevice,
}

impl Framebuffer {
    pub fn new(
        device: crate::device::LogicalDevice,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let handle = unsafe {
            device.get_handle().create_framebuffer(
                &vk::FramebufferCreateInfo {
                    s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
                    p_next: ptr::null(),
                    flags: vk::FramebufferCreateFlags::empty(),
                    render_pass,
                    attachment_count: attachments.len() as u32,
                    p_attachments: attachments.as_ptr(),
                    width: extent.width,
                    height: extent.height,
                    layers: 1,
                    _marker: Default::default(),
                },
                None,
            )?
        };

        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Creating VkFramebuffer {:p}", handle);

        Ok(Self { handle, device })
    }

    pub fn get_handle(&self) -> &vk::Framebuffer {
        &self.handle
    }

    pub fn handle(&self) -> vk::Framebuffer {
        self.handle
    }
}

impl Destructible for Framebuffer {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkFramebuffer {:p}", self.handle);

        unsafe {
            self.device
                .get_handle()
                .destroy_framebuffer(self.handle, None);
        }
    }
}
