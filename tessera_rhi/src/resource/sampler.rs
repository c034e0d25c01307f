use anyhow::Result;
use ash::vk;

use crate::resource::traits::Resource;
use crate::traits::Destructible;

#[derive(Debug, Clone)]
pub struct Sampler {
    handle: vk::Sampler,
    device: crate::device::LogicalDevice,
}

pub enum SamplerCreateInfo<'a> {
    /// Creates a sampler from an existing [`VkSamplerCreateInfo`](vk::SamplerCreateInfo)
    FromCreateInfo {
        device: crate::device::LogicalDevice,
        create_info: vk::SamplerCreateInfo<'a>,
    },
}

impl<'a> Resource<'a> for Sampler {
    type CreateInfo = SamplerCreateInfo<'a>;
    type HandleType = vk::Sampler;

    fn new(create_info: Self::CreateInfo) -> Result<Self> {
        match create_info {
            SamplerCreateInfo::FromCreateInfo {
                device,
                create_info,
            } => {
                let handle = unsafe { device.get_handle().create_sampler(&create_info, None)? };

                #[cfg(feature = "log-lifetimes")]
                tracing::trace!("Creating VkSampler {:p}", handle);

                Ok(Self { handle, device })
            }
        }
    }

    fn get_handle(&self) -> &Self::HandleType {
        &self.handle
    }

    fn handle(&self) -> Self::HandleType {
        self.handle
    }

    fn get_device(&self) -> &crate::device::LogicalDevice {
        &self.device
    }
}

impl Destructible for Sampler {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkSampler {:p}", self.handle);

        unsafe {
            self.device.get_handle().destroy_sampler(self.handle, None);
        }
    }
}
