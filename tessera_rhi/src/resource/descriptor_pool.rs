use std::ptr;

use anyhow::Result;
use ash::vk;

use crate::resource::traits::Resource;
use crate::traits::Destructible;

/// Fixed-capacity descriptor pool.
///
/// There is no fallback pool; running out of sets is surfaced to the caller
/// as the underlying `vk::Result` error.
#[derive(Debug, Clone)]
pub struct DescriptorPool {
    handle: vk::DescriptorPool,
    device: crate::device::LogicalDevice,
}

pub enum DescriptorPoolCreateInfo {
    /// Allocate a pool from descriptor pool sizes
    FromPoolSizes {
        device: crate::device::LogicalDevice,
        sizes: Vec<vk::DescriptorPoolSize>,
        flags: vk::DescriptorPoolCreateFlags,
        max_sets: u32,
    },
}

impl DescriptorPool {
    /// Allocate one descriptor set per layout passed in
    pub fn allocate_sets(
        &self,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>> {
        Ok(unsafe {
            self.device
                .get_handle()
                .allocate_descriptor_sets(&vk::DescriptorSetAllocateInfo {
                    s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
                    p_next: ptr::null(),
                    descriptor_pool: self.handle,
                    descriptor_set_count: layouts.len() as u32,
                    p_set_layouts: layouts.as_ptr(),
                    _marker: Default::default(),
                })?
        })
    }
}

impl<'a> Resource<'a> for DescriptorPool {
    type CreateInfo = DescriptorPoolCreateInfo;
    type HandleType = vk::DescriptorPool;

    fn new(create_info: Self::CreateInfo) -> Result<Self> {
        match create_info {
            DescriptorPoolCreateInfo::FromPoolSizes {
                device,
                sizes,
                flags,
                max_sets,
            } => {
                let handle = unsafe {
                    device.get_handle().create_descriptor_pool(
                        &vk::DescriptorPoolCreateInfo {
                            s_type: vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO,
                            p_next: ptr::null(),
                            flags,
                            max_sets,
                            pool_size_count: sizes.len() as u32,
                            p_pool_sizes: sizes.as_ptr(),
                            _marker: Default::default(),
                        },
                        None,
                    )?
                };

                #[cfg(feature = "log-lifetimes")]
                tracing::trace!("Creating VkDescriptorPool {:p}", handle);

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

impl Destructible for DescriptorPool {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkDescriptorPool {:p}", self.handle);

        unsafe {
            self.device
                .get_handle()
                .destroy_descriptor_pool(self.handle, None);
        }
    }
}
