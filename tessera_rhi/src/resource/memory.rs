use std::ptr;

use anyhow::Result;
use ash::vk;

use crate::traits::Destructible;

/// One device memory block backing a buffer or image.
///
/// Allocations are exact: one `vkAllocateMemory` per resource, sized by its
/// memory requirements, with no pooling or defragmentation behind it.
#[derive(Debug, Clone)]
pub struct DeviceMemory {
    handle: vk::DeviceMemory,
    device: crate::device::LogicalDevice,
    size: vk::DeviceSize,
    properties: vk::MemoryPropertyFlags,
}

impl DeviceMemory {
    pub fn allocate(
        device: crate::device::LogicalDevice,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        requirements: vk::MemoryRequirements,
        required: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        let memory_type_index =
            find_memory_type(memory_properties, requirements.memory_type_bits, required)
                .ok_or(crate::RhiError::NoCompatibleMemoryType)?;
        let handle = unsafe {
            device.get_handle().allocate_memory(
                &vk::MemoryAllocateInfo {
                    s_type: vk::StructureType::MEMORY_ALLOCATE_INFO,
                    p_next: ptr::null(),
                    allocation_size: requirements.size,
                    memory_type_index,
                    _marker: Default::default(),
                },
                None,
            )?
        };

        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Allocating VkDeviceMemory {:p}", handle);

        Ok(Self {
            handle,
            device,
            size: requirements.size,
            properties: required,
        })
    }

    pub fn get_handle(&self) -> &vk::DeviceMemory {
        &self.handle
    }

    pub fn handle(&self) -> vk::DeviceMemory {
        self.handle
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn is_host_visible(&self) -> bool {
        self.properties
            .contains(vk::MemoryPropertyFlags::HOST_VISIBLE)
    }

    /// Map, copy, unmap. Only valid on host-visible allocations.
    pub fn write_bytes(&self, offset: vk::DeviceSize, data: &[u8]) -> Result<()> {
        if !self.is_host_visible() {
            return Err(crate::RhiError::MemoryNotHostVisible.into());
        }
        unsafe {
            let mapped = self.device.get_handle().map_memory(
                self.handle,
                offset,
                data.len() as vk::DeviceSize,
                vk::MemoryMapFlags::empty(),
            )?;
            ptr::copy_nonoverlapping::<u8>(data.as_ptr(), mapped as *mut u8, data.len());
            self.device.get_handle().unmap_memory(self.handle);
        }
        Ok(())
    }
}

impl Destructible for DeviceMemory {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Freeing VkDeviceMemory {:p}", self.handle);

        unsafe {
            self.device.get_handle().free_memory(self.handle, None);
        }
    }
}

/// Index of the first memory type allowed by `type_filter` whose property
/// flags contain all of `required`
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..memory_properties.memory_type_count).find(|&index| {
        type_filter & (1 << index) != 0
            && memory_properties.memory_types[index as usize]
                .property_flags
                .contains(required)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (index, &property_flags) in flags.iter().enumerate() {
            properties.memory_types[index] = vk::MemoryType {
                property_flags,
                heap_index: 0,
            };
        }
        properties
    }

    #[test]
    fn picks_first_matching_type() {
        let properties = synthetic_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);
        assert_eq!(
            find_memory_type(
                &properties,
                0b111,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
            ),
            Some(1)
        );
    }

    #[test]
    fn respects_the_type_filter() {
        let properties = synthetic_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);
        // requirements exclude type 0, so only type 1 qualifies
        assert_eq!(
            find_memory_type(&properties, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Some(1)
        );
    }

    #[test]
    fn no_candidate_returns_none() {
        let properties = synthetic_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        assert_eq!(
            find_memory_type(&properties, 0b1, vk::MemoryPropertyFlags::HOST_VISIBLE),
            None
        );
    }
}
