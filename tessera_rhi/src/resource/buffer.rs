use std::ptr;

use anyhow::Result;
use ash::vk;

use crate::resource::memory::DeviceMemory;
use crate::resource::traits::Resource;
use crate::traits::Destructible;

#[derive(Debug, Clone)]
pub struct Buffer {
    handle: vk::Buffer,
    device: crate::device::LogicalDevice,
    memory: Option<DeviceMemory>,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
}

pub enum BufferCreateInfo<'a> {
    /// Create a new empty buffer with the requested size
    NewEmpty {
        device: crate::device::LogicalDevice,
        memory_properties: &'a vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        required_memory: vk::MemoryPropertyFlags,
    },
}

impl Buffer {
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    pub fn memory(&self) -> Option<&DeviceMemory> {
        self.memory.as_ref()
    }

    /// Copy `data` into the backing allocation, mapping it in place.
    /// Requires a host-visible allocation.
    pub fn write_bytes(&self, offset: vk::DeviceSize, data: &[u8]) -> Result<()> {
        match self.memory.as_ref() {
            Some(memory) => memory.write_bytes(offset, data),
            None => Err(crate::RhiError::MemoryNotHostVisible.into()),
        }
    }
}

impl<'a> Resource<'a> for Buffer {
    type CreateInfo = BufferCreateInfo<'a>;
    type HandleType = vk::Buffer;

    fn new(create_info: Self::CreateInfo) -> Result<Self> {
        match create_info {
            BufferCreateInfo::NewEmpty {
                device,
                memory_properties,
                size,
                usage,
                required_memory,
            } => {
                let handle = unsafe {
                    device.get_handle().create_buffer(
                        &vk::BufferCreateInfo {
                            s_type: vk::StructureType::BUFFER_CREATE_INFO,
                            p_next: ptr::null(),
                            flags: vk::BufferCreateFlags::empty(),
                            size,
                            usage,
                            sharing_mode: vk::SharingMode::EXCLUSIVE,
                            queue_family_index_count: 0,
                            p_queue_family_indices: ptr::null(),
                            _marker: Default::default(),
                        },
                        None,
                    )?
                };

                #[cfg(feature = "log-lifetimes")]
                tracing::trace!("Creating VkBuffer {:p}", handle);

                let requirements =
                    unsafe { device.get_handle().get_buffer_memory_requirements(handle) };
                let memory = DeviceMemory::allocate(
                    device.clone(),
                    memory_properties,
                    requirements,
                    required_memory,
                )?;
                unsafe {
                    device
                        .get_handle()
                        .bind_buffer_memory(handle, memory.handle(), 0)?
                };

                Ok(Self {
                    handle,
                    device,
                    memory: Some(memory),
                    size,
                    usage,
                })
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

impl Destructible for Buffer {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkBuffer {:p}", self.handle);

        unsafe {
            self.device.get_handle().destroy_buffer(self.handle, None);
        }
        if let Some(mut memory) = self.memory.take() {
            memory.destroy();
        }
    }
}
