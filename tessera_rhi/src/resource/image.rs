use std::ptr;

use anyhow::Result;
use ash::vk;

use crate::resource::memory::DeviceMemory;
use crate::resource::traits::Resource;
use crate::traits::Destructible;

/// Parameters for a freshly allocated 2D image
#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: vk::Format,
    pub tiling: vk::ImageTiling,
    pub usage: vk::ImageUsageFlags,
    pub required_memory: vk::MemoryPropertyFlags,
    pub flags: vk::ImageCreateFlags,
    pub array_layers: u32,
    pub mip_levels: u32,
}

#[derive(Debug, Clone)]
pub struct Image {
    handle: vk::Image,
    device: crate::device::LogicalDevice,
    memory: Option<DeviceMemory>,
    format: vk::Format,
    extent: vk::Extent3D,
    usage: vk::ImageUsageFlags,
    mip_levels: u32,
    array_layers: u32,
}

pub enum ImageCreateInfo<'a> {
    /// Create a new image that has allocated memory
    NewAllocated {
        device: crate::device::LogicalDevice,
        memory_properties: &'a vk::PhysicalDeviceMemoryProperties,
        desc: ImageDesc,
    },
}

impl Image {
    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    pub fn usage(&self) -> vk::ImageUsageFlags {
        self.usage
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }
}

impl<'a> Resource<'a> for Image {
    type CreateInfo = ImageCreateInfo<'a>;
    type HandleType = vk::Image;

    fn new(create_info: Self::CreateInfo) -> Result<Self> {
        match create_info {
            ImageCreateInfo::NewAllocated {
                device,
                memory_properties,
                desc,
            } => {
                let extent = vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: 1,
                };
                let handle = unsafe {
                    device.get_handle().create_image(
                        &vk::ImageCreateInfo {
                            s_type: vk::StructureType::IMAGE_CREATE_INFO,
                            p_next: ptr::null(),
                            flags: desc.flags,
                            image_type: vk::ImageType::TYPE_2D,
                            format: desc.format,
                            extent,
                            mip_levels: desc.mip_levels,
                            array_layers: desc.array_layers,
                            samples: vk::SampleCountFlags::TYPE_1,
                            tiling: desc.tiling,
                            usage: desc.usage,
                            sharing_mode: vk::SharingMode::EXCLUSIVE,
                            queue_family_index_count: 0,
                            p_queue_family_indices: ptr::null(),
                            initial_layout: vk::ImageLayout::UNDEFINED,
                            _marker: Default::default(),
                        },
                        None,
                    )?
                };

                #[cfg(feature = "log-lifetimes")]
                tracing::trace!("Creating VkImage {:p}", handle);

                let requirements =
                    unsafe { device.get_handle().get_image_memory_requirements(handle) };
                let memory = DeviceMemory::allocate(
                    device.clone(),
                    memory_properties,
                    requirements,
                    desc.required_memory,
                )?;
                unsafe {
                    device
                        .get_handle()
                        .bind_image_memory(handle, memory.handle(), 0)?
                };

                Ok(Self {
                    handle,
                    device,
                    memory: Some(memory),
                    format: desc.format,
                    extent,
                    usage: desc.usage,
                    mip_levels: desc.mip_levels,
                    array_layers: desc.array_layers,
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

impl Destructible for Image {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkImage {:p}", self.handle);

        unsafe {
            self.device.get_handle().destroy_image(self.handle, None);
        }
        if let Some(mut memory) = self.memory.take() {
            memory.destroy();
        }
    }
}

/// The stage/access pairs a layout transition barrier must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionMasks {
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
}

/// Total over the transitions the upload and readback paths perform;
/// anything else is a caller bug surfaced as an error.
pub fn transition_masks(
    from: vk::ImageLayout,
    to: vk::ImageLayout,
) -> Result<TransitionMasks, crate::RhiError> {
    match (from, to) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => {
            Ok(TransitionMasks {
                src_stage: vk::PipelineStageFlags2::TOP_OF_PIPE,
                src_access: vk::AccessFlags2::empty(),
                dst_stage: vk::PipelineStageFlags2::TRANSFER,
                dst_access: vk::AccessFlags2::TRANSFER_WRITE,
            })
        }
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(TransitionMasks {
                src_stage: vk::PipelineStageFlags2::TRANSFER,
                src_access: vk::AccessFlags2::TRANSFER_WRITE,
                dst_stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
                dst_access: vk::AccessFlags2::SHADER_READ,
            })
        }
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL) => {
            Ok(TransitionMasks {
                src_stage: vk::PipelineStageFlags2::TRANSFER,
                src_access: vk::AccessFlags2::TRANSFER_WRITE,
                dst_stage: vk::PipelineStageFlags2::TRANSFER,
                dst_access: vk::AccessFlags2::TRANSFER_READ,
            })
        }
        (vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(TransitionMasks {
                src_stage: vk::PipelineStageFlags2::TRANSFER,
                src_access: vk::AccessFlags2::TRANSFER_READ,
                dst_stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
                dst_access: vk::AccessFlags2::SHADER_READ,
            })
        }
        (
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ) => Ok(TransitionMasks {
            src_stage: vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS,
            src_access: vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
            dst_stage: vk::PipelineStageFlags2::TRANSFER,
            dst_access: vk::AccessFlags2::TRANSFER_READ,
        }),
        (
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ) => Ok(TransitionMasks {
            src_stage: vk::PipelineStageFlags2::TRANSFER,
            src_access: vk::AccessFlags2::TRANSFER_READ,
            dst_stage: vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS,
            dst_access: vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
        }),
        (from, to) => Err(crate::RhiError::UnsupportedLayoutTransition { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_transitions_are_supported() {
        let masks = transition_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();
        assert_eq!(masks.src_access, vk::AccessFlags2::empty());
        assert_eq!(masks.dst_access, vk::AccessFlags2::TRANSFER_WRITE);

        let masks = transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);
    }

    #[test]
    fn mipmap_transition_stays_on_the_transfer_stage() {
        let masks = transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        )
        .unwrap();
        assert_eq!(masks.src_stage, vk::PipelineStageFlags2::TRANSFER);
        assert_eq!(masks.dst_stage, vk::PipelineStageFlags2::TRANSFER);
    }

    #[test]
    fn depth_readback_roundtrip_is_supported() {
        assert!(transition_masks(
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        )
        .is_ok());
        assert!(transition_masks(
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        )
        .is_ok());
    }

    #[test]
    fn unknown_pairs_are_rejected() {
        assert_eq!(
            transition_masks(
                vk::ImageLayout::GENERAL,
                vk::ImageLayout::PRESENT_SRC_KHR
            ),
            Err(crate::RhiError::UnsupportedLayoutTransition {
                from: vk::ImageLayout::GENERAL,
                to: vk::ImageLayout::PRESENT_SRC_KHR,
            })
        );
    }
}
