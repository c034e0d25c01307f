use std::ptr;

use anyhow::Result;
use ash::vk;

use crate::resource::traits::Resource;
use crate::traits::Destructible;

#[derive(Debug, Clone)]
pub struct ImageView {
    handle: vk::ImageView,
    device: crate::device::LogicalDevice,
}

pub enum ImageViewCreateInfo<'a> {
    /// Creates an image view from an existing [`VkImageViewCreateInfo`](vk::ImageViewCreateInfo)
    FromCreateInfo {
        device: crate::device::LogicalDevice,
        create_info: vk::ImageViewCreateInfo<'a>,
    },
}

/// Builds the create info every view in this crate uses: identity swizzle,
/// base mip/layer zero, the full requested range.
pub fn view_create_info(
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
    view_type: vk::ImageViewType,
    layer_count: u32,
    mip_levels: u32,
) -> vk::ImageViewCreateInfo<'static> {
    vk::ImageViewCreateInfo {
        s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
        p_next: ptr::null(),
        flags: vk::ImageViewCreateFlags::empty(),
        image,
        view_type,
        format,
        components: Default::default(),
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: mip_levels,
            base_array_layer: 0,
            layer_count,
        },
        _marker: Default::default(),
    }
}

impl<'a> Resource<'a> for ImageView {
    type CreateInfo = ImageViewCreateInfo<'a>;
    type HandleType = vk::ImageView;

    fn new(create_info: Self::CreateInfo) -> Result<Self> {
        match create_info {
            ImageViewCreateInfo::FromCreateInfo {
                device,
                create_info,
            } => {
                let handle = unsafe {
                    device.get_handle().create_image_view(&create_info, None)?
                };

                #[cfg(feature = "log-lifetimes")]
                tracing::trace!("Creating VkImageView {:p}", handle);

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

impl Destructible for ImageView {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkImageView {:p}", self.handle);

        unsafe {
            self.device
                .get_handle()
                .destroy_image_view(self.handle, None);
        }
    }
}
