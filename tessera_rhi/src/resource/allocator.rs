use std::ptr;

use anyhow::{ensure, Result};
use ash::vk;

use crate::resource::buffer::{Buffer, BufferCreateInfo};
use crate::resource::image::{transition_masks, Image, ImageCreateInfo, ImageDesc};
use crate::resource::image_view::{view_create_info, ImageView, ImageViewCreateInfo};
use crate::resource::traits::Resource;
use crate::traits::Destructible;
use crate::util::TransientCommands;

/// Creates and destroys GPU resources and runs the synchronous upload path:
/// staging transfers, layout transitions, mipmap generation, copies.
///
/// Callers own the returned resources and must not destroy them while an
/// in-flight frame may still reference them; the allocator does no usage
/// tracking of its own.
pub struct ResourceAllocator {
    device: crate::device::LogicalDevice,
    physical_device: crate::device::PhysicalDevice,
    transient: TransientCommands,
}

impl ResourceAllocator {
    pub fn new(
        physical_device: &crate::device::PhysicalDevice,
        device: crate::device::LogicalDevice,
        queue: crate::device::Queue,
    ) -> Result<Self> {
        let transient = TransientCommands::new(device.clone(), queue)?;
        Ok(Self {
            device,
            physical_device: physical_device.clone(),
            transient,
        })
    }

    pub fn create_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        required_memory: vk::MemoryPropertyFlags,
    ) -> Result<Buffer> {
        Buffer::new(BufferCreateInfo::NewEmpty {
            device: self.device.clone(),
            memory_properties: self.physical_device.memory_properties(),
            size,
            usage,
            required_memory,
        })
    }

    /// Create a buffer and fill it with `data`.
    ///
    /// Host-visible destinations are written through a direct mapping;
    /// device-local destinations go through a mapped staging buffer and a
    /// transient copy.
    pub fn create_buffer_init(
        &self,
        usage: vk::BufferUsageFlags,
        required_memory: vk::MemoryPropertyFlags,
        size: vk::DeviceSize,
        data: Option<&[u8]>,
    ) -> Result<Buffer> {
        if required_memory.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
            let buffer = self.create_buffer(size, usage, required_memory)?;
            if let Some(data) = data {
                buffer.write_bytes(0, data)?;
            }
            return Ok(buffer);
        }

        let buffer = self.create_buffer(
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            required_memory,
        )?;
        if let Some(data) = data {
            let mut staging = self.create_buffer(
                data.len() as vk::DeviceSize,
                vk::BufferUsageFlags::TRANSFER_SRC,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )?;
            staging.write_bytes(0, data)?;
            self.copy_buffer(&staging, &buffer, 0, 0, data.len() as vk::DeviceSize)?;
            staging.destroy();
        }
        Ok(buffer)
    }

    pub fn create_image(&self, desc: ImageDesc) -> Result<Image> {
        Image::new(ImageCreateInfo::NewAllocated {
            device: self.device.clone(),
            memory_properties: self.physical_device.memory_properties(),
            desc,
        })
    }

    pub fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
        view_type: vk::ImageViewType,
        layer_count: u32,
        mip_levels: u32,
    ) -> Result<ImageView> {
        ImageView::new(ImageViewCreateInfo::FromCreateInfo {
            device: self.device.clone(),
            create_info: view_create_info(
                image,
                format,
                aspect_mask,
                view_type,
                layer_count,
                mip_levels,
            ),
        })
    }

    /// Insert a layout transition barrier on a transient command buffer and
    /// wait for it to retire
    pub fn transition_image_layout(
        &self,
        image: vk::Image,
        from: vk::ImageLayout,
        to: vk::ImageLayout,
        layer_count: u32,
        mip_levels: u32,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Result<()> {
        // resolve the masks first so an unsupported pair never submits
        let masks = transition_masks(from, to)?;
        self.transient.submit(|device, cmd| {
            let barrier = image_barrier(
                image,
                masks,
                from,
                to,
                vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: 0,
                    level_count: mip_levels,
                    base_array_layer: 0,
                    layer_count,
                },
            );
            record_barrier(device, cmd, &barrier);
        })
    }

    pub fn copy_buffer(
        &self,
        src: &Buffer,
        dst: &Buffer,
        src_offset: vk::DeviceSize,
        dst_offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> Result<()> {
        let src = src.handle();
        let dst = dst.handle();
        self.transient.submit(move |device, cmd| {
            let region = vk::BufferCopy {
                src_offset,
                dst_offset,
                size,
            };
            unsafe {
                device.get_handle().cmd_copy_buffer(cmd, src, dst, &[region]);
            }
        })
    }

    /// Copy a packed buffer into mip level 0 of an image sitting in
    /// TRANSFER_DST_OPTIMAL
    pub fn copy_buffer_to_image(
        &self,
        buffer: &Buffer,
        image: &Image,
        width: u32,
        height: u32,
        layer_count: u32,
    ) -> Result<()> {
        let buffer = buffer.handle();
        let image = image.handle();
        self.transient.submit(move |device, cmd| {
            let region = vk::BufferImageCopy {
                buffer_offset: 0,
                buffer_row_length: 0,
                buffer_image_height: 0,
                image_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count,
                },
                image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                image_extent: vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                },
            };
            unsafe {
                device.get_handle().cmd_copy_buffer_to_image(
                    cmd,
                    buffer,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }
        })
    }

    /// Fill the mip chain by repeatedly blitting level k into level k + 1.
    ///
    /// Expects every level in TRANSFER_DST_OPTIMAL; leaves the whole chain
    /// in SHADER_READ_ONLY_OPTIMAL.
    pub fn generate_mipmaps(
        &self,
        image: &Image,
        format: vk::Format,
        width: u32,
        height: u32,
        layers: u32,
        mip_levels: u32,
    ) -> Result<()> {
        let format_properties = self.physical_device.format_properties(format);
        if !format_properties
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
        {
            return Err(crate::RhiError::LinearBlitUnsupported(format).into());
        }

        let dst_to_src = transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        )?;
        let src_to_shader = transition_masks(
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )?;
        let dst_to_shader = transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )?;

        let image = image.handle();
        let blits = mip_blit_regions(width, height, layers, mip_levels);
        self.transient.submit(move |device, cmd| {
            for (index, blit) in blits.into_iter().enumerate() {
                let level = index as u32;
                let level_range = vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: level,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: layers,
                };

                // level k becomes the blit source
                let barrier = image_barrier(
                    image,
                    dst_to_src,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    level_range,
                );
                record_barrier(device, cmd, &barrier);

                let blit_info = vk::BlitImageInfo2 {
                    s_type: vk::StructureType::BLIT_IMAGE_INFO_2,
                    p_next: ptr::null(),
                    src_image: image,
                    src_image_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    dst_image: image,
                    dst_image_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    region_count: 1,
                    p_regions: &blit,
                    filter: vk::Filter::LINEAR,
                    _marker: Default::default(),
                };
                unsafe {
                    device.get_handle().cmd_blit_image2(cmd, &blit_info);
                }

                // completed level moves over to sampling
                let barrier = image_barrier(
                    image,
                    src_to_shader,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    level_range,
                );
                record_barrier(device, cmd, &barrier);
            }

            // the last level was only ever a blit destination
            let barrier = image_barrier(
                image,
                dst_to_shader,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: mip_levels.saturating_sub(1),
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: layers,
                },
            );
            record_barrier(device, cmd, &barrier);
        })
    }

    /// Upload pixel data into a freshly created, fully mipmapped, sampled
    /// 2D image
    pub fn upload_texture(
        &self,
        width: u32,
        height: u32,
        pixels: &[u8],
        format: vk::Format,
        mip_levels: Option<u32>,
    ) -> Result<(Image, ImageView)> {
        let byte_size = texel_size(format)? * width as vk::DeviceSize * height as vk::DeviceSize;
        ensure!(
            pixels.len() as vk::DeviceSize == byte_size,
            "texture upload expected {} bytes, got {}",
            byte_size,
            pixels.len()
        );
        let mip_levels = mip_levels.unwrap_or_else(|| crate::util::mip_level_count(width, height));

        let mut staging = self.create_buffer(
            byte_size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_bytes(0, pixels)?;

        let image = self.create_image(ImageDesc {
            width,
            height,
            format,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: vk::ImageUsageFlags::SAMPLED
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::TRANSFER_SRC,
            required_memory: vk::MemoryPropertyFlags::DEVICE_LOCAL,
            flags: vk::ImageCreateFlags::empty(),
            array_layers: 1,
            mip_levels,
        })?;

        self.transition_image_layout(
            image.handle(),
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            1,
            mip_levels,
            vk::ImageAspectFlags::COLOR,
        )?;
        self.copy_buffer_to_image(&staging, &image, width, height, 1)?;
        self.generate_mipmaps(&image, format, width, height, 1, mip_levels)?;
        staging.destroy();

        let view = self.create_image_view(
            image.handle(),
            format,
            vk::ImageAspectFlags::COLOR,
            vk::ImageViewType::TYPE_2D,
            1,
            mip_levels,
        )?;
        Ok((image, view))
    }

    /// Upload six faces into a cube-compatible image with a full mip chain
    pub fn upload_cube_map(
        &self,
        width: u32,
        height: u32,
        faces: &[&[u8]; 6],
        format: vk::Format,
        mip_levels: u32,
    ) -> Result<(Image, ImageView)> {
        let layer_size = texel_size(format)? * width as vk::DeviceSize * height as vk::DeviceSize;
        for face in faces {
            ensure!(
                face.len() as vk::DeviceSize == layer_size,
                "cube face expected {} bytes, got {}",
                layer_size,
                face.len()
            );
        }

        let mut staging = self.create_buffer(
            layer_size * 6,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        for (index, face) in faces.iter().enumerate() {
            staging.write_bytes(layer_size * index as vk::DeviceSize, face)?;
        }

        let image = self.create_image(ImageDesc {
            width,
            height,
            format,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: vk::ImageUsageFlags::SAMPLED
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::TRANSFER_SRC,
            required_memory: vk::MemoryPropertyFlags::DEVICE_LOCAL,
            flags: vk::ImageCreateFlags::CUBE_COMPATIBLE,
            array_layers: 6,
            mip_levels,
        })?;

        self.transition_image_layout(
            image.handle(),
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            6,
            mip_levels,
            vk::ImageAspectFlags::COLOR,
        )?;
        self.copy_buffer_to_image(&staging, &image, width, height, 6)?;
        self.generate_mipmaps(&image, format, width, height, 6, mip_levels)?;
        staging.destroy();

        let view = self.create_image_view(
            image.handle(),
            format,
            vk::ImageAspectFlags::COLOR,
            vk::ImageViewType::CUBE,
            6,
            mip_levels,
        )?;
        Ok((image, view))
    }
}

impl Destructible for ResourceAllocator {
    fn destroy(&mut self) {
        self.transient.destroy();
    }
}

/// Bytes per texel for the formats the upload path accepts
pub fn texel_size(format: vk::Format) -> Result<vk::DeviceSize, crate::RhiError> {
    match format {
        vk::Format::R8G8B8_UNORM | vk::Format::R8G8B8_SRGB => Ok(3),
        vk::Format::R8G8B8A8_UNORM | vk::Format::R8G8B8A8_SRGB => Ok(4),
        vk::Format::R32_SFLOAT => Ok(4),
        vk::Format::R32G32_SFLOAT => Ok(8),
        vk::Format::R32G32B32_SFLOAT => Ok(12),
        vk::Format::R32G32B32A32_SFLOAT => Ok(16),
        other => Err(crate::RhiError::UnsupportedTexelFormat(other)),
    }
}

/// One blit per generated level: level k shrinks into level k + 1
pub(crate) fn mip_blit_regions(
    width: u32,
    height: u32,
    layers: u32,
    mip_levels: u32,
) -> Vec<vk::ImageBlit2<'static>> {
    (0..mip_levels.saturating_sub(1))
        .map(|level| vk::ImageBlit2 {
            s_type: vk::StructureType::IMAGE_BLIT_2,
            p_next: ptr::null(),
            src_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level,
                base_array_layer: 0,
                layer_count: layers,
            },
            src_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: ((width >> level).max(1)) as i32,
                    y: ((height >> level).max(1)) as i32,
                    z: 1,
                },
            ],
            dst_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level + 1,
                base_array_layer: 0,
                layer_count: layers,
            },
            dst_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: ((width >> (level + 1)).max(1)) as i32,
                    y: ((height >> (level + 1)).max(1)) as i32,
                    z: 1,
                },
            ],
            _marker: Default::default(),
        })
        .collect()
}

fn image_barrier(
    image: vk::Image,
    masks: crate::resource::image::TransitionMasks,
    from: vk::ImageLayout,
    to: vk::ImageLayout,
    subresource_range: vk::ImageSubresourceRange,
) -> vk::ImageMemoryBarrier2<'static> {
    vk::ImageMemoryBarrier2 {
        s_type: vk::StructureType::IMAGE_MEMORY_BARRIER_2,
        p_next: ptr::null(),
        src_stage_mask: masks.src_stage,
        src_access_mask: masks.src_access,
        dst_stage_mask: masks.dst_stage,
        dst_access_mask: masks.dst_access,
        old_layout: from,
        new_layout: to,
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image,
        subresource_range,
        _marker: Default::default(),
    }
}

fn record_barrier(
    device: &crate::device::LogicalDevice,
    cmd: vk::CommandBuffer,
    barrier: &vk::ImageMemoryBarrier2,
) {
    let dependency_info = vk::DependencyInfo {
        s_type: vk::StructureType::DEPENDENCY_INFO,
        p_next: ptr::null(),
        dependency_flags: vk::DependencyFlags::empty(),
        memory_barrier_count: 0,
        p_memory_barriers: ptr::null(),
        buffer_memory_barrier_count: 0,
        p_buffer_memory_barriers: ptr::null(),
        image_memory_barrier_count: 1,
        p_image_memory_barriers: barrier,
        _marker: Default::default(),
    };
    unsafe {
        device
            .get_handle()
            .cmd_pipeline_barrier2(cmd, &dependency_info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_levels_take_four_blits() {
        let blits = mip_blit_regions(64, 64, 1, 5);
        assert_eq!(blits.len(), 4);
        for (index, blit) in blits.iter().enumerate() {
            assert_eq!(blit.src_subresource.mip_level, index as u32);
            assert_eq!(blit.dst_subresource.mip_level, index as u32 + 1);
        }
    }

    #[test]
    fn blit_extents_halve_and_clamp_to_one() {
        let blits = mip_blit_regions(8, 2, 1, 4);
        assert_eq!((blits[0].src_offsets[1].x, blits[0].src_offsets[1].y), (8, 2));
        assert_eq!((blits[0].dst_offsets[1].x, blits[0].dst_offsets[1].y), (4, 1));
        // height bottoms out at 1 while width keeps halving
        assert_eq!((blits[2].src_offsets[1].x, blits[2].src_offsets[1].y), (2, 1));
        assert_eq!((blits[2].dst_offsets[1].x, blits[2].dst_offsets[1].y), (1, 1));
    }

    #[test]
    fn single_level_needs_no_blits() {
        assert!(mip_blit_regions(256, 256, 1, 1).is_empty());
        assert!(mip_blit_regions(256, 256, 1, 0).is_empty());
    }

    #[test]
    fn cube_blits_cover_every_layer() {
        let blits = mip_blit_regions(16, 16, 6, 3);
        assert!(blits
            .iter()
            .all(|blit| blit.src_subresource.layer_count == 6
                && blit.dst_subresource.layer_count == 6));
    }

    #[test]
    fn texel_sizes_match_their_formats() {
        assert_eq!(texel_size(vk::Format::R8G8B8A8_SRGB).unwrap(), 4);
        assert_eq!(texel_size(vk::Format::R32G32B32A32_SFLOAT).unwrap(), 16);
        assert_eq!(
            texel_size(vk::Format::D32_SFLOAT),
            Err(crate::RhiError::UnsupportedTexelFormat(vk::Format::D32_SFLOAT))
        );
    }
}
