use std::ptr;

use anyhow::Result;
use ash::prelude::VkResult;
use ash::vk;
use derivative::Derivative;

use crate::device::QueueFamilyIndices;
use crate::traits::Destructible;
use crate::wsi::surface::SwapchainSupport;

/// Surface format the chain prefers before falling back to whatever the
/// surface lists first
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// A raw [`vk::SwapchainKHR`] with its chosen format, present mode, and
/// extent. Lifecycle (views, depth, framebuffers, recreation) lives on
/// [`SwapchainManager`](crate::wsi::SwapchainManager).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Swapchain {
    handle: vk::SwapchainKHR,
    #[derivative(Debug = "ignore")]
    ext: ash::khr::swapchain::Device,
    device: crate::device::LogicalDevice,

    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
}

pub struct SwapchainCreateInfo<'a> {
    pub instance: &'a ash::Instance,
    pub device: crate::device::LogicalDevice,
    pub surface: vk::SurfaceKHR,
    pub support: &'a SwapchainSupport,
    pub queue_families: QueueFamilyIndices,
    pub drawable_extent: vk::Extent2D,
}

impl Swapchain {
    pub fn new(create_info: SwapchainCreateInfo) -> Result<Self> {
        let (graphics_family, present_family) = match (
            create_info.queue_families.graphics_family,
            create_info.queue_families.present_family,
        ) {
            (Some(graphics), Some(present)) => (graphics, present),
            _ => return Err(crate::RhiError::IncompleteQueueFamilies.into()),
        };
        if create_info.support.formats.is_empty() || create_info.support.present_modes.is_empty() {
            return Err(crate::RhiError::NoSurfaceFormats.into());
        }

        let format = select_surface_format(&create_info.support.formats);
        let present_mode = select_present_mode(&create_info.support.present_modes);
        let extent = select_extent(
            &create_info.support.capabilities,
            create_info.drawable_extent,
        );
        let min_image_count = select_image_count(&create_info.support.capabilities);

        let family_indices = [graphics_family, present_family];
        let concurrent = graphics_family != present_family;
        let swapchain_ci = vk::SwapchainCreateInfoKHR {
            s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
            p_next: ptr::null(),
            flags: vk::SwapchainCreateFlagsKHR::empty(),
            surface: create_info.surface,
            min_image_count,
            image_format: format.format,
            image_color_space: format.color_space,
            image_extent: extent,
            image_array_layers: 1,
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            image_sharing_mode: if concurrent {
                vk::SharingMode::CONCURRENT
            } else {
                vk::SharingMode::EXCLUSIVE
            },
            queue_family_index_count: if concurrent { 2 } else { 0 },
            p_queue_family_indices: if concurrent {
                family_indices.as_ptr()
            } else {
                ptr::null()
            },
            pre_transform: create_info.support.capabilities.current_transform,
            composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            present_mode,
            clipped: vk::TRUE,
            old_swapchain: vk::SwapchainKHR::null(),
            _marker: Default::default(),
        };

        let ext = ash::khr::swapchain::Device::new(
            create_info.instance,
            create_info.device.get_handle(),
        );
        let handle = unsafe { ext.create_swapchain(&swapchain_ci, None)? };

        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Creating VkSwapchainKHR {:p}", handle);

        Ok(Self {
            handle,
            ext,
            device: create_info.device,
            format,
            present_mode,
            extent,
        })
    }

    /// Get the underlying [`VkSwapchainKHR`](vk::SwapchainKHR)
    pub fn get_handle(&self) -> &vk::SwapchainKHR {
        &self.handle
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    /// The images owned by the presentation engine; never destroy these
    pub fn images(&self) -> Result<Vec<vk::Image>> {
        Ok(unsafe { self.ext.get_swapchain_images(self.handle)? })
    }

    /// Acquire the next presentable image index. The `bool` reports the
    /// suboptimal condition.
    pub fn acquire_next_image(
        &self,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        unsafe {
            self.ext
                .acquire_next_image(self.handle, timeout, semaphore, vk::Fence::null())
        }
    }

    /// Present `image_index`, waiting on `wait_semaphore`. The `bool`
    /// reports the suboptimal condition.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> VkResult<bool> {
        let present_info = vk::PresentInfoKHR {
            s_type: vk::StructureType::PRESENT_INFO_KHR,
            p_next: ptr::null(),
            wait_semaphore_count: 1,
            p_wait_semaphores: &wait_semaphore,
            swapchain_count: 1,
            p_swapchains: &self.handle,
            p_image_indices: &image_index,
            p_results: ptr::null_mut(),
            _marker: Default::default(),
        };
        unsafe { self.ext.queue_present(queue, &present_info) }
    }

    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Destructible for Swapchain {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkSwapchainKHR {:p}", self.handle);

        unsafe {
            self.ext.destroy_swapchain(self.handle, None);
        }
    }
}

/// Prefer [`PREFERRED_SURFACE_FORMAT`], else take whatever the surface
/// lists first
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    available
        .iter()
        .copied()
        .find(|candidate| {
            candidate.format == PREFERRED_SURFACE_FORMAT.format
                && candidate.color_space == PREFERRED_SURFACE_FORMAT.color_space
        })
        .unwrap_or(available[0])
}

/// Prefer the low-latency MAILBOX mode; FIFO is the guaranteed fallback
pub fn select_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface dictates the extent when it reports a fixed one; otherwise
/// the drawable size is clamped into the supported range
pub fn select_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    drawable: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: drawable.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: drawable.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One image above the minimum so acquisition rarely blocks on the
/// presentation engine; `max_image_count == 0` means unbounded
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        count = capabilities.max_image_count;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(
        current: (u32, u32),
        min: (u32, u32),
        max: (u32, u32),
        image_counts: (u32, u32),
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: image_counts.0,
            max_image_count: image_counts.1,
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: min.0,
                height: min.1,
            },
            max_image_extent: vk::Extent2D {
                width: max.0,
                height: max.1,
            },
            ..Default::default()
        }
    }

    #[test]
    fn preferred_format_wins_when_available() {
        let available = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            PREFERRED_SURFACE_FORMAT,
        ];
        let selected = select_surface_format(&available);
        assert_eq!(selected.format, PREFERRED_SURFACE_FORMAT.format);
        assert_eq!(selected.color_space, PREFERRED_SURFACE_FORMAT.color_space);
    }

    #[test]
    fn format_falls_back_to_the_first_listed() {
        let available = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::R16G16B16A16_SFLOAT,
                color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
            },
        ];
        let selected = select_surface_format(&available);
        assert_eq!(selected.format, vk::Format::R8G8B8A8_SRGB);
    }

    #[test]
    fn mailbox_preferred_fifo_guaranteed() {
        assert_eq!(
            select_present_mode(&[
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::MAILBOX,
                vk::PresentModeKHR::IMMEDIATE,
            ]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            select_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn fixed_current_extent_is_authoritative() {
        let capabilities = capabilities((800, 600), (1, 1), (4096, 4096), (2, 8));
        assert_eq!(
            select_extent(
                &capabilities,
                vk::Extent2D {
                    width: 1920,
                    height: 1080
                }
            ),
            vk::Extent2D {
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn unbounded_extent_clamps_the_drawable_size() {
        let capabilities = capabilities((u32::MAX, u32::MAX), (200, 200), (1000, 1000), (2, 8));
        assert_eq!(
            select_extent(
                &capabilities,
                vk::Extent2D {
                    width: 1920,
                    height: 100
                }
            ),
            vk::Extent2D {
                width: 1000,
                height: 200
            }
        );
    }

    #[test]
    fn image_count_is_min_plus_one_clamped() {
        assert_eq!(
            select_image_count(&capabilities((0, 0), (0, 0), (0, 0), (2, 8))),
            3
        );
        assert_eq!(
            select_image_count(&capabilities((0, 0), (0, 0), (0, 0), (3, 3))),
            3
        );
        // zero max means the surface imposes no upper bound
        assert_eq!(
            select_image_count(&capabilities((0, 0), (0, 0), (0, 0), (4, 0))),
            5
        );
    }
}
