use anyhow::Result;
use ash::vk;

use crate::resource::image_view::view_create_info;
use crate::resource::traits::Resource;
use crate::resource::{Image, ImageCreateInfo, ImageDesc, ImageView, ImageViewCreateInfo};
use crate::traits::Destructible;
use crate::wsi::framebuffer::Framebuffer;
use crate::wsi::surface::Surface;
use crate::wsi::swapchain::{Swapchain, SwapchainCreateInfo};

/// Lifecycle of the presentable chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapchainState {
    Uninitialized,
    /// Chain, views, depth, and framebuffers exist and match the surface
    Live,
    /// The surface changed under us; recreate before the next acquire
    Stale,
    /// Terminal; only reached through [`SwapchainManager::destroy`]
    Destroyed,
}

/// Result of asking the presentation engine for an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Ready(u32),
    /// Usable this frame, but the chain no longer matches the surface
    Suboptimal(u32),
    OutOfDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

pub struct SwapchainManagerCreateInfo {
    pub device: crate::device::LogicalDevice,
    pub physical_device: crate::device::PhysicalDevice,
    /// Ownership of the surface moves to the manager; it is destroyed after
    /// the chain during teardown
    pub surface: Surface,
    /// Render pass the framebuffers target; owned by the caller and reused
    /// across recreations
    pub render_pass: vk::RenderPass,
    pub drawable_extent: vk::Extent2D,
}

/// Owns the swapchain and everything keyed to it: one view and framebuffer
/// per image plus the shared depth image.
///
/// Old image handles become unreachable on recreation because the manager
/// is their only owner.
pub struct SwapchainManager {
    device: crate::device::LogicalDevice,
    physical_device: crate::device::PhysicalDevice,
    surface: Surface,
    render_pass: vk::RenderPass,
    depth_format: vk::Format,

    swapchain: Option<Swapchain>,
    images: Vec<vk::Image>,
    image_views: Vec<ImageView>,
    depth_image: Option<Image>,
    depth_view: Option<ImageView>,
    framebuffers: Vec<Framebuffer>,
    extent: vk::Extent2D,

    state: SwapchainState,
}

impl SwapchainManager {
    pub fn new(create_info: SwapchainManagerCreateInfo) -> Result<Self> {
        let depth_format = create_info.physical_device.find_depth_format()?;
        let mut manager = Self {
            device: create_info.device,
            physical_device: create_info.physical_device,
            surface: create_info.surface,
            render_pass: create_info.render_pass,
            depth_format,
            swapchain: None,
            images: Vec::new(),
            image_views: Vec::new(),
            depth_image: None,
            depth_view: None,
            framebuffers: Vec::new(),
            extent: vk::Extent2D::default(),
            state: SwapchainState::Uninitialized,
        };
        manager.create_swapchain(create_info.drawable_extent)?;
        Ok(manager)
    }

    fn create_swapchain(&mut self, drawable_extent: vk::Extent2D) -> Result<()> {
        let support = self.surface.query_support(self.physical_device.handle())?;
        if support.formats.is_empty() || support.present_modes.is_empty() {
            return Err(crate::RhiError::NoSurfaceFormats.into());
        }

        let swapchain = Swapchain::new(SwapchainCreateInfo {
            instance: self.physical_device.instance(),
            device: self.device.clone(),
            surface: self.surface.handle(),
            support: &support,
            queue_families: self.physical_device.queue_families(),
            drawable_extent,
        })?;
        let extent = swapchain.extent();
        let surface_format = swapchain.format();
        let images = swapchain.images()?;

        let image_views = images
            .iter()
            .map(|image| {
                ImageView::new(ImageViewCreateInfo::FromCreateInfo {
                    device: self.device.clone(),
                    create_info: view_create_info(
                        *image,
                        surface_format.format,
                        vk::ImageAspectFlags::COLOR,
                        vk::ImageViewType::TYPE_2D,
                        1,
                        1,
                    ),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // one depth image shared by every framebuffer
        let depth_image = Image::new(ImageCreateInfo::NewAllocated {
            device: self.device.clone(),
            memory_properties: self.physical_device.memory_properties(),
            desc: ImageDesc {
                width: extent.width,
                height: extent.height,
                format: self.depth_format,
                tiling: vk::ImageTiling::OPTIMAL,
                usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
                    | vk::ImageUsageFlags::INPUT_ATTACHMENT
                    | vk::ImageUsageFlags::TRANSIENT_ATTACHMENT,
                required_memory: vk::MemoryPropertyFlags::DEVICE_LOCAL,
                flags: vk::ImageCreateFlags::empty(),
                array_layers: 1,
                mip_levels: 1,
            },
        })?;
        let depth_view = ImageView::new(ImageViewCreateInfo::FromCreateInfo {
            device: self.device.clone(),
            create_info: view_create_info(
                depth_image.handle(),
                self.depth_format,
                vk::ImageAspectFlags::DEPTH,
                vk::ImageViewType::TYPE_2D,
                1,
                1,
            ),
        })?;

        let framebuffers = image_views
            .iter()
            .map(|view| {
                Framebuffer::new(
                    self.device.clone(),
                    self.render_pass,
                    &[view.handle(), depth_view.handle()],
                    extent,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "swapchain live: {} images, {}x{}, {:?}",
            images.len(),
            extent.width,
            extent.height,
            swapchain.present_mode()
        );

        self.swapchain = Some(swapchain);
        self.images = images;
        self.image_views = image_views;
        self.depth_image = Some(depth_image);
        self.depth_view = Some(depth_view);
        self.framebuffers = framebuffers;
        self.extent = extent;
        self.state = SwapchainState::Live;
        Ok(())
    }

    /// Destroy everything keyed to the current chain. The chain-owned
    /// images are released with the swapchain itself.
    fn clear_swapchain(&mut self) {
        for mut framebuffer in self.framebuffers.drain(..) {
            framebuffer.destroy();
        }
        if let Some(mut depth_view) = self.depth_view.take() {
            depth_view.destroy();
        }
        if let Some(mut depth_image) = self.depth_image.take() {
            depth_image.destroy();
        }
        for mut view in self.image_views.drain(..) {
            view.destroy();
        }
        self.images.clear();
        if let Some(mut swapchain) = self.swapchain.take() {
            swapchain.destroy();
        }
    }

    /// Tear down and rebuild against the current surface.
    ///
    /// Waits for the whole device to go idle first so no in-flight frame
    /// can still reference the old objects. Safe to call every frame while
    /// the surface keeps changing, and from any live state.
    pub fn recreate(&mut self, drawable_extent: vk::Extent2D) -> Result<()> {
        if self.state == SwapchainState::Destroyed {
            return Err(crate::RhiError::SwapchainDestroyed.into());
        }
        self.device.wait_idle()?;
        self.clear_swapchain();
        self.create_swapchain(drawable_extent)
    }

    /// Note that the surface changed; the next frame recreates before
    /// acquiring. Window event loops call this on resize; acquire/present
    /// call it themselves on suboptimal and out-of-date reports.
    pub fn mark_stale(&mut self) {
        if self.state == SwapchainState::Live {
            self.state = SwapchainState::Stale;
        }
    }

    pub fn is_stale(&self) -> bool {
        self.state == SwapchainState::Stale
    }

    pub fn state(&self) -> SwapchainState {
        self.state
    }

    pub fn acquire(&mut self, semaphore: &crate::sync::BinarySemaphore) -> Result<AcquireOutcome> {
        let swapchain = self
            .swapchain
            .as_ref()
            .ok_or(crate::RhiError::SwapchainDestroyed)?;
        match swapchain.acquire_next_image(u64::MAX, semaphore.handle()) {
            Ok((image_index, false)) => Ok(AcquireOutcome::Ready(image_index)),
            Ok((image_index, true)) => {
                self.mark_stale();
                Ok(AcquireOutcome::Suboptimal(image_index))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.mark_stale();
                Ok(AcquireOutcome::OutOfDate)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn present(
        &mut self,
        queue: &crate::device::Queue,
        image_index: u32,
        wait_semaphore: &crate::sync::BinarySemaphore,
    ) -> Result<PresentOutcome> {
        let swapchain = self
            .swapchain
            .as_ref()
            .ok_or(crate::RhiError::SwapchainDestroyed)?;
        match swapchain.present(queue.handle(), image_index, wait_semaphore.handle()) {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => {
                self.mark_stale();
                Ok(PresentOutcome::Suboptimal)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.mark_stale();
                Ok(PresentOutcome::OutOfDate)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Current extent; dependent render passes size viewports from this
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn surface_format(&self) -> Option<vk::SurfaceFormatKHR> {
        self.swapchain.as_ref().map(|swapchain| swapchain.format())
    }

    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn image_views(&self) -> &[ImageView] {
        &self.image_views
    }

    pub fn framebuffer(&self, image_index: u32) -> vk::Framebuffer {
        self.framebuffers[image_index as usize].handle()
    }
}

impl Destructible for SwapchainManager {
    fn destroy(&mut self) {
        if self.state == SwapchainState::Destroyed {
            return;
        }
        self.clear_swapchain();
        self.surface.destroy();
        self.state = SwapchainState::Destroyed;
    }
}
