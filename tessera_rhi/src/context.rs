use anyhow::Result;
use ash::vk;
use raw_window_handle::HasDisplayHandle;

use crate::device::{
    DebugMessenger, Instance, InstanceCreateInfo, LogicalDevice, LogicalDeviceCreateInfo,
    PhysicalDevice, Queue,
};
use crate::frame::{FrameOutcome, FramePipeline, RecordContext, DEFAULT_FRAMES_IN_FLIGHT};
use crate::resource::traits::Resource;
use crate::resource::{
    DescriptorPool, DescriptorPoolCreateInfo, ResourceAllocator, SamplerCache,
};
use crate::traits::Destructible;
use crate::wsi::{
    RhiWindow, Surface, SwapchainManager, SwapchainManagerCreateInfo, WindowDimensions,
};

pub struct ContextCreateInfo<'a, W: RhiWindow> {
    pub window: &'a W,
    pub app_name: &'a str,
    pub enable_validation: bool,
    pub frames_in_flight: usize,
}

impl<'a, W: RhiWindow> ContextCreateInfo<'a, W> {
    pub fn new(window: &'a W, app_name: &'a str) -> Self {
        Self {
            window,
            app_name,
            enable_validation: cfg!(debug_assertions),
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
        }
    }
}

/// The fully assembled RHI: device and queues, resource allocator, sampler
/// cache, swapchain, and the frame pipeline.
///
/// Everything is created in dependency order and torn down in strict
/// reverse order through [`Context::destroy`]; nothing here relies on
/// `Drop`.
pub struct Context {
    instance: Instance,
    debug_messenger: Option<DebugMessenger>,
    physical_device: PhysicalDevice,
    device: LogicalDevice,
    graphics_queue: Queue,
    present_queue: Queue,
    render_pass: vk::RenderPass,
    pub allocator: ResourceAllocator,
    pub descriptor_pool: DescriptorPool,
    pub samplers: SamplerCache,
    pub swapchain: SwapchainManager,
    pub frames: FramePipeline,
    destroyed: bool,
}

impl Context {
    /// Bring the whole layer up against `window`.
    ///
    /// `create_render_pass` receives the chosen color and depth formats and
    /// returns the pass the swapchain framebuffers will target; the context
    /// takes ownership of the returned handle and destroys it at teardown.
    pub fn new<W, F>(create_info: ContextCreateInfo<W>, create_render_pass: F) -> Result<Self>
    where
        W: RhiWindow,
        F: FnOnce(&LogicalDevice, vk::Format, vk::Format) -> Result<vk::RenderPass>,
    {
        let instance = Instance::new(InstanceCreateInfo {
            app_name: create_info.app_name,
            display_handle: create_info.window.display_handle()?.as_raw(),
            enable_validation: create_info.enable_validation,
        })?;
        let debug_messenger = if instance.validation_enabled() {
            Some(DebugMessenger::new(
                instance.get_entry(),
                instance.get_instance(),
            )?)
        } else {
            None
        };

        let surface = Surface::new(
            instance.get_entry(),
            instance.get_instance(),
            create_info.window,
        )?;
        let physical_device = PhysicalDevice::select(instance.get_instance(), &surface)?;
        let device = LogicalDevice::new(LogicalDeviceCreateInfo {
            instance: instance.get_instance(),
            physical_device: &physical_device,
            enable_debug_utils: instance.validation_enabled(),
        })?;

        let queue_families = physical_device.queue_families();
        let (graphics_family, present_family) = match (
            queue_families.graphics_family,
            queue_families.present_family,
        ) {
            (Some(graphics), Some(present)) => (graphics, present),
            _ => return Err(crate::RhiError::IncompleteQueueFamilies.into()),
        };
        let graphics_queue = Queue::new(device.get_queue(graphics_family, 0), graphics_family, 0);
        let present_queue = Queue::new(device.get_queue(present_family, 0), present_family, 0);

        let allocator = ResourceAllocator::new(&physical_device, device.clone(), graphics_queue)?;
        let descriptor_pool = DescriptorPool::new(DescriptorPoolCreateInfo::FromPoolSizes {
            device: device.clone(),
            sizes: default_descriptor_pool_sizes(),
            flags: vk::DescriptorPoolCreateFlags::empty(),
            max_sets: 256,
        })?;
        let samplers = SamplerCache::new(device.clone(), physical_device.limits());

        let support = surface.query_support(physical_device.handle())?;
        if support.formats.is_empty() {
            return Err(crate::RhiError::NoSurfaceFormats.into());
        }
        let surface_format = crate::wsi::swapchain::select_surface_format(&support.formats);
        let depth_format = physical_device.find_depth_format()?;
        let render_pass = create_render_pass(&device, surface_format.format, depth_format)?;

        let swapchain = SwapchainManager::new(SwapchainManagerCreateInfo {
            device: device.clone(),
            physical_device: physical_device.clone(),
            surface,
            render_pass,
            drawable_extent: create_info.window.drawable_extent(),
        })?;
        let frames = FramePipeline::new(
            device.clone(),
            graphics_queue,
            present_queue,
            create_info.frames_in_flight,
        )?;

        tracing::info!(
            "RHI initialized: {} frames in flight, {} swapchain images",
            frames.frames_in_flight(),
            swapchain.image_count()
        );

        Ok(Self {
            instance,
            debug_messenger,
            physical_device,
            device,
            graphics_queue,
            present_queue,
            render_pass,
            allocator,
            descriptor_pool,
            samplers,
            swapchain,
            frames,
            destroyed: false,
        })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn physical_device(&self) -> &PhysicalDevice {
        &self.physical_device
    }

    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }

    pub fn graphics_queue(&self) -> &Queue {
        &self.graphics_queue
    }

    pub fn present_queue(&self) -> &Queue {
        &self.present_queue
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Convenience over [`FramePipeline::render_frame`] with the context's
    /// own swapchain
    pub fn render_frame(
        &mut self,
        drawable_extent: vk::Extent2D,
        record: &mut dyn FnMut(RecordContext),
    ) -> Result<FrameOutcome> {
        self.frames
            .render_frame(&mut self.swapchain, drawable_extent, record)
    }
}

impl Destructible for Context {
    /// Teardown in strict reverse-creation order: frames → swapchain →
    /// render pass → samplers → descriptor pool → allocator → device →
    /// debug messenger → instance.
    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        if let Err(err) = self.device.wait_idle() {
            tracing::warn!("device refused to idle during teardown: {err}");
        }
        self.frames.destroy();
        self.swapchain.destroy();
        unsafe {
            self.device
                .get_handle()
                .destroy_render_pass(self.render_pass, None);
        }
        self.samplers.destroy();
        self.descriptor_pool.destroy();
        self.allocator.destroy();
        self.device.destroy();
        if let Some(mut messenger) = self.debug_messenger.take() {
            messenger.destroy();
        }
        self.instance.destroy();
    }
}

/// Capacities mirroring what a small forward renderer consumes; exhaustion
/// is a hard error, not a trigger for a second pool
fn default_descriptor_pool_sizes() -> Vec<vk::DescriptorPoolSize> {
    vec![
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 128,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_BUFFER,
            descriptor_count: 64,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 256,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::INPUT_ATTACHMENT,
            descriptor_count: 16,
        },
    ]
}
