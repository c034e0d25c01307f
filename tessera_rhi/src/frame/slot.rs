use anyhow::Result;
use ash::vk;

use crate::traits::Destructible;

/// One in-flight frame context: command pool + buffer and the sync
/// primitives gating their reuse.
///
/// The fence starts signaled so the very first wait on a fresh slot falls
/// straight through.
#[derive(Debug)]
pub struct FrameSlot {
    pub(crate) command_pool: crate::command::CommandPool,
    pub(crate) command_buffer: crate::command::CommandBuffer,
    pub(crate) image_available: crate::sync::BinarySemaphore,
    pub(crate) render_finished: crate::sync::BinarySemaphore,
    pub(crate) in_flight: crate::sync::Fence,
}

impl FrameSlot {
    pub fn new(device: &crate::device::LogicalDevice, queue: &crate::device::Queue) -> Result<Self> {
        let command_pool = crate::command::CommandPool::new(
            device.clone(),
            queue,
            vk::CommandPoolCreateFlags::TRANSIENT,
        )?;
        let command_buffer = command_pool.allocate_one()?;
        let image_available =
            crate::sync::BinarySemaphore::new(device.clone(), vk::SemaphoreCreateFlags::empty())?;
        let render_finished =
            crate::sync::BinarySemaphore::new(device.clone(), vk::SemaphoreCreateFlags::empty())?;
        let in_flight = crate::sync::Fence::new(device.clone(), vk::FenceCreateFlags::SIGNALED)?;
        Ok(Self {
            command_pool,
            command_buffer,
            image_available,
            render_finished,
            in_flight,
        })
    }

    pub fn in_flight_fence(&self) -> &crate::sync::Fence {
        &self.in_flight
    }
}

impl Destructible for FrameSlot {
    fn destroy(&mut self) {
        self.in_flight.destroy();
        self.render_finished.destroy();
        self.image_available.destroy();
        self.command_pool.destroy();
    }
}
