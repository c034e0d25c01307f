use anyhow::Result;
use ash::vk;

use crate::traits::Destructible;

/// Upper bound on a transient submission before the device counts as lost
const TRANSIENT_WAIT_TIMEOUT_NS: u64 = 5_000_000_000;

/// A dedicated pool for short-lived command buffers: record, submit, block
/// until the GPU finished.
///
/// Every call is synchronous; this is the upload path, not the per-frame
/// path, and it must stay out of hot loops.
#[derive(Debug)]
pub struct TransientCommands {
    device: crate::device::LogicalDevice,
    queue: crate::device::Queue,
    command_pool: crate::command::CommandPool,
    command_buffer: crate::command::CommandBuffer,
    fence: crate::sync::Fence,
}

impl TransientCommands {
    pub fn new(device: crate::device::LogicalDevice, queue: crate::device::Queue) -> Result<Self> {
        let command_pool = crate::command::CommandPool::new(
            device.clone(),
            &queue,
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )?;
        let command_buffer = command_pool.allocate_one()?;
        let fence = crate::sync::Fence::new(device.clone(), vk::FenceCreateFlags::SIGNALED)?;
        Ok(Self {
            device,
            queue,
            command_pool,
            command_buffer,
            fence,
        })
    }

    /// Record a one-shot command buffer through `record`, submit it, and
    /// wait for completion
    pub fn submit<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&crate::device::LogicalDevice, vk::CommandBuffer),
    {
        self.fence.reset()?;
        self.command_buffer
            .reset(vk::CommandBufferResetFlags::empty())?;

        let recording = self
            .command_buffer
            .clone()
            .begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        record(&self.device, recording.handle());
        let executable = recording.end()?;

        let cmd_info = executable.submit_info();
        executable.submit(
            self.queue.handle(),
            &[crate::command::CommandBufferExecutable::submit_info_sync(
                &[cmd_info],
                &[],
                &[],
            )],
            self.fence.handle(),
        )?;
        self.fence.wait(TRANSIENT_WAIT_TIMEOUT_NS)
    }

    pub fn get_device(&self) -> &crate::device::LogicalDevice {
        &self.device
    }

    pub fn get_queue(&self) -> &crate::device::Queue {
        &self.queue
    }
}

impl Destructible for TransientCommands {
    fn destroy(&mut self) {
        self.fence.destroy();
        self.command_pool.destroy();
    }
}
