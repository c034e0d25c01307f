//! Command buffers are divided across three structs: [`CommandBuffer`],
//! [`CommandBufferRecording`], and [`CommandBufferExecutable`].
//!
//! This type state ensures that no commands are recorded outside of a
//! begin/end pair and nothing is submitted before recording finished.
use std::ptr;

use anyhow::Result;
use ash::vk;

#[derive(Debug, Clone)]
pub struct CommandBuffer {
    handle: vk::CommandBuffer,
    device: crate::device::LogicalDevice,
}

impl CommandBuffer {
    pub(crate) fn new(handle: vk::CommandBuffer, device: crate::device::LogicalDevice) -> Self {
        Self { handle, device }
    }

    /// Moves the command buffer into the recording state
    pub fn begin(self, flags: vk::CommandBufferUsageFlags) -> Result<CommandBufferRecording> {
        unsafe {
            self.device.get_handle().begin_command_buffer(
                self.handle,
                &vk::CommandBufferBeginInfo {
                    s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
                    p_next: ptr::null(),
                    flags,
                    p_inheritance_info: ptr::null(),
                    _marker: Default::default(),
                },
            )?
        };
        Ok(CommandBufferRecording {
            handle: self.handle,
            device: self.device,
        })
    }

    /// Resets the current command buffer
    pub fn reset(&self, flags: vk::CommandBufferResetFlags) -> Result<()> {
        unsafe {
            self.device
                .get_handle()
                .reset_command_buffer(self.handle, flags)?
        };
        Ok(())
    }

    pub fn get_handle(&self) -> &vk::CommandBuffer {
        &self.handle
    }

    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }
}

#[derive(Debug)]
pub struct CommandBufferRecording {
    handle: vk::CommandBuffer,
    device: crate::device::LogicalDevice,
}

impl CommandBufferRecording {
    /// Ends recording into the command buffer
    pub fn end(self) -> Result<CommandBufferExecutable> {
        unsafe { self.device.get_handle().end_command_buffer(self.handle)? }
        Ok(CommandBufferExecutable {
            handle: self.handle,
            device: self.device,
        })
    }

    pub fn get_device(&self) -> &crate::device::LogicalDevice {
        &self.device
    }

    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }
}

/// Command buffer is in its executable state and can now be executed via
/// queue submission
#[derive(Debug)]
pub struct CommandBufferExecutable {
    handle: vk::CommandBuffer,
    device: crate::device::LogicalDevice,
}

impl CommandBufferExecutable {
    /// Quickly acquire a [`VkCommandBufferSubmitInfo`](vk::CommandBufferSubmitInfo) for
    /// a single [`VkCommandBuffer`](vk::CommandBuffer).
    pub fn submit_info(&self) -> vk::CommandBufferSubmitInfo<'static> {
        vk::CommandBufferSubmitInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_SUBMIT_INFO,
            p_next: ptr::null(),
            command_buffer: self.handle,
            device_mask: 0,
            _marker: Default::default(),
        }
    }

    /// Submit with synchronization primitives
    pub fn submit_info_sync<'a>(
        cmd_submit_info: &[vk::CommandBufferSubmitInfo<'a>],
        wait_semaphores: &[vk::SemaphoreSubmitInfo<'a>],
        signal_semaphores: &[vk::SemaphoreSubmitInfo<'a>],
    ) -> vk::SubmitInfo2<'a> {
        vk::SubmitInfo2 {
            s_type: vk::StructureType::SUBMIT_INFO_2,
            p_next: ptr::null(),
            flags: vk::SubmitFlags::empty(),
            wait_semaphore_info_count: wait_semaphores.len() as u32,
            p_wait_semaphore_infos: wait_semaphores.as_ptr(),
            command_buffer_info_count: cmd_submit_info.len() as u32,
            p_command_buffer_infos: cmd_submit_info.as_ptr(),
            signal_semaphore_info_count: signal_semaphores.len() as u32,
            p_signal_semaphore_infos: signal_semaphores.as_ptr(),
            _marker: Default::default(),
        }
    }

    /// Submits the current command buffer to the queue
    pub fn submit(
        self,
        queue: vk::Queue,
        submit_infos: &[vk::SubmitInfo2],
        fence: vk::Fence,
    ) -> Result<CommandBuffer> {
        unsafe {
            self.device
                .get_handle()
                .queue_submit2(queue, submit_infos, fence)?
        };
        Ok(CommandBuffer {
            handle: self.handle,
            device: self.device,
        })
    }

    pub fn get_device(&self) -> &crate::device::LogicalDevice {
        &self.device
    }

    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }
}
