pub mod slot;

pub use slot::FrameSlot;

use anyhow::Result;
use ash::vk;

use crate::command::CommandBufferExecutable;
use crate::traits::Destructible;
use crate::wsi::{AcquireOutcome, PresentOutcome, SwapchainManager};

/// Frame slots the reference configuration keeps in flight
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;

/// A fence staying unsignaled this long means the GPU is gone, not busy
const FENCE_WAIT_TIMEOUT_NS: u64 = 5_000_000_000;

/// Consecutive acquire-side out-of-date frames tolerated before giving up
const MAX_CONSECUTIVE_OUT_OF_DATE: u32 = 8;

/// Everything a render pass needs to record one frame
pub struct RecordContext<'a> {
    pub device: &'a crate::device::LogicalDevice,
    pub cmd: vk::CommandBuffer,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub image_index: u32,
    pub frame_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The frame was abandoned (stale surface or zero-area drawable); call
    /// again next tick
    Skipped,
}

/// Orchestrates one rendered frame end to end: wait on the slot fence,
/// acquire, record through the injected callback, submit, present.
///
/// Slots rotate round-robin; a slot's fence must signal before its command
/// buffer is ever touched again, which bounds how far the CPU can run
/// ahead of the GPU.
pub struct FramePipeline {
    device: crate::device::LogicalDevice,
    graphics_queue: crate::device::Queue,
    present_queue: crate::device::Queue,
    slots: Vec<FrameSlot>,
    current_frame: usize,
    consecutive_out_of_date: u32,
}

impl FramePipeline {
    pub fn new(
        device: crate::device::LogicalDevice,
        graphics_queue: crate::device::Queue,
        present_queue: crate::device::Queue,
        frames_in_flight: usize,
    ) -> Result<Self> {
        anyhow::ensure!(frames_in_flight > 0, "at least one frame slot is required");
        let slots = (0..frames_in_flight)
            .map(|_| FrameSlot::new(&device, &graphics_queue))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            slots,
            current_frame: 0,
            consecutive_out_of_date: 0,
        })
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next [`render_frame`](Self::render_frame) call will use
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn slots(&self) -> &[FrameSlot] {
        &self.slots
    }

    /// Run one frame. `record` is handed the command buffer mid-recording
    /// and the framebuffer for the acquired image; it must not submit or
    /// present on its own.
    pub fn render_frame(
        &mut self,
        swapchain: &mut SwapchainManager,
        drawable_extent: vk::Extent2D,
        record: &mut dyn FnMut(RecordContext),
    ) -> Result<FrameOutcome> {
        // a minimized surface has nothing to present to
        if drawable_extent.width == 0 || drawable_extent.height == 0 {
            return Ok(FrameOutcome::Skipped);
        }

        let slot = &self.slots[self.current_frame];
        slot.in_flight.wait(FENCE_WAIT_TIMEOUT_NS)?;

        if swapchain.is_stale() {
            swapchain.recreate(drawable_extent)?;
        }

        let image_index = match swapchain.acquire(&slot.image_available)? {
            AcquireOutcome::Ready(image_index) => image_index,
            // tolerated for this frame; the manager is already marked stale
            AcquireOutcome::Suboptimal(image_index) => image_index,
            AcquireOutcome::OutOfDate => {
                self.consecutive_out_of_date += 1;
                if self.consecutive_out_of_date >= MAX_CONSECUTIVE_OUT_OF_DATE {
                    return Err(crate::RhiError::SurfaceRepeatedlyOutOfDate {
                        attempts: self.consecutive_out_of_date,
                    }
                    .into());
                }
                swapchain.recreate(drawable_extent)?;
                return Ok(FrameOutcome::Skipped);
            }
        };

        slot.command_pool.reset()?;
        let recording = slot
            .command_buffer
            .clone()
            .begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        record(RecordContext {
            device: &self.device,
            cmd: recording.handle(),
            framebuffer: swapchain.framebuffer(image_index),
            extent: swapchain.extent(),
            image_index,
            frame_index: self.current_frame,
        });
        let executable = recording.end()?;

        // reset only once submission is certain; an early-out above must
        // leave the fence signaled
        slot.in_flight.reset()?;
        let wait_info = slot
            .image_available
            .submit_info(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT);
        let signal_info = slot
            .render_finished
            .submit_info(vk::PipelineStageFlags2::ALL_COMMANDS);
        let cmd_info = executable.submit_info();
        executable.submit(
            self.graphics_queue.handle(),
            &[CommandBufferExecutable::submit_info_sync(
                &[cmd_info],
                &[wait_info],
                &[signal_info],
            )],
            slot.in_flight.handle(),
        )?;

        match swapchain.present(&self.present_queue, image_index, &slot.render_finished)? {
            PresentOutcome::OutOfDate => {
                swapchain.recreate(drawable_extent)?;
            }
            PresentOutcome::Suboptimal | PresentOutcome::Presented => {}
        }

        self.consecutive_out_of_date = 0;
        self.current_frame = next_frame_index(self.current_frame, self.slots.len());
        Ok(FrameOutcome::Presented)
    }

    /// Block until every slot's submitted work has retired
    pub fn drain(&self) -> Result<()> {
        for slot in &self.slots {
            slot.in_flight.wait(FENCE_WAIT_TIMEOUT_NS)?;
        }
        Ok(())
    }
}

impl Destructible for FramePipeline {
    fn destroy(&mut self) {
        for mut slot in self.slots.drain(..) {
            slot.destroy();
        }
    }
}

pub(crate) fn next_frame_index(current: usize, frames_in_flight: usize) -> usize {
    (current + 1) % frames_in_flight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_slots_alternate_over_five_frames() {
        let mut frame = 0;
        let mut visited = vec![frame];
        for _ in 0..4 {
            frame = next_frame_index(frame, 2);
            visited.push(frame);
        }
        assert_eq!(visited, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn three_slots_wrap_around() {
        assert_eq!(next_frame_index(0, DEFAULT_FRAMES_IN_FLIGHT), 1);
        assert_eq!(next_frame_index(1, DEFAULT_FRAMES_IN_FLIGHT), 2);
        assert_eq!(next_frame_index(2, DEFAULT_FRAMES_IN_FLIGHT), 0);
    }
}
