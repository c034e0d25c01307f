use std::ptr;

use anyhow::Result;
use ash::vk;

use crate::traits::Destructible;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fence {
    handle: vk::Fence,
    device: crate::device::LogicalDevice,
}

impl Fence {
    pub fn new(device: crate::device::LogicalDevice, flags: vk::FenceCreateFlags) -> Result<Self> {
        let handle = unsafe {
            device.get_handle().create_fence(
                &vk::FenceCreateInfo {
                    s_type: vk::StructureType::FENCE_CREATE_INFO,
                    p_next: ptr::null(),
                    flags,
                    _marker: Default::default(),
                },
                None,
            )?
        };

        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Creating VkFence {:p}", handle);

        Ok(Self { handle, device })
    }

    pub fn get_handle(&self) -> &vk::Fence {
        &self.handle
    }

    pub fn handle(&self) -> vk::Fence {
        self.handle
    }

    /// Waits on the current fence.
    ///
    /// Running out the timeout is not retryable: the GPU failed to retire
    /// work we already submitted, so it surfaces as
    /// [`RhiError::FenceWaitTimeout`](crate::RhiError::FenceWaitTimeout).
    pub fn wait(&self, timeout: u64) -> Result<()> {
        match unsafe {
            self.device
                .get_handle()
                .wait_for_fences(&[self.handle], true, timeout)
        } {
            Ok(()) => Ok(()),
            Err(vk::Result::TIMEOUT) => Err(crate::RhiError::FenceWaitTimeout.into()),
            Err(err) => Err(err.into()),
        }
    }

    /// Resets the fence back to the unsignaled state
    pub fn reset(&self) -> Result<()> {
        unsafe { self.device.get_handle().reset_fences(&[self.handle])? }
        Ok(())
    }
}

impl Destructible for Fence {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkFence {:p}", self.handle);

        unsafe {
            self.device.get_handle().destroy_fence(self.handle, None);
        }
    }
}
