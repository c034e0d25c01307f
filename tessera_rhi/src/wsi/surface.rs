use anyhow::Result;
use ash::vk;
use derivative::Derivative;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::traits::Destructible;

/// Everything the physical device reports about presenting to a surface
#[derive(Debug, Clone)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Surface {
    handle: vk::SurfaceKHR,
    #[derivative(Debug = "ignore")]
    ext: ash::khr::surface::Instance,
}

impl Surface {
    pub fn new<T>(entry: &ash::Entry, instance: &ash::Instance, window: &T) -> Result<Self>
    where
        T: HasWindowHandle + HasDisplayHandle,
    {
        let ext = ash::khr::surface::Instance::new(entry, instance);
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                window.display_handle()?.as_raw(),
                window.window_handle()?.as_raw(),
                None,
            )?
        };

        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Creating VkSurface {:p}", handle);

        Ok(Self { handle, ext })
    }

    /// Whether `family_index` on the device can present to this surface
    pub fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        family_index: u32,
    ) -> Result<bool> {
        Ok(unsafe {
            self.ext.get_physical_device_surface_support(
                physical_device,
                family_index,
                self.handle,
            )?
        })
    }

    /// Query capabilities, formats, and present modes.
    ///
    /// Capabilities change whenever the surface resizes; the swapchain
    /// manager re-queries on every (re)creation rather than caching.
    pub fn query_support(&self, physical_device: vk::PhysicalDevice) -> Result<SwapchainSupport> {
        unsafe {
            Ok(SwapchainSupport {
                capabilities: self
                    .ext
                    .get_physical_device_surface_capabilities(physical_device, self.handle)?,
                formats: self
                    .ext
                    .get_physical_device_surface_formats(physical_device, self.handle)?,
                present_modes: self
                    .ext
                    .get_physical_device_surface_present_modes(physical_device, self.handle)?,
            })
        }
    }

    pub fn get_handle(&self) -> &vk::SurfaceKHR {
        &self.handle
    }

    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }
}

impl Destructible for Surface {
    fn destroy(&mut self) {
        #[cfg(feature = "log-lifetimes")]
        tracing::trace!("Destroying VkSurface {:p}", self.handle);

        unsafe {
            self.ext.destroy_surface(self.handle, None);
        }
    }
}
