use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// Describes a window we can present to
pub trait RhiWindow: WindowDimensions + HasWindowHandle + HasDisplayHandle + Sized {}

pub trait WindowDimensions {
    /// Drawable width in pixels
    fn width(&self) -> u32;
    /// Drawable height in pixels
    fn height(&self) -> u32;

    /// Drawable size as a [`vk::Extent2D`]
    fn drawable_extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width(),
            height: self.height(),
        }
    }
}

#[cfg(feature = "winit")]
impl WindowDimensions for winit::window::Window {
    fn width(&self) -> u32 {
        self.inner_size().width
    }

    fn height(&self) -> u32 {
        self.inner_size().height
    }
}

#[cfg(feature = "winit")]
impl RhiWindow for winit::window::Window {}
