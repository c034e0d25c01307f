/// Utilities relating to the window surface and swapchain
pub mod framebuffer;
pub mod manager;
pub mod surface;
pub mod swapchain;
pub mod traits;

pub use traits::*;

pub use framebuffer::Framebuffer;
pub use manager::{AcquireOutcome, PresentOutcome, SwapchainManager, SwapchainManagerCreateInfo, SwapchainState};
pub use surface::{Surface, SwapchainSupport};
pub use swapchain::Swapchain;
