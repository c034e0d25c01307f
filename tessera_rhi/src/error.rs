use ash::vk;
use thiserror::Error;

/// Possible errors
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum RhiError {
    #[error("No suitable physical device has been found")]
    NoSuitablePhysicalDevice,

    #[error("Required graphics or present queue family is missing")]
    IncompleteQueueFamilies,

    #[error("Surface reports no formats or present modes")]
    NoSurfaceFormats,

    #[error("No supported depth attachment format")]
    NoSupportedDepthFormat,

    #[error("No compatible memory type for the requested allocation")]
    NoCompatibleMemoryType,

    #[error("Memory allocation is not host visible")]
    MemoryNotHostVisible,

    #[error("Timed out waiting for a fence; treating the device as lost")]
    FenceWaitTimeout,

    #[error("Surface stayed out of date for {attempts} consecutive frames")]
    SurfaceRepeatedlyOutOfDate { attempts: u32 },

    #[error("Unsupported image layout transition {from:?} -> {to:?}")]
    UnsupportedLayoutTransition {
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    },

    #[error("Format {0:?} does not support linear blits")]
    LinearBlitUnsupported(vk::Format),

    #[error("No known texel size for format {0:?}")]
    UnsupportedTexelFormat(vk::Format),

    #[error("Swapchain has already been destroyed")]
    SwapchainDestroyed,

    #[error(transparent)]
    VkError(#[from] vk::Result),
}
