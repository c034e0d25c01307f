pub mod allocator;
pub mod buffer;
pub mod descriptor_pool;
pub mod image;
pub mod image_view;
pub mod memory;
pub mod sampler;
pub mod sampler_cache;
pub mod traits;

pub use allocator::ResourceAllocator;
pub use buffer::{Buffer, BufferCreateInfo};
pub use descriptor_pool::{DescriptorPool, DescriptorPoolCreateInfo};
pub use image::{Image, ImageCreateInfo, ImageDesc};
pub use image_view::{ImageView, ImageViewCreateInfo};
pub use memory::DeviceMemory;
pub use sampler::{Sampler, SamplerCreateInfo};
pub use sampler_cache::SamplerCache;
