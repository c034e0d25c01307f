pub mod command_buffer;
pub mod command_pool;

pub use command_buffer::CommandBuffer;
pub use command_buffer::CommandBufferExecutable;
pub use command_buffer::CommandBufferRecording;
pub use command_pool::CommandPool;
