pub mod debug_utils;
pub mod instance;
pub mod logical_device;
pub mod physical_device;
pub mod queue;

pub use debug_utils::DebugMessenger;
pub use instance::{Instance, InstanceCreateInfo};
pub use logical_device::{LogicalDevice, LogicalDeviceCreateInfo};
pub use physical_device::{PhysicalDevice, QueueFamilyIndices};
pub use queue::Queue;
