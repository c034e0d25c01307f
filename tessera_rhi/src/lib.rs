pub mod command;
pub mod context;
pub mod device;
pub mod error;
pub mod frame;
pub mod resource;
pub mod sync;
pub mod traits;
pub mod util;
pub mod wsi;

pub use context::{Context, ContextCreateInfo};
pub use error::RhiError;
pub use frame::DEFAULT_FRAMES_IN_FLIGHT;

// Re-exports
#[cfg(feature = "winit")]
pub use winit;
pub use {ash, ash_window, raw_window_handle};
