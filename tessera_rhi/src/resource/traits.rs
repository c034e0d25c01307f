use anyhow::Result;

/// Traits all Vulkan resource wrappers are expected to have
pub trait Resource<'a> {
    type CreateInfo: 'a;
    type HandleType: Copy;

    fn new(create_info: Self::CreateInfo) -> Result<Self>
    where
        Self: Sized;

    /// Get a reference to the underlying handle
    fn get_handle(&self) -> &Self::HandleType;

    /// Get a copy of the underlying handle
    fn handle(&self) -> Self::HandleType;

    /// Get the device the resource belongs to
    fn get_device(&self) -> &crate::device::LogicalDevice;
}
