use ash::vk;

/// A [`vk::Queue`] together with the indices it was retrieved from.
///
/// All submissions happen from the single rendering thread, so the handle is
/// stored bare with no interior locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Queue {
    handle: vk::Queue,
    family_index: u32,
    index: u32,
}

impl Queue {
    pub(crate) fn new(handle: vk::Queue, family_index: u32, index: u32) -> Self {
        Self {
            handle,
            family_index,
            index,
        }
    }

    pub fn get_handle(&self) -> &vk::Queue {
        &self.handle
    }

    pub fn handle(&self) -> vk::Queue {
        self.handle
    }

    pub fn family_index(&self) -> u32 {
        self.family_index
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}
