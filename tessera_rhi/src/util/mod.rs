use std::ffi::{c_char, CStr, CString};

/// Utility functions commonly used
pub mod teardown_stack;
pub mod transient;

pub use teardown_stack::TeardownStack;
pub use transient::TransientCommands;

#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub fn wrap_c_str(c: *const c_char) -> CString {
    if c.is_null() {
        CString::new("").unwrap()
    } else {
        unsafe { CString::new(CStr::from_ptr(c).to_bytes()).unwrap() }
    }
}

/// Number of mip levels in a full chain for a base extent, including the
/// base level itself.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mip_chain_counts() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(1024, 512), 11);
        assert_eq!(mip_level_count(512, 1024), 11);
        // non power of two rounds down to floor(log2) + 1
        assert_eq!(mip_level_count(1536, 1), 11);
    }

    #[test]
    fn zero_extent_still_has_base_level() {
        assert_eq!(mip_level_count(0, 0), 1);
    }
}
