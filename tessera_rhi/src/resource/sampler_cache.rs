use std::collections::HashMap;
use std::ptr;

use anyhow::Result;
use ash::vk;

use crate::resource::sampler::{Sampler, SamplerCreateInfo};
use crate::resource::traits::Resource;
use crate::traits::Destructible;

/// Device-owned cache of immutable samplers.
///
/// One instance lives on the context for the lifetime of the device; there
/// is deliberately no global map. Mipmap samplers are keyed by mip chain
/// length, so every texture sharing an extent class shares a sampler.
/// Entries live until their `destroy_*` call or full cache teardown;
/// skipping teardown leaks the sampler but never crashes.
pub struct SamplerCache {
    device: crate::device::LogicalDevice,
    max_anisotropy: f32,
    mipmap_samplers: HashMap<u32, Sampler>,
    nearest_sampler: Option<Sampler>,
    linear_sampler: Option<Sampler>,
}

/// Cache key for a mipmap sampler: the mip chain length for the extent
pub fn mipmap_sampler_key(width: u32, height: u32) -> u32 {
    crate::util::mip_level_count(width, height)
}

impl SamplerCache {
    pub fn new(device: crate::device::LogicalDevice, limits: &vk::PhysicalDeviceLimits) -> Self {
        Self {
            device,
            max_anisotropy: limits.max_sampler_anisotropy,
            mipmap_samplers: HashMap::new(),
            nearest_sampler: None,
            linear_sampler: None,
        }
    }

    /// Sampler for a mipmapped texture of the given base extent
    pub fn get_or_create_mipmap_sampler(&mut self, width: u32, height: u32) -> Result<vk::Sampler> {
        let key = mipmap_sampler_key(width, height);
        if let Some(sampler) = self.mipmap_samplers.get(&key) {
            return Ok(sampler.handle());
        }

        let sampler = Sampler::new(SamplerCreateInfo::FromCreateInfo {
            device: self.device.clone(),
            create_info: vk::SamplerCreateInfo {
                s_type: vk::StructureType::SAMPLER_CREATE_INFO,
                p_next: ptr::null(),
                flags: vk::SamplerCreateFlags::empty(),
                mag_filter: vk::Filter::LINEAR,
                min_filter: vk::Filter::LINEAR,
                mipmap_mode: vk::SamplerMipmapMode::LINEAR,
                address_mode_u: vk::SamplerAddressMode::REPEAT,
                address_mode_v: vk::SamplerAddressMode::REPEAT,
                address_mode_w: vk::SamplerAddressMode::REPEAT,
                mip_lod_bias: 0.0,
                anisotropy_enable: vk::TRUE,
                max_anisotropy: self.max_anisotropy,
                compare_enable: vk::FALSE,
                compare_op: vk::CompareOp::ALWAYS,
                min_lod: 0.0,
                max_lod: (key - 1) as f32,
                border_color: vk::BorderColor::INT_OPAQUE_BLACK,
                unnormalized_coordinates: vk::FALSE,
                _marker: Default::default(),
            },
        })?;
        let handle = sampler.handle();
        self.mipmap_samplers.insert(key, sampler);
        Ok(handle)
    }

    pub fn get_or_create_nearest_sampler(&mut self) -> Result<vk::Sampler> {
        if let Some(sampler) = self.nearest_sampler.as_ref() {
            return Ok(sampler.handle());
        }
        let sampler = self.create_clamped_sampler(vk::Filter::NEAREST, vk::SamplerMipmapMode::NEAREST)?;
        let handle = sampler.handle();
        self.nearest_sampler = Some(sampler);
        Ok(handle)
    }

    pub fn get_or_create_linear_sampler(&mut self) -> Result<vk::Sampler> {
        if let Some(sampler) = self.linear_sampler.as_ref() {
            return Ok(sampler.handle());
        }
        let sampler = self.create_clamped_sampler(vk::Filter::LINEAR, vk::SamplerMipmapMode::NEAREST)?;
        let handle = sampler.handle();
        self.linear_sampler = Some(sampler);
        Ok(handle)
    }

    fn create_clamped_sampler(
        &self,
        filter: vk::Filter,
        mipmap_mode: vk::SamplerMipmapMode,
    ) -> Result<Sampler> {
        Sampler::new(SamplerCreateInfo::FromCreateInfo {
            device: self.device.clone(),
            create_info: vk::SamplerCreateInfo {
                s_type: vk::StructureType::SAMPLER_CREATE_INFO,
                p_next: ptr::null(),
                flags: vk::SamplerCreateFlags::empty(),
                mag_filter: filter,
                min_filter: filter,
                mipmap_mode,
                address_mode_u: vk::SamplerAddressMode::CLAMP_TO_EDGE,
                address_mode_v: vk::SamplerAddressMode::CLAMP_TO_EDGE,
                address_mode_w: vk::SamplerAddressMode::CLAMP_TO_EDGE,
                mip_lod_bias: 0.0,
                anisotropy_enable: vk::FALSE,
                max_anisotropy: self.max_anisotropy,
                compare_enable: vk::FALSE,
                compare_op: vk::CompareOp::ALWAYS,
                min_lod: 0.0,
                max_lod: 8.0,
                border_color: vk::BorderColor::INT_OPAQUE_BLACK,
                unnormalized_coordinates: vk::FALSE,
                _marker: Default::default(),
            },
        })
    }

    pub fn destroy_mipmap_samplers(&mut self) {
        for (_, mut sampler) in self.mipmap_samplers.drain() {
            sampler.destroy();
        }
    }

    pub fn destroy_nearest_sampler(&mut self) {
        if let Some(mut sampler) = self.nearest_sampler.take() {
            sampler.destroy();
        }
    }

    pub fn destroy_linear_sampler(&mut self) {
        if let Some(mut sampler) = self.linear_sampler.take() {
            sampler.destroy();
        }
    }
}

impl Destructible for SamplerCache {
    fn destroy(&mut self) {
        self.destroy_mipmap_samplers();
        self.destroy_nearest_sampler();
        self.destroy_linear_sampler();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mipmap_key_is_the_chain_length() {
        assert_eq!(mipmap_sampler_key(1024, 1024), 11);
        assert_eq!(mipmap_sampler_key(1, 1), 1);
        // differently shaped extents with the same chain share a sampler
        assert_eq!(mipmap_sampler_key(1024, 2), mipmap_sampler_key(4, 1024));
    }
}
