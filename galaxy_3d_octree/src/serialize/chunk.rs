/// Endian-aware chunk codec.
///
/// Every multi-byte field goes through an explicit byte-order conversion,
/// so a blob written on one platform decodes identically on another.

use glam::Vec3;
use crate::error::{Error, Result};
use crate::math::AABB;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    #[cfg(target_endian = "little")]
    pub const NATIVE: Endian = Endian::Little;
    #[cfg(target_endian = "big")]
    pub const NATIVE: Endian = Endian::Big;

    pub fn to_byte(self) -> u8 {
        match self {
            Endian::Little => 0,
            Endian::Big => 1,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Endian::Little),
            1 => Some(Endian::Big),
            _ => None,
        }
    }
}

macro_rules! write_scalar {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) {
            let bytes = match self.endian {
                Endian::Little => value.to_le_bytes(),
                Endian::Big => value.to_be_bytes(),
            };
            self.data.extend_from_slice(&bytes);
        }
    };
}

macro_rules! read_scalar {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty> {
            let bytes = self.take::<{ std::mem::size_of::<$ty>() }>()?;
            Ok(match self.endian {
                Endian::Little => <$ty>::from_le_bytes(bytes),
                Endian::Big => <$ty>::from_be_bytes(bytes),
            })
        }
    };
}

pub struct ChunkWriter {
    data: Vec<u8>,
    endian: Endian,
}

impl ChunkWriter {
    pub fn new(endian: Endian) -> Self {
        Self { data: Vec::new(), endian }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.data.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.data.push(value as u8);
    }

    write_scalar!(write_u16, u16);
    write_scalar!(write_u32, u32);
    write_scalar!(write_u64, u64);
    write_scalar!(write_f32, f32);

    pub fn write_vec3(&mut self, value: Vec3) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
    }

    pub fn write_aabb(&mut self, value: &AABB) {
        self.write_vec3(value.min);
        self.write_vec3(value.max);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Zero padding
    pub fn pad(&mut self, count: usize) {
        self.data.resize(self.data.len() + count, 0);
    }

    /// Overwrite a `u32` written earlier (size fields known only afterwards).
    pub fn patch_u32(&mut self, position: usize, value: u32) -> Result<()> {
        let available = self.data.len().saturating_sub(position);
        let Some(slot) = self.data.get_mut(position..position + 4) else {
            return Err(Error::UnexpectedEndOfData { needed: 4, available });
        };
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        slot.copy_from_slice(&bytes);
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

pub struct ChunkReader<'a> {
    data: &'a [u8],
    position: usize,
    endian: Endian,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self { data, position: 0, endian }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(Error::UnexpectedEndOfData { needed: count, available: self.remaining() });
        }
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take::<1>()?[0] as i8)
    }

    read_scalar!(read_u16, u16);
    read_scalar!(read_u32, u32);
    read_scalar!(read_u64, u64);
    read_scalar!(read_f32, f32);

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_aabb(&mut self) -> Result<AABB> {
        let min = self.read_vec3()?;
        let max = self.read_vec3()?;
        Ok(AABB::new(min, max))
    }
}

#[cfg(test)]
#[path = "chunk_tests.rs"]
mod tests;
