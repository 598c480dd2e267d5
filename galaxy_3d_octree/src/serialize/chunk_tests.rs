use glam::Vec3;
use crate::error::Error;
use crate::math::AABB;
use super::*;

// ============================================================================
// BYTE ORDER
// ============================================================================

#[test]
fn test_little_endian_layout() {
    let mut writer = ChunkWriter::new(Endian::Little);
    writer.write_u32(0x0102_0304);
    writer.write_u16(0x0506);
    assert_eq!(writer.as_bytes(), &[0x04, 0x03, 0x02, 0x01, 0x06, 0x05]);
}

#[test]
fn test_big_endian_layout() {
    let mut writer = ChunkWriter::new(Endian::Big);
    writer.write_u32(0x0102_0304);
    writer.write_u16(0x0506);
    assert_eq!(writer.as_bytes(), &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
}

#[test]
fn test_reader_honours_byte_order() {
    let bytes = [0x01, 0x02, 0x03, 0x04];
    assert_eq!(ChunkReader::new(&bytes, Endian::Big).read_u32().unwrap(), 0x0102_0304);
    assert_eq!(ChunkReader::new(&bytes, Endian::Little).read_u32().unwrap(), 0x0403_0201);
}

#[test]
fn test_mixed_fields_in_both_orders() {
    for endian in [Endian::Little, Endian::Big] {
        let bbox = AABB::new(Vec3::new(-1.5, 2.0, -3.25), Vec3::new(4.0, 5.5, 6.0));
        let mut writer = ChunkWriter::new(endian);
        writer.write_u8(7);
        writer.write_i8(-3);
        writer.write_u64(0xDEAD_BEEF_0000_0001);
        writer.write_aabb(&bbox);
        writer.pad(2);
        writer.write_f32(0.125);

        let bytes = writer.into_bytes();
        let mut reader = ChunkReader::new(&bytes, endian);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_i8().unwrap(), -3);
        assert_eq!(reader.read_u64().unwrap(), 0xDEAD_BEEF_0000_0001);
        assert_eq!(reader.read_aabb().unwrap(), bbox);
        reader.skip(2).unwrap();
        assert_eq!(reader.read_f32().unwrap(), 0.125);
        assert!(reader.is_empty());
    }
}

#[test]
fn test_endian_byte() {
    assert_eq!(Endian::from_byte(Endian::Big.to_byte()), Some(Endian::Big));
    assert_eq!(Endian::from_byte(Endian::Little.to_byte()), Some(Endian::Little));
    assert_eq!(Endian::from_byte(9), None);
}

// ============================================================================
// PATCH / ERRORS
// ============================================================================

#[test]
fn test_patch_u32() {
    let mut writer = ChunkWriter::new(Endian::Big);
    writer.write_u8(0xFF);
    let at = writer.position();
    writer.write_u32(0);
    writer.write_u8(0xEE);
    writer.patch_u32(at, 0x0A0B_0C0D).unwrap();
    assert_eq!(writer.as_bytes(), &[0xFF, 0x0A, 0x0B, 0x0C, 0x0D, 0xEE]);
}

#[test]
fn test_patch_past_end_fails() {
    let mut writer = ChunkWriter::new(Endian::Little);
    writer.write_u16(1);
    assert!(matches!(writer.patch_u32(0, 5), Err(Error::UnexpectedEndOfData { needed: 4, available: 2 })));
}

#[test]
fn test_read_past_end_fails() {
    let bytes = [1u8, 2, 3];
    let mut reader = ChunkReader::new(&bytes, Endian::Little);
    assert_eq!(
        reader.read_u32(),
        Err(Error::UnexpectedEndOfData { needed: 4, available: 3 })
    );
    // Failed reads consume nothing
    assert_eq!(reader.position(), 0);
    assert_eq!(reader.read_u16().unwrap(), 0x0201);
}
