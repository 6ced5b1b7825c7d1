use bytes::{BufMut, Bytes, BytesMut};
use polybin::{CodecError, CursorOptions, Endian, Reader, Writer};

#[test]
fn test_read_integers_little_and_big_endian() {
    let data = Bytes::from_static(&[0x01, 0x02, 0x03, 0x04]);

    let mut le = Reader::from_bytes(data.clone());
    assert_eq!(le.read_u16().unwrap(), 0x0201);
    assert_eq!(le.read_u16().unwrap(), 0x0403);
    assert!(le.is_eof());

    let mut be = Reader::with_endian(data, Endian::Big);
    assert_eq!(be.read_u32().unwrap(), 0x0102_0304);
    assert!(be.is_eof());
}

#[test]
fn test_signed_and_float_reads() {
    let mut buffer = BytesMut::new();
    buffer.put_i8(-5);
    buffer.put_i16_le(-300);
    buffer.put_i32_le(-70_000);
    buffer.put_f32_le(1.25);
    buffer.put_f64_le(-2.5);

    let mut reader = Reader::from_bytes(buffer.freeze());
    assert_eq!(reader.read_i8().unwrap(), -5);
    assert_eq!(reader.read_i16().unwrap(), -300);
    assert_eq!(reader.read_i32().unwrap(), -70_000);
    assert_eq!(reader.read_f32().unwrap(), 1.25);
    assert_eq!(reader.read_f64().unwrap(), -2.5);
    assert!(reader.is_eof());
}

#[test]
fn test_peek_does_not_move_offset() {
    let mut reader = Reader::from_bytes(Bytes::from_static(&[9, 8, 7, 6, 5, 4, 3, 2, 1]));
    reader.skip(1).unwrap();
    let before = reader.offset();

    assert_eq!(reader.peek_u8().unwrap(), 8);
    assert_eq!(reader.peek_u32().unwrap(), u32::from_le_bytes([8, 7, 6, 5]));
    assert_eq!(reader.peek_u64().unwrap(), u64::from_le_bytes([8, 7, 6, 5, 4, 3, 2, 1]));
    assert_eq!(reader.peek_u8_array(4).unwrap(), vec![8, 7, 6, 5]);
    assert_eq!(reader.peek_string(2, false).unwrap(), "\u{8}\u{7}");
    assert_eq!(&reader.peek_bytes(3).unwrap()[..], &[8, 7, 6]);

    assert_eq!(reader.offset(), before);
}

#[test]
fn test_read_array_advances_by_total_width() {
    let mut buffer = BytesMut::new();
    for v in [10u16, 20, 30] {
        buffer.put_u16_le(v);
    }
    buffer.put_u8(0xFF);

    let mut reader = Reader::from_bytes(buffer.freeze());
    assert_eq!(reader.peek_u16_array(3).unwrap(), vec![10, 20, 30]);
    assert_eq!(reader.offset(), 0);
    assert_eq!(reader.read_u16_array(3).unwrap(), vec![10, 20, 30]);
    assert_eq!(reader.offset(), 6);
    assert_eq!(reader.read_u8().unwrap(), 0xFF);
}

#[test]
fn test_64_bit_reads_match_two_word_assembly() {
    for endian in [Endian::Little, Endian::Big] {
        let mut writer = Writer::with_capacity(16, endian);
        writer.write_i64(-2);
        writer.write_u64(0x0123_4567_89AB_CDEF);
        let bytes = writer.into_bytes();

        let mut words = Reader::with_endian(bytes.clone(), endian);
        let (first, second) = (words.read_u32().unwrap(), words.read_u32().unwrap());
        let (low, high) = match endian {
            Endian::Little => (first, second),
            Endian::Big => (second, first),
        };
        let assembled = ((u64::from(high) << 32) | u64::from(low)) as i64;

        let mut reader = Reader::with_endian(bytes, endian);
        assert_eq!(reader.read_i64().unwrap(), -2);
        assert_eq!(assembled, -2);
        assert_eq!(reader.read_u64().unwrap(), 0x0123_4567_89AB_CDEF);
    }
}

#[test]
fn test_bool_uses_least_significant_bit() {
    let mut reader = Reader::from_bytes(Bytes::from_static(&[0x03, 0x02, 0x00, 0x01]));
    assert_eq!(reader.read_bool_array(4).unwrap(), vec![true, false, false, true]);

    let mut writer = Writer::default();
    writer.write_bool(true);
    writer.write_bool(false);
    assert_eq!(writer.as_slice(), &[1, 0]);
}

#[test]
fn test_strings_and_chars() {
    let mut reader = Reader::from_bytes(Bytes::from_static(b"ab  cd\xE9"));
    assert_eq!(reader.read_string(4, true).unwrap(), "ab");
    assert_eq!(reader.read_char().unwrap(), 'c');
    assert_eq!(reader.read_string(2, false).unwrap(), "dé");
    assert!(reader.is_eof());
}

#[test]
fn test_prefixed_string_round_trip() {
    let mut writer = Writer::default();
    writer.write_prefixed_string("hello").unwrap();
    assert_eq!(writer.as_slice(), &[5, 0, 0, 0, b'h', b'e', b'l', b'l', b'o']);

    let mut reader = Reader::from_bytes(writer.into_bytes());
    assert_eq!(reader.read_prefixed_string().unwrap(), "hello");
}

#[test]
fn test_truncated_prefixed_string_restores_offset() {
    let mut reader = Reader::from_bytes(Bytes::from_static(&[10, 0, 0, 0, b'x']));
    let err = reader.read_prefixed_string().unwrap_err();
    assert!(matches!(
        err,
        CodecError::InsufficientData {
            needed: 10,
            remaining: 1
        }
    ));
    assert_eq!(reader.offset(), 0);
}

#[test]
fn test_wide_characters_are_rejected() {
    let mut writer = Writer::default();
    assert!(matches!(writer.write_char('日'), Err(CodecError::Encode(_))));
    assert!(matches!(
        writer.write_prefixed_string("caf\u{e9}\u{1F600}"),
        Err(CodecError::Encode(_))
    ));
    assert_eq!(writer.offset(), 0);
}

#[test]
fn test_read_bytes_copies_range() {
    let mut reader = Reader::from_bytes(Bytes::from_static(&[1, 2, 3, 4, 5]));
    reader.skip(1).unwrap();
    let bytes = reader.read_bytes(3).unwrap();
    assert_eq!(&bytes[..], &[2, 3, 4]);
    assert_eq!(reader.offset(), 4);
    assert_eq!(reader.remaining(), 1);
}

#[test]
fn test_read_past_end_fails_without_moving() {
    let mut reader = Reader::from_bytes(Bytes::from_static(&[1, 2, 3]));
    reader.skip(2).unwrap();
    let err = reader.read_u16().unwrap_err();
    assert!(matches!(
        err,
        CodecError::InsufficientData {
            needed: 2,
            remaining: 1
        }
    ));
    assert_eq!(reader.offset(), 2);
    assert!(reader.read_u8_array(2).is_err());
    assert_eq!(reader.offset(), 2);
}

#[test]
fn test_declared_length_limits_reads() {
    let options = CursorOptions::new()
        .buffer(Bytes::from_static(&[1, 2, 3, 4]))
        .offset(1)
        .length(2);
    let mut reader = Reader::new(options).unwrap();
    assert_eq!(reader.len(), 2);
    assert_eq!(reader.read_u8().unwrap(), 2);
    assert!(reader.is_eof());
    assert!(reader.read_u8().is_err());
}

#[test]
fn test_seek_and_skip() {
    let mut reader = Reader::from_bytes(Bytes::from_static(&[0, 1, 2, 3]));
    reader.seek(3).unwrap();
    assert_eq!(reader.read_u8().unwrap(), 3);
    reader.seek(1).unwrap();
    assert_eq!(reader.read_u8().unwrap(), 1);
    assert!(matches!(
        reader.seek(5),
        Err(CodecError::OutOfBounds {
            offset: 5,
            length: 4
        })
    ));
    assert!(reader.skip(3).is_err());
    assert_eq!(reader.offset(), 2);
}

#[test]
fn test_invalid_options_are_rejected() {
    let too_long = CursorOptions::new()
        .buffer(Bytes::from_static(&[0, 0]))
        .length(3);
    assert!(matches!(Reader::new(too_long), Err(CodecError::Config(_))));

    let bad_offset = CursorOptions::new()
        .buffer(Bytes::from_static(&[0, 0]))
        .offset(3);
    assert!(matches!(Writer::new(bad_offset), Err(CodecError::Config(_))));
}

#[test]
fn test_default_buffers() {
    let reader = Reader::new(CursorOptions::new()).unwrap();
    assert!(reader.is_empty());
    assert!(reader.is_eof());

    let writer = Writer::new(CursorOptions::new().endian(Endian::Big)).unwrap();
    assert_eq!(writer.capacity(), 1024);
    assert_eq!(writer.endian(), Endian::Big);
    assert_eq!(writer.offset(), 0);
}

#[test]
fn test_writer_growth_preserves_bytes() {
    let mut writer = Writer::with_capacity(4, Endian::Little).with_growth(4);
    writer.write_u32(0xDDCC_BBAA);
    assert_eq!(writer.capacity(), 4);
    writer.write_u16(0x1122);
    assert_eq!(writer.capacity(), 8);
    writer.write_bytes(&[1; 9]);
    assert_eq!(writer.capacity(), 16);

    let bytes = writer.into_bytes();
    assert_eq!(bytes.len(), 15);
    assert_eq!(&bytes[..6], &[0xAA, 0xBB, 0xCC, 0xDD, 0x22, 0x11]);
    assert_eq!(&bytes[6..], &[1; 9]);
}

#[test]
fn test_default_writer_grows_by_fixed_increment() {
    let mut writer = Writer::default();
    writer.write_bytes(&[7; 1024]);
    assert_eq!(writer.capacity(), 1024);
    writer.write_u8(8);
    assert_eq!(writer.capacity(), 2048);
    assert_eq!(writer.into_bytes().len(), 1025);
}

#[test]
fn test_patch_writes_without_advancing() {
    let mut writer = Writer::default();
    writer.write_u32(0);
    writer.write_u8(b'x');
    writer.seek(0);
    writer.patch_u32(1);
    assert_eq!(writer.offset(), 0);
    writer.seek(5);
    writer.patch_u16_array(&[3, 4]);
    assert_eq!(writer.offset(), 5);
    assert_eq!(writer.as_slice(), &[1, 0, 0, 0, b'x']);

    writer.skip(4);
    assert_eq!(writer.as_slice(), &[1, 0, 0, 0, b'x', 3, 0, 4, 0]);
}

#[test]
fn test_writer_from_existing_buffer() {
    let options = CursorOptions::new()
        .buffer(Bytes::from_static(&[9, 9, 9, 9]))
        .offset(2);
    let mut writer = Writer::new(options).unwrap();
    writer.write_u8(1);
    assert_eq!(writer.as_slice(), &[9, 9, 1]);
}
