use polybin::{
    CodecError, Converter, Endian, Object, PropertyFlags, Reader, RegExp, Serializer,
    SerializerOptions, Tag, TypeConverter, UserObject, Value, Writer,
};

fn round_trip(serializer: &Serializer, value: &Value) -> Value {
    let bytes = serializer.serialize(value).unwrap();
    serializer.deserialize(&bytes).unwrap()
}

fn sample_date() -> Value {
    // 2024-01-02T03:04:05.678Z
    Value::date_from_millis(1_704_164_645_678).unwrap()
}

#[test]
fn test_string_layout() {
    let serializer = Serializer::new();
    let bytes = serializer.serialize(&Value::from("hi")).unwrap();
    assert_eq!(&bytes[..], &[4, 2, 0, 0, 0, b'h', b'i']);

    let big = Serializer::with_options(SerializerOptions {
        endian: Endian::Big,
        ..SerializerOptions::default()
    });
    let bytes = big.serialize(&Value::from("hi")).unwrap();
    assert_eq!(&bytes[..], &[4, 0, 0, 0, 2, b'h', b'i']);
    assert_eq!(big.deserialize(&bytes).unwrap(), Value::from("hi"));
}

#[test]
fn test_number_layout() {
    let serializer = Serializer::new();
    let bytes = serializer.serialize(&Value::from(3.5)).unwrap();
    let mut expected = vec![3u8];
    expected.extend_from_slice(&3.5f64.to_le_bytes());
    assert_eq!(&bytes[..], &expected[..]);

    // integers are never compacted
    let bytes = serializer.serialize(&Value::from(1u8)).unwrap();
    assert_eq!(bytes.len(), 9);
}

#[test]
fn test_scalar_layouts() {
    let serializer = Serializer::new();
    assert_eq!(&serializer.serialize(&Value::Null).unwrap()[..], &[0]);
    assert_eq!(&serializer.serialize(&Value::Undefined).unwrap()[..], &[1]);
    assert_eq!(&serializer.serialize(&Value::from(true)).unwrap()[..], &[2, 1]);
    assert_eq!(&serializer.serialize(&Value::from(false)).unwrap()[..], &[2, 0]);
}

#[test]
fn test_array_layout() {
    let serializer = Serializer::new();
    let value = Value::Array(vec![Value::from(1.0), Value::from("a")]);
    let bytes = serializer.serialize(&value).unwrap();
    assert_eq!(bytes.len(), 20);
    assert_eq!(&bytes[..5], &[7, 2, 0, 0, 0]);
    assert_eq!(bytes[5], 3);
    assert_eq!(&bytes[14..], &[4, 1, 0, 0, 0, b'a']);
    assert_eq!(serializer.deserialize(&bytes).unwrap(), value);
}

#[test]
fn test_object_layout() {
    let serializer = Serializer::new();
    let mut object = Object::new();
    object.insert("a", 1.0);
    let bytes = serializer.serialize(&Value::Object(object.clone())).unwrap();
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[..7], &[8, 1, 1, 0, 0, 0, b'a']);
    assert_eq!(bytes[7], 3);
    assert_eq!(&bytes[8..], &1.0f64.to_le_bytes());
    assert_eq!(
        serializer.deserialize(&bytes).unwrap(),
        Value::Object(object)
    );
}

#[test]
fn test_first_byte_is_kind_tag() {
    let serializer = Serializer::new();
    let values = vec![
        Value::Null,
        Value::Undefined,
        Value::from(true),
        Value::from(-0.5),
        Value::from("text"),
        sample_date(),
        Value::Array(vec![]),
        Value::Object(Object::new()),
        Value::user("Marker", Object::new()),
    ];
    let expected = [0u8, 1, 2, 3, 4, 5, 7, 8, 255];
    for (value, tag) in values.iter().zip(expected) {
        let bytes = serializer.serialize(value).unwrap();
        assert_eq!(bytes[0], tag, "{:?}", value);
        assert_eq!(u8::from(value.tag()), tag);
    }
}

#[test]
fn test_output_has_no_trailing_capacity() {
    let serializer = Serializer::with_options(SerializerOptions {
        initial_capacity: 4,
        growth: 3,
        ..SerializerOptions::default()
    });
    let value = Value::Array(vec![Value::from("abcdefghij"); 50]);
    let bytes = serializer.serialize(&value).unwrap();
    assert_eq!(bytes.len(), 1 + 4 + 50 * (1 + 4 + 10));
    assert_eq!(serializer.deserialize(&bytes).unwrap(), value);
}

#[test]
fn test_round_trip_nested_values() {
    let serializer = Serializer::new();
    let mut inner = Object::new();
    inner.insert("flag", false);
    inner.insert("missing", Value::Undefined);
    inner.insert("none", Value::Null);

    let mut outer = Object::new();
    outer.insert("name", "caf\u{e9}");
    outer.insert("count", 42u32);
    outer.insert("items", Value::Array(vec![Value::from(1.5), Value::from("x")]));
    outer.insert("inner", inner);
    outer.insert("when", sample_date());

    let value = Value::Object(outer);
    assert_eq!(round_trip(&serializer, &value), value);
}

#[test]
fn test_special_numbers() {
    let serializer = Serializer::new();
    for n in [0.0, -0.0, f64::INFINITY, f64::NEG_INFINITY, f64::MIN_POSITIVE, 1e300] {
        assert_eq!(round_trip(&serializer, &Value::from(n)), Value::from(n));
    }
    let nan = round_trip(&serializer, &Value::from(f64::NAN));
    assert!(nan.as_f64().unwrap().is_nan());
}

#[test]
fn test_empty_containers() {
    let serializer = Serializer::new();
    for value in [
        Value::from(""),
        Value::Array(vec![]),
        Value::Object(Object::new()),
    ] {
        assert_eq!(round_trip(&serializer, &value), value);
    }
}

#[test]
fn test_date_is_a_string_unit() {
    let serializer = Serializer::new();
    let date = sample_date();
    let bytes = serializer.serialize(&date).unwrap();
    assert_eq!(bytes.len(), 30);
    assert_eq!(&bytes[..6], &[5, 4, 24, 0, 0, 0]);
    assert_eq!(&bytes[6..], b"2024-01-02T03:04:05.678Z");
    assert_eq!(serializer.deserialize(&bytes).unwrap(), date);
}

#[test]
fn test_date_with_bad_payload() {
    let serializer = Serializer::new();
    let err = serializer.deserialize(&[5, 0]).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));

    let mut bytes = vec![5, 4, 3, 0, 0, 0];
    bytes.extend_from_slice(b"now");
    assert!(matches!(
        serializer.deserialize(&bytes),
        Err(CodecError::Decode(_))
    ));
}

#[test]
fn test_boolean_reads_least_significant_bit() {
    let serializer = Serializer::new();
    assert_eq!(serializer.deserialize(&[2, 3]).unwrap(), Value::from(true));
    assert_eq!(serializer.deserialize(&[2, 2]).unwrap(), Value::from(false));
}

#[test]
fn test_only_writable_enumerable_properties_are_written() {
    let serializer = Serializer::new();
    let mut object = Object::new();
    object.insert("shown", 1.0);
    object.define("locked", 2.0, PropertyFlags::READONLY);
    object.define("secret", 3.0, PropertyFlags::HIDDEN);
    object.define(
        "both",
        4.0,
        PropertyFlags {
            writable: false,
            enumerable: false,
        },
    );

    let decoded = round_trip(&serializer, &Value::Object(object));
    let decoded = decoded.as_object().unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded.get("shown"), Some(&Value::from(1.0)));
    assert!(!decoded.contains_key("locked"));
    assert!(!decoded.contains_key("secret"));
}

#[test]
fn test_object_property_limit() {
    let serializer = Serializer::new();
    let full: Object = (0..255).map(|i| (format!("k{}", i), f64::from(i))).collect();
    let value = Value::Object(full);
    assert_eq!(round_trip(&serializer, &value), value);

    let too_many: Object = (0..256).map(|i| (format!("k{}", i), f64::from(i))).collect();
    assert!(matches!(
        serializer.serialize(&Value::Object(too_many)),
        Err(CodecError::Encode(_))
    ));

    // hidden properties do not count
    let mut mixed: Object = (0..255).map(|i| (format!("k{}", i), f64::from(i))).collect();
    mixed.define("extra", 0.0, PropertyFlags::HIDDEN);
    assert!(serializer.serialize(&Value::Object(mixed)).is_ok());
}

#[test]
fn test_non_latin1_text_is_rejected() {
    let serializer = Serializer::new();
    assert!(matches!(
        serializer.serialize(&Value::from("\u{65e5}\u{672c}")),
        Err(CodecError::Encode(_))
    ));

    let mut object = Object::new();
    object.insert("\u{1F600}", 1.0);
    assert!(matches!(
        serializer.serialize(&Value::Object(object)),
        Err(CodecError::Encode(_))
    ));
}

#[test]
fn test_user_type_name_limit() {
    let serializer = Serializer::new();
    let name = "T".repeat(256);
    assert!(matches!(
        serializer.serialize(&Value::user(name, Object::new())),
        Err(CodecError::Encode(_))
    ));
}

#[test]
fn test_unknown_user_type_fails_to_decode() {
    let serializer = Serializer::new();
    let bytes = [255, 2, b'P', b't', 0];
    match serializer.deserialize(&bytes) {
        Err(CodecError::NoConverter { name }) => assert_eq!(name, "Pt"),
        other => panic!("expected NoConverter, got {:?}", other),
    }
}

#[test]
fn test_fallback_converter_is_created_on_encode() {
    let serializer = Serializer::new();
    let mut properties = Object::new();
    properties.insert("x", 1.0);
    let value = Value::user("Pt", properties);

    assert!(!serializer.has_converter("Pt"));
    let bytes = serializer.serialize(&value).unwrap();
    assert!(serializer.has_converter("Pt"));
    assert_eq!(bytes.len(), 19);
    assert_eq!(&bytes[..4], &[255, 2, b'P', b't']);

    let decoded = serializer.deserialize(&bytes).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(decoded.type_name(), Some("Pt"));

    // another instance has its own registry
    let other = Serializer::new();
    assert!(matches!(
        other.deserialize(&bytes),
        Err(CodecError::NoConverter { .. })
    ));

    assert!(serializer.remove_converter("Pt").is_some());
    assert!(matches!(
        serializer.deserialize(&bytes),
        Err(CodecError::NoConverter { .. })
    ));
}

/// Packs `x`, `y`, `z` as three bare floats.
struct Vec3Converter;

impl Converter for Vec3Converter {
    fn encode(&self, _: &Serializer, writer: &mut Writer, value: &Value) -> polybin::Result<()> {
        let object = value
            .as_object()
            .ok_or_else(|| CodecError::Encode("Vec3 needs properties".to_string()))?;
        for key in ["x", "y", "z"] {
            let n = object.get(key).and_then(Value::as_f64).unwrap_or(0.0);
            writer.write_f64(n);
        }
        Ok(())
    }

    fn decode(&self, _: &Serializer, reader: &mut Reader) -> polybin::Result<Value> {
        let mut object = Object::with_capacity(3);
        for key in ["x", "y", "z"] {
            object.insert(key, reader.read_f64()?);
        }
        Ok(Value::User(UserObject::new("Vec3", object)))
    }
}

impl TypeConverter for Vec3Converter {
    fn type_name(&self) -> &str {
        "Vec3"
    }
}

#[test]
fn test_custom_converter() {
    let serializer = Serializer::new();
    assert!(serializer.add_converter(Vec3Converter).is_none());
    assert!(serializer.has_converter("Vec3"));

    let properties: Object = [("x", 1.0), ("y", 2.0), ("z", 3.0)].into_iter().collect();
    let value = Value::Array(vec![Value::user("Vec3", properties), Value::from("end")]);
    let bytes = serializer.serialize(&value).unwrap();
    // array header, user header, three floats, trailing string
    assert_eq!(bytes.len(), 5 + 6 + 24 + 8);
    assert_eq!(serializer.deserialize(&bytes).unwrap(), value);

    // replacing returns the previous converter
    assert!(serializer.add_converter(Vec3Converter).is_some());
    assert!(serializer.remove_converter("Vec3").is_some());
    assert!(serializer.remove_converter("Vec3").is_none());
    assert!(!serializer.has_converter("Vec3"));
}

#[test]
fn test_regexp_is_decode_only() {
    let serializer = Serializer::new();
    let err = serializer
        .serialize(&Value::RegExp(RegExp::new("a+", "g")))
        .unwrap_err();
    assert!(matches!(err, CodecError::NotImplemented(_)));

    assert_eq!(
        serializer.deserialize(&[6]).unwrap(),
        Value::RegExp(RegExp::default())
    );

    // the regexp payload is empty, so the next element follows the tag directly
    let decoded = serializer.deserialize(&[7, 2, 0, 0, 0, 6, 0]).unwrap();
    assert_eq!(
        decoded,
        Value::Array(vec![Value::RegExp(RegExp::default()), Value::Null])
    );
}

#[test]
fn test_malformed_input() {
    let serializer = Serializer::new();
    assert!(matches!(serializer.deserialize(&[]), Err(CodecError::Empty)));
    assert!(matches!(
        serializer.deserialize(&[42]),
        Err(CodecError::Decode(_))
    ));
    assert!(matches!(
        serializer.deserialize(&[3, 0, 0]),
        Err(CodecError::InsufficientData { .. })
    ));
    assert!(matches!(
        serializer.deserialize(&[4, 5, 0, 0, 0, b'a']),
        Err(CodecError::InsufficientData { .. })
    ));
    assert!(matches!(
        serializer.deserialize(&[7, 0xFF, 0xFF, 0xFF, 0xFF]),
        Err(CodecError::InsufficientData { .. })
    ));
}

#[test]
fn test_trailing_bytes_are_ignored() {
    let serializer = Serializer::new();
    assert_eq!(serializer.deserialize(&[0, 9, 9]).unwrap(), Value::Null);
}

#[test]
fn test_tag_conversion() {
    assert_eq!(Tag::try_from(8u8).unwrap(), Tag::Object);
    assert_eq!(Tag::try_from(255u8).unwrap(), Tag::UserDefined);
    assert!(Tag::try_from(9u8).is_err());
}

#[test]
fn test_default_instance() {
    let value = Value::Array(vec![Value::Null, Value::from("x")]);
    let bytes = polybin::serialize(&value).unwrap();
    assert_eq!(polybin::deserialize(&bytes).unwrap(), value);

    let user = Value::user("DefaultOnly", Object::new());
    let bytes = polybin::serialize(&user).unwrap();
    assert!(polybin::with_default(|s| s.has_converter("DefaultOnly")));
    assert_eq!(polybin::deserialize(&bytes).unwrap(), user);
    assert!(!Serializer::new().has_converter("DefaultOnly"));
}

#[test]
fn test_converter_in_isolation() {
    use polybin::core::ArrayConverter;

    let serializer = Serializer::new();
    let value = Value::Array(vec![Value::from(true), Value::Null]);
    let mut writer = Writer::default();
    ArrayConverter.encode(&serializer, &mut writer, &value).unwrap();
    // the converter writes its payload only; the tag belongs to the serializer
    assert_eq!(writer.as_slice(), &[2, 0, 0, 0, 2, 1, 0]);

    let mut reader = Reader::from_bytes(writer.into_bytes());
    assert_eq!(ArrayConverter.decode(&serializer, &mut reader).unwrap(), value);
    assert!(reader.is_eof());
}
