/// Property-based round-trip tests for the wire codec.
///
/// Generates random trees (every scalar tag, byte strings, nested arrays and
/// objects with possibly repeated keys) and checks that `decode(encode(v)) == v`
/// and that the construction cursor produces the same bytes as `encode`.
///
/// Floats are drawn from finite ranges; NaN would never compare equal.
use proptest::prelude::*;
use ubjwire_codec::{
    decode, decode_with, encode, encode_with, CodecConfig, Context, Entry, FloatOrder, Value,
};

fn arb_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..16),
        // Payloads full of structural bytes
        prop::collection::vec(prop::sample::select(b"{}[]SiUN".to_vec()), 0..16),
        // Crosses the int8/uint8 length thresholds
        (120usize..140).prop_map(|n| vec![b'x'; n]),
        Just(vec![b'y'; 300]),
    ]
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(Value::NoOp),
        any::<bool>().prop_map(Value::bool),
        any::<i8>().prop_map(Value::Int8),
        any::<u8>().prop_map(Value::UInt8),
        any::<i16>().prop_map(Value::Int16),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        (-1.0e6f32..1.0e6f32).prop_map(Value::Float32),
        (-1.0e12f64..1.0e12f64).prop_map(Value::Float64),
        any::<u8>().prop_map(Value::Char),
        arb_bytes().prop_map(Value::String),
    ]
}

fn arb_key() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::sample::select(vec!["command", "offset", "artist", "id", ""])
            .prop_map(|k| k.as_bytes().to_vec()),
        arb_bytes(),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((arb_key(), inner), 0..6).prop_map(|pairs| {
                Value::Object(
                    pairs
                        .into_iter()
                        .map(|(key, value)| Entry { key, value })
                        .collect(),
                )
            }),
        ]
    })
}

fn arb_root() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(arb_value(), 0..6).prop_map(Value::Array),
        prop::collection::vec((arb_key(), arb_value()), 0..6).prop_map(|pairs| {
            Value::Object(
                pairs
                    .into_iter()
                    .map(|(key, value)| Entry { key, value })
                    .collect(),
            )
        }),
    ]
}

/// Rebuild `value` inside the current construction frame through the cursor API.
fn build(ctx: &mut Context, key: Option<&[u8]>, value: &Value) {
    let nested = match value {
        Value::Array(_) => Some(Value::empty_array()),
        Value::Object(_) => Some(Value::empty_object()),
        _ => None,
    };
    let appended = nested.unwrap_or_else(|| value.clone());
    match key {
        Some(key) => ctx.add_kv_pair(key, appended).unwrap(),
        None => ctx.add(appended).unwrap(),
    }
    if value.is_collection() {
        ctx.enter_collection().unwrap();
        fill(ctx, value);
        ctx.exit_collection().unwrap();
    }
}

fn fill(ctx: &mut Context, collection: &Value) {
    match collection {
        Value::Array(items) => items.iter().for_each(|item| build(ctx, None, item)),
        Value::Object(entries) => entries
            .iter()
            .for_each(|entry| build(ctx, Some(entry.key.as_slice()), &entry.value)),
        _ => unreachable!("fill is only called on collections"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn roundtrip_preserves_tree(root in arb_root()) {
        let bytes = encode(&root).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), root);
    }

    #[test]
    fn roundtrip_big_endian_floats(root in arb_root()) {
        let config = CodecConfig { float_order: FloatOrder::BigEndian, ..CodecConfig::default() };
        let bytes = encode_with(&root, config).unwrap();
        prop_assert_eq!(decode_with(&bytes, config).unwrap(), root);
    }

    #[test]
    fn cursor_construction_matches_encode(root in arb_root()) {
        let mut ctx = Context::new();
        match root {
            Value::Array(_) => ctx.create_array().unwrap(),
            _ => ctx.create_object().unwrap(),
        }
        fill(&mut ctx, &root);
        prop_assert_eq!(ctx.depth(), 1);
        ctx.render_creation().unwrap();
        let expected = encode(&root).unwrap();
        prop_assert_eq!(ctx.output(), expected.as_slice());
    }

    #[test]
    fn render_of_parsed_root_is_identity(root in arb_root()) {
        let bytes = encode(&root).unwrap();
        let mut ctx = Context::new();
        ctx.parse(&bytes).unwrap();
        ctx.render().unwrap();
        prop_assert_eq!(ctx.output(), bytes.as_slice());
    }

    #[test]
    fn truncated_input_never_panics(root in arb_root(), cut in 0usize..64) {
        let bytes = encode(&root).unwrap();
        let end = bytes.len().saturating_sub(cut + 1);
        prop_assert!(decode(&bytes[..end]).is_err());
    }
}
