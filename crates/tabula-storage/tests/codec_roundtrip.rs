use proptest::prelude::*;
use serde_json::{json, Value};
use tabula_storage::{compress, decompress};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        ".*".prop_map(Value::String),
    ];
    leaf.prop_recursive(6, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map(".{0,12}", inner, 0..8)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn arbitrary_text_round_trips(text in ".*") {
        prop_assert_eq!(decompress(&compress(&text)).unwrap(), text);
    }

    #[test]
    fn arbitrary_json_round_trips(value in arb_json()) {
        let text = serde_json::to_string(&value).unwrap();
        let back = decompress(&compress(&text)).unwrap();
        prop_assert_eq!(&back, &text);
        let parsed: Value = serde_json::from_str(&back).unwrap();
        prop_assert_eq!(parsed, value);
    }

    #[test]
    fn decompress_never_panics_on_garbage(input in ".*") {
        let _ = decompress(&input);
    }
}

#[test]
fn empty_object_and_deep_nesting_round_trip() {
    let mut deep = json!({});
    for depth in 0..64 {
        deep = json!({ "level": depth, "child": deep, "pad": "x".repeat(depth) });
    }

    for value in [json!({}), json!([]), deep] {
        let text = serde_json::to_string(&value).expect("serialize");
        assert_eq!(decompress(&compress(&text)).expect("decompress"), text);
    }
}

#[test]
fn non_ascii_text_round_trips() {
    let text = r#"{"name":"Ünïcödé 🚚 トラック","empty":""}"#;
    assert_eq!(decompress(&compress(text)).expect("decompress"), text);
}
