//! Property-based tests for the round-trip guarantees of every backend.
//!
//! Strings avoid control characters, which XML 1.0 cannot carry.

use omniser::json::{JsonDocument, Node, Slot};
use omniser::{Blob, Engine, Format, FourCC, OutputOptions, Serializable, Serializer};
use proptest::prelude::*;
use std::collections::BTreeMap;

const FORMATS: [Format; 4] = [Format::Binary, Format::Gzip, Format::Json, Format::Xml];

#[derive(Debug, Default, Clone, PartialEq)]
struct Sample {
    small: i16,
    wide: i64,
    unsigned: u64,
    ratio: f64,
    single: f32,
    label: String,
    blob: Blob,
    maybe: Option<i32>,
    list: Vec<u16>,
    scores: BTreeMap<String, u32>,
}

impl Serializable for Sample {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("small", &mut self.small);
        s.field("wide", &mut self.wide);
        s.field("unsigned", &mut self.unsigned);
        s.field("ratio", &mut self.ratio);
        s.field("single", &mut self.single);
        s.field("label", &mut self.label);
        s.field("blob", &mut self.blob);
        s.field("maybe", &mut self.maybe);
        s.field("list", &mut self.list);
        s.field("scores", &mut self.scores);
    }
}

fn finite_f64() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("finite", |v| v.is_finite())
}

fn finite_f32() -> impl Strategy<Value = f32> {
    any::<f32>().prop_filter("finite", |v| v.is_finite())
}

fn text() -> impl Strategy<Value = String> {
    "\\PC{0,24}"
}

prop_compose! {
    fn sample()(
        small in any::<i16>(),
        wide in any::<i64>(),
        unsigned in any::<u64>(),
        ratio in finite_f64(),
        single in finite_f32(),
        label in text(),
        blob in prop::collection::vec(any::<u8>(), 0..32),
        maybe in proptest::option::of(any::<i32>()),
        list in prop::collection::vec(any::<u16>(), 0..8),
        scores in prop::collection::btree_map("[a-z]{1,6}", any::<u32>(), 0..5),
    ) -> Sample {
        Sample { small, wide, unsigned, ratio, single, label, blob: Blob(blob), maybe, list, scores }
    }
}

fn round_trip(engine: &Engine, value: &Sample, format: Format, output: OutputOptions) -> Result<Sample, String> {
    let mut value = value.clone();
    let out = engine
        .write(&mut value, format, output)
        .map_err(|e| format!("{format} write failed: {e}"))?;
    let back = engine
        .read::<Sample>(out.value.as_bytes(), Format::AutoDetect)
        .map_err(|e| format!("{format} read failed: {e}"))?;
    back.into_result().map_err(|e| format!("{format}: {e}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_every_format_round_trips(value in sample()) {
        let engine = Engine::new();
        for format in FORMATS {
            let back = round_trip(&engine, &value, format, OutputOptions::empty());
            prop_assert_eq!(back.as_ref(), Ok(&value), "{}", format);
        }
    }

    #[test]
    fn prop_base64_transport_round_trips(value in sample()) {
        let engine = Engine::new();
        for format in FORMATS {
            let back = round_trip(&engine, &value, format, OutputOptions::BASE64 | OutputOptions::PRETTY_PRINT);
            prop_assert_eq!(back.as_ref(), Ok(&value), "{}", format);
        }
    }

    #[test]
    fn prop_binary_output_starts_with_magic(value in sample()) {
        let mut value = value;
        let out = Engine::new().write(&mut value, Format::Binary, OutputOptions::empty()).unwrap();
        prop_assert_eq!(&out.value.as_bytes()[..5], b"FBIN!");
    }

    #[test]
    fn prop_wrong_kinds_are_reported_per_field(values in prop::collection::vec("[a-z]{1,8}", 3)) {
        #[derive(Debug, Default)]
        struct Numbers {
            a: i32,
            b: u16,
            c: f64,
        }

        impl Serializable for Numbers {
            fn serialize(&mut self, s: &mut Serializer<'_>) {
                s.field("a", &mut self.a);
                s.field("b", &mut self.b);
                s.field("c", &mut self.c);
            }
        }

        let input = format!(r#"{{"a":"{}","b":"{}","c":"{}"}}"#, values[0], values[1], values[2]);
        let outcome = Engine::new().read::<Numbers>(input.as_bytes(), Format::Json).unwrap();
        // "nan" and "infinity" spellings are valid floats
        let float_text = ["nan", "inf", "infinity"].contains(&values[2].as_str());
        let expected = if float_text { 2 } else { 3 };
        prop_assert_eq!(outcome.errors.len(), expected, "{}", outcome.summary());
    }

    #[test]
    fn prop_fourcc_text_round_trips(code in "[A-Z0-9]{1,4}") {
        let parsed = FourCC::parse(&code).unwrap();
        prop_assert_eq!(parsed.to_text(true), code.clone());
        prop_assert_eq!(parsed.to_text(false).len(), 4);
        prop_assert_eq!(FourCC::from_u32(parsed.as_u32()), Ok(parsed));
    }

    #[test]
    fn prop_fourcc_order_follows_text(a in "[A-Z]{4}", b in "[A-Z]{4}") {
        let left = FourCC::parse(&a).unwrap();
        let right = FourCC::parse(&b).unwrap();
        prop_assert_eq!(left.cmp(&right), a.cmp(&b));
    }

    #[test]
    fn prop_document_print_parse(entries in prop::collection::vec(("[a-z]{1,8}", finite_f64(), text()), 1..8)) {
        let mut doc = JsonDocument::new();
        let root = Slot::Node(doc.root());
        for (key, number, label) in &entries {
            let slot = doc.index_key(&root, key);
            let slot = doc.index_at(&slot, 0);
            doc.set(&slot, Node::from(*number)).unwrap();
            let slot = doc.index_key(&Slot::Node(doc.root()), key);
            let slot = doc.index_at(&slot, 1);
            doc.set(&slot, Node::from(label.as_str())).unwrap();
        }

        let compact = JsonDocument::parse(&doc.to_json_string()).unwrap();
        prop_assert_eq!(&compact, &doc);
        let pretty = JsonDocument::parse(&doc.to_json_string_pretty(2)).unwrap();
        prop_assert_eq!(&pretty, &doc);
        let snapshot = JsonDocument::from_snapshot(&doc.to_snapshot()).unwrap();
        prop_assert_eq!(&snapshot, &doc);
    }
}
