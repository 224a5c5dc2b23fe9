use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use omniser::{
    enum_field, from_slice, to_output, Blob, Engine, EngineOptions, FieldOptions, Format,
    FourCC, Outcome, OutputOptions, Polymorphic, Proxy, Serializable, Serializer,
    SerializerContext, TypeRegistry,
};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

const FORMATS: [Format; 4] = [Format::Binary, Format::Gzip, Format::Json, Format::Xml];

fn round_trip<T: Serializable + Default>(engine: &Engine, value: &mut T, format: Format) -> Outcome<T> {
    let out = engine.write(value, format, OutputOptions::empty()).unwrap();
    assert!(!out.has_errors(), "{format} write: {}", out.summary());
    engine.read::<T>(out.value.as_bytes(), Format::AutoDetect).unwrap()
}

fn timestamp() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

#[derive(Debug, Default, PartialEq)]
struct Primitives {
    flag: bool,
    byte: u8,
    tiny: i8,
    short: i16,
    int: i32,
    long: i64,
    ushort: u16,
    uint: u32,
    ulong: u64,
    single: f32,
    double: f64,
    text: String,
    blob: Blob,
    code: FourCC,
    id: Uuid,
    when: DateTime<Utc>,
}

impl Serializable for Primitives {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("flag", &mut self.flag);
        s.field("byte", &mut self.byte);
        s.field("tiny", &mut self.tiny);
        s.field("short", &mut self.short);
        s.field("int", &mut self.int);
        s.field("long", &mut self.long);
        s.field("ushort", &mut self.ushort);
        s.field("uint", &mut self.uint);
        s.field("ulong", &mut self.ulong);
        s.field("single", &mut self.single);
        s.field("double", &mut self.double);
        s.field("text", &mut self.text);
        s.field("blob", &mut self.blob);
        s.field("code", &mut self.code);
        s.field("id", &mut self.id);
        s.field("when", &mut self.when);
    }
}

impl Primitives {
    fn upper() -> Self {
        Primitives {
            flag: true,
            byte: u8::MAX,
            tiny: i8::MAX,
            short: i16::MAX,
            int: i32::MAX,
            long: i64::MAX,
            ushort: u16::MAX,
            uint: u32::MAX,
            ulong: u64::MAX,
            single: f32::MAX,
            double: 0.1,
            text: "Hello, <world> & \"friends\" ☃".to_string(),
            blob: Blob(vec![0, 1, 127, 254, 255]),
            code: FourCC::parse("WAVE").unwrap(),
            id: Uuid::from_u128(0x6f9619ff_8b86_d011_b42d_00c04fc964ff),
            when: timestamp(),
        }
    }

    fn lower() -> Self {
        Primitives {
            flag: false,
            byte: 0,
            tiny: i8::MIN,
            short: i16::MIN,
            int: i32::MIN,
            long: i64::MIN,
            ushort: 0,
            uint: 0,
            ulong: 0,
            single: -1.5,
            double: -2.5e-8,
            text: String::new(),
            blob: Blob::default(),
            code: FourCC::parse("AB").unwrap(),
            id: Uuid::nil(),
            when: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }
}

#[test]
fn test_primitive_boundaries_round_trip() {
    let engine = Engine::new();
    for format in FORMATS {
        for mut value in [Primitives::upper(), Primitives::lower(), Primitives::default()] {
            let back = round_trip(&engine, &mut value, format);
            assert!(!back.has_errors(), "{format}: {}", back.summary());
            assert_eq!(back.value, value, "{format}");
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct Inventory {
    owner: String,
    slots: [u16; 3],
    items: Vec<Item>,
    tags: BTreeSet<String>,
    counts: BTreeMap<String, u32>,
    by_id: HashMap<u32, String>,
    ordered: IndexMap<String, f64>,
    matrix: Vec<Vec<i32>>,
    nickname: Option<String>,
}

#[derive(Debug, Default, PartialEq)]
struct Item {
    label: String,
    weight: f32,
}

impl Serializable for Item {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("label", &mut self.label);
        s.field("weight", &mut self.weight);
    }
}

impl Serializable for Inventory {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("owner", &mut self.owner);
        s.field("slots", &mut self.slots);
        s.field("items", &mut self.items);
        s.field("tags", &mut self.tags);
        s.field("counts", &mut self.counts);
        s.field("by_id", &mut self.by_id);
        s.field("ordered", &mut self.ordered);
        s.field("matrix", &mut self.matrix);
        s.field("nickname", &mut self.nickname);
    }
}

fn sample_inventory() -> Inventory {
    Inventory {
        owner: "Ada".to_string(),
        slots: [1, 0, 65535],
        items: vec![
            Item {
                label: "sword".to_string(),
                weight: 3.5,
            },
            Item {
                label: "null".to_string(),
                weight: 0.0,
            },
        ],
        tags: ["rare", "blue"].into_iter().map(String::from).collect(),
        counts: [("arrows".to_string(), 20), ("bolts".to_string(), 0)].into(),
        by_id: [(7, "seven".to_string()), (11, String::new())].into(),
        ordered: [("z".to_string(), 1.0), ("a".to_string(), -0.5)].into_iter().collect(),
        matrix: vec![vec![1, 2], vec![], vec![3]],
        nickname: Some("the first".to_string()),
    }
}

#[test]
fn test_containers_round_trip() {
    let engine = Engine::new();
    for format in FORMATS {
        let mut inventory = sample_inventory();
        let back = round_trip(&engine, &mut inventory, format);
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        assert_eq!(back.value, inventory, "{format}");
    }
}

#[test]
fn test_insertion_order_survives_text_formats() {
    let mut inventory = sample_inventory();
    let out = to_output(&mut inventory, Format::Json).unwrap();
    let text = out.as_text().unwrap();
    assert!(text.find(r#""z""#).unwrap() < text.find(r#""a""#).unwrap());
}

#[test]
fn test_empty_containers_round_trip() {
    let engine = Engine::new();
    for format in FORMATS {
        let mut inventory = Inventory::default();
        let back = round_trip(&engine, &mut inventory, format);
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        assert_eq!(back.value, inventory, "{format}");
    }
}

// ---- defaults and null handling ----

#[derive(Debug, PartialEq)]
struct Settings {
    volume: u8,
    title: String,
    motto: Option<String>,
    ratio: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            volume: 50,
            title: "untitled".to_string(),
            motto: None,
            ratio: 1.0,
        }
    }
}

impl Serializable for Settings {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field_or("volume", &mut self.volume, 50);
        s.field_or("title", &mut self.title, "untitled".to_string());
        s.field_with("motto", &mut self.motto, FieldOptions::OPTIONAL);
        s.field_or("ratio", &mut self.ratio, 1.0);
    }
}

#[test]
fn test_defaults_are_elided_in_text_formats() {
    let mut settings = Settings::default();
    let json = to_output(&mut settings, Format::Json).unwrap();
    assert_eq!(json.as_text(), Some("{}"));

    let xml = to_output(&mut settings, Format::Xml).unwrap();
    let text = xml.as_text().unwrap();
    assert!(!text.contains("volume"), "{text}");
    assert!(!text.contains("motto"), "{text}");

    settings.volume = 80;
    let json = to_output(&mut settings, Format::Json).unwrap();
    assert_eq!(json.as_text(), Some(r#"{"volume":80}"#));
}

#[test]
fn test_missing_optional_fields_read_as_default() {
    let engine = Engine::new();
    let back = engine.read::<Settings>(b"{}", Format::Json).unwrap();
    assert!(!back.has_errors(), "{}", back.summary());
    assert_eq!(back.value, Settings::default());

    let back = engine.read::<Settings>(b"<root/>", Format::Xml).unwrap();
    assert!(!back.has_errors(), "{}", back.summary());
    assert_eq!(back.value, Settings::default());
}

#[test]
fn test_defaults_round_trip_in_every_format() {
    let engine = Engine::new();
    for format in FORMATS {
        let mut settings = Settings {
            volume: 50,
            title: "untitled".to_string(),
            motto: Some(String::new()),
            ratio: 0.25,
        };
        let back = round_trip(&engine, &mut settings, format);
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        assert_eq!(back.value, settings, "{format}");
    }
}

#[derive(Debug, Default, PartialEq)]
struct Pair {
    first: i32,
    second: Option<i32>,
}

impl Serializable for Pair {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("first", &mut self.first);
        s.field("second", &mut self.second);
    }
}

#[derive(Debug, Default, PartialEq)]
struct FirstOnly {
    first: i32,
}

impl Serializable for FirstOnly {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("first", &mut self.first);
    }
}

#[test]
fn test_binary_null_is_distinct_from_absent() {
    let engine = Engine::new();
    for format in [Format::Binary, Format::Gzip] {
        // Present but null: `second` has a NULL frame
        let mut pair = Pair {
            first: 1,
            second: None,
        };
        let back = round_trip(&engine, &mut pair, format);
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        assert_eq!(back.value, pair);

        // Absent: the writer never produced a frame for `second`
        let out = engine
            .write(&mut FirstOnly { first: 1 }, format, OutputOptions::empty())
            .unwrap();
        let back = engine.read::<Pair>(out.value.as_bytes(), format).unwrap();
        assert_eq!(back.summary(), "second: missing required field", "{format}");
        assert_eq!(back.value.first, 1);
    }
}

#[test]
fn test_text_formats_write_required_none_as_null() {
    let mut pair = Pair {
        first: 1,
        second: None,
    };
    let out = to_output(&mut pair, Format::Json).unwrap();
    assert_eq!(out.as_text(), Some(r#"{"first":1,"second":null}"#));

    let engine = Engine::new();
    let back = engine.read::<Pair>(br#"{"first":1,"second":null}"#, Format::Json).unwrap();
    assert!(!back.has_errors());
    let back = engine.read::<Pair>(br#"{"first":1}"#, Format::Json).unwrap();
    assert_eq!(back.summary(), "second: missing required field");
}

// ---- error accumulation ----

#[derive(Debug, Default, PartialEq)]
struct Account {
    name: String,
    age: u8,
    email: String,
    items: Vec<Item>,
}

impl Serializable for Account {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("name", &mut self.name);
        s.field("age", &mut self.age);
        s.field("email", &mut self.email);
        s.field("items", &mut self.items);
    }
}

#[test]
fn test_errors_accumulate_without_aborting() {
    let input = br#"{
        "name": "Grace",
        "age": 300,
        "items": [{"label": "ok", "weight": 1}, {"label": 5, "weight": "heavy"}]
    }"#;
    let outcome = Engine::new().read::<Account>(input, Format::Json).unwrap();

    assert!(outcome.has_errors());
    assert_eq!(outcome.errors.len(), 4);
    let summary = outcome.summary();
    assert!(summary.contains("age: expected u8"), "{summary}");
    assert!(summary.contains("email: missing required field"), "{summary}");
    assert!(summary.contains("items[1].label: expected string, found number"), "{summary}");
    assert!(summary.contains("items[1].weight: expected f32"), "{summary}");

    assert_eq!(outcome.value.name, "Grace");
    assert_eq!(outcome.value.items.len(), 2);
    assert_eq!(outcome.value.items[0].label, "ok");
}

#[test]
fn test_into_result_rejects_soft_errors() {
    let err = from_slice::<Account>(br#"{"name":"x"}"#).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("age: missing required field"), "{message}");
}

#[test]
fn test_hard_errors_abort_the_read() {
    let engine = Engine::new();
    assert!(engine.read::<Account>(br#"{"name": "x""#, Format::Json).is_err());
    assert!(engine.read::<Account>(b"<root><name>x</root>", Format::Xml).is_err());
    assert!(engine.read::<Account>(b"FBIN!\x0f\x05", Format::AutoDetect).is_err());
    assert!(engine.read::<Account>(b"????", Format::AutoDetect).is_err());
}

// ---- object versions ----

#[derive(Debug, Default, PartialEq)]
struct Profile {
    name: String,
    score: i32,
    seen_version: u16,
    finalized: bool,
}

impl Serializable for Profile {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("name", &mut self.name);
        if s.object_version() >= 2 {
            s.field("score", &mut self.score);
        }
        if s.is_reading() {
            self.seen_version = s.object_version();
        }
    }

    fn object_version(&self) -> u16 {
        2
    }

    fn after_read(&mut self) {
        self.finalized = true;
    }
}

#[test]
fn test_object_version_controls_fields() {
    let engine = Engine::new();
    for format in FORMATS {
        let mut profile = Profile {
            name: "Lin".to_string(),
            score: 42,
            ..Profile::default()
        };
        let back = round_trip(&engine, &mut profile, format);
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        assert_eq!(back.value.score, 42);
        assert_eq!(back.value.seen_version, 2);
        assert!(back.value.finalized);
    }

    let out = to_output(&mut Profile::default(), Format::Json).unwrap();
    assert!(out.as_text().unwrap().starts_with(r#"{"__version":2"#));

    // A version 1 document has no score
    let back = engine.read::<Profile>(br#"{"name":"Old"}"#, Format::Json).unwrap();
    assert!(!back.has_errors(), "{}", back.summary());
    assert_eq!(back.value.seen_version, 1);
}

#[test]
fn test_serializer_version_is_visible_to_readers() {
    #[derive(Default)]
    struct VersionSeen {
        version: u16,
    }

    impl Serializable for VersionSeen {
        fn serialize(&mut self, s: &mut Serializer<'_>) {
            if s.is_reading() {
                self.version = s.serializer_version();
            }
        }
    }

    let writer = Engine::with_options(EngineOptions::new().with_serializer_version(4));
    for format in FORMATS {
        let out = writer
            .write(&mut VersionSeen::default(), format, OutputOptions::empty())
            .unwrap();
        let back = Engine::new().read::<VersionSeen>(out.value.as_bytes(), format).unwrap();
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        assert_eq!(back.value.version, 4, "{format}");
    }
}

// ---- polymorphism ----

#[derive(Debug, Default, PartialEq)]
struct Creature {
    name: String,
    hp: i32,
}

impl Serializable for Creature {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("name", &mut self.name);
        s.field("hp", &mut self.hp);
    }
}

impl Polymorphic for Creature {}

#[derive(Debug, Default, PartialEq)]
struct Dragon {
    base: Creature,
    wingspan: f32,
}

impl Serializable for Dragon {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        self.base.serialize(s);
        s.field("wingspan", &mut self.wingspan);
    }
}

impl Polymorphic for Dragon {}

#[derive(Default)]
struct Lair {
    boss: Option<Box<dyn Polymorphic>>,
    minions: Vec<Box<dyn Polymorphic>>,
    guard: Option<Box<dyn Polymorphic>>,
}

impl Serializable for Lair {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.polymorphic_as::<Creature>("boss", &mut self.boss);
        s.polymorphic_list("minions", &mut self.minions);
        s.polymorphic("guard", &mut self.guard);
    }
}

fn bestiary() -> Engine {
    let mut registry = TypeRegistry::new();
    registry
        .register::<Creature>("creature")
        .register::<Dragon>("dragon");
    Engine::new().with_registry(registry)
}

fn dragon(name: &str) -> Dragon {
    Dragon {
        base: Creature {
            name: name.to_string(),
            hp: 900,
        },
        wingspan: 12.5,
    }
}

#[test]
fn test_subclass_survives_base_reference() {
    let engine = bestiary();
    for format in FORMATS {
        let mut lair = Lair {
            boss: Some(Box::new(dragon("Smaug"))),
            minions: vec![
                Box::new(Creature {
                    name: "goblin".to_string(),
                    hp: 7,
                }),
                Box::new(dragon("Drogon")),
            ],
            guard: None,
        };
        let back = round_trip(&engine, &mut lair, format);
        assert!(!back.has_errors(), "{format}: {}", back.summary());

        let boss = back.value.boss.as_deref().unwrap();
        assert_eq!(boss.downcast_ref::<Dragon>(), Some(&dragon("Smaug")), "{format}");
        assert!(back.value.minions[0].is::<Creature>());
        assert_eq!(back.value.minions[1].downcast_ref::<Dragon>(), Some(&dragon("Drogon")));
        assert!(back.value.guard.is_none());
    }
}

#[test]
fn test_declared_type_needs_no_alias() {
    let engine = bestiary();
    let mut lair = Lair {
        boss: Some(Box::new(Creature {
            name: "Orc".to_string(),
            hp: 30,
        })),
        ..Lair::default()
    };
    let out = engine.write(&mut lair, Format::Json, OutputOptions::empty()).unwrap();
    let text = out.value.as_text().unwrap();
    assert_eq!(text, r#"{"boss":{"name":"Orc","hp":30},"minions":[]}"#);

    let mut lair = Lair {
        boss: Some(Box::new(dragon("Smaug"))),
        ..Lair::default()
    };
    let out = engine.write(&mut lair, Format::Json, OutputOptions::empty()).unwrap();
    assert!(out.value.as_text().unwrap().contains(r#""__type":"dragon""#));

    let back = engine
        .read::<Lair>(br#"{"boss":{"name":"Orc","hp":30},"minions":[]}"#, Format::Json)
        .unwrap();
    assert!(back.value.boss.unwrap().is::<Creature>());
}

#[test]
fn test_xml_alias_is_an_attribute() {
    let engine = bestiary();
    let mut lair = Lair {
        guard: Some(Box::new(dragon("Viserion"))),
        ..Lair::default()
    };
    let out = engine.write(&mut lair, Format::Xml, OutputOptions::empty()).unwrap();
    let text = out.value.as_text().unwrap();
    assert!(text.contains(r#"<guard __type="dragon""#), "{text}");
}

#[test]
fn test_unknown_alias_is_a_soft_error() {
    let engine = bestiary();
    let back = engine
        .read::<Lair>(
            br#"{"guard":{"__type":"unicorn","name":"x","hp":1},"minions":[]}"#,
            Format::Json,
        )
        .unwrap();
    assert!(back.value.guard.is_none());
    assert_eq!(back.summary(), "guard: unknown type alias `unicorn`");
}

#[test]
fn test_polymorphic_root_round_trip() {
    let engine = bestiary();
    for format in FORMATS {
        let mut original = dragon("Balerion");
        let out = engine
            .write_polymorphic(&mut original, format, OutputOptions::empty())
            .unwrap();
        let back = engine.read_polymorphic(out.value.as_bytes(), format).unwrap();
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        let object = back.value.unwrap();
        assert_eq!(object.downcast_ref::<Dragon>(), Some(&original), "{format}");
    }
}

// ---- enums ----

#[derive(Clone, Copy, Debug, PartialEq)]
enum Faction {
    Neutral,
    Horde,
    Alliance,
}

enum_field!(Faction: I32 { Neutral = 0, Horde = 1, Alliance = 2 });

#[derive(Debug, PartialEq)]
struct Banner {
    faction: Faction,
    allies: Vec<Faction>,
}

impl Default for Banner {
    fn default() -> Self {
        Banner {
            faction: Faction::Neutral,
            allies: Vec::new(),
        }
    }
}

impl Serializable for Banner {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field_or("faction", &mut self.faction, Faction::Neutral);
        s.field("allies", &mut self.allies);
    }
}

#[test]
fn test_enum_fields() {
    let engine = Engine::new();
    for format in FORMATS {
        let mut banner = Banner {
            faction: Faction::Horde,
            allies: vec![Faction::Alliance, Faction::Neutral],
        };
        let back = round_trip(&engine, &mut banner, format);
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        assert_eq!(back.value, banner);
    }

    let out = to_output(&mut Banner::default(), Format::Json).unwrap();
    assert_eq!(out.as_text(), Some(r#"{"allies":[]}"#));
}

// ---- proxies and custom serializers ----

struct Texture {
    path: String,
}

struct Library {
    textures: Vec<Arc<Texture>>,
}

impl SerializerContext for Library {
    fn try_resolve_asset_by_id(&self, id: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.textures
            .iter()
            .find(|texture| texture.path == id)
            .map(|texture| texture.clone() as Arc<dyn Any + Send + Sync>)
    }

    fn try_get_id_for_asset(&self, asset: &dyn Any) -> Option<String> {
        asset.downcast_ref::<Texture>().map(|texture| texture.path.clone())
    }
}

#[derive(Clone, Default)]
struct TextureRef(Option<Arc<Texture>>);

impl Proxy for TextureRef {
    type Inner = String;

    fn get_proxy_value(&self, context: Option<&dyn SerializerContext>) -> Option<String> {
        let texture = self.0.as_ref()?;
        context?.try_get_id_for_asset(texture.as_ref())
    }

    fn set_proxy_value(inner: String, context: Option<&dyn SerializerContext>) -> Option<Self> {
        let asset = context?.try_resolve_asset_by_id(&inner)?;
        asset.downcast::<Texture>().ok().map(|texture| TextureRef(Some(texture)))
    }
}

#[derive(Default)]
struct Material {
    diffuse: TextureRef,
}

impl Serializable for Material {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.proxy("diffuse", &mut self.diffuse);
    }
}

#[test]
fn test_proxy_values_resolve_through_context() {
    let library = Library {
        textures: vec![Arc::new(Texture {
            path: "stone.png".to_string(),
        })],
    };
    let engine = Engine::new();
    let mut material = Material {
        diffuse: TextureRef(Some(library.textures[0].clone())),
    };

    for format in FORMATS {
        let out = engine
            .write_with(&mut material, format, OutputOptions::empty(), Some(&library))
            .unwrap();
        assert!(!out.has_errors(), "{format}: {}", out.summary());
        let back = engine
            .read_with::<Material>(out.value.as_bytes(), format, Some(&library))
            .unwrap();
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        let texture = back.value.diffuse.0.unwrap();
        assert!(Arc::ptr_eq(&texture, &library.textures[0]));
    }
}

#[test]
fn test_unresolvable_proxy_is_soft() {
    let library = Library { textures: Vec::new() };
    let engine = Engine::new();

    let back = engine
        .read_with::<Material>(br#"{"diffuse":"missing.png"}"#, Format::Json, Some(&library))
        .unwrap();
    assert!(back.value.diffuse.0.is_none());
    assert!(back.summary().starts_with("diffuse: could not restore"), "{}", back.summary());

    let mut material = Material {
        diffuse: TextureRef(Some(Arc::new(Texture {
            path: "orphan.png".to_string(),
        }))),
    };
    let out = engine
        .write_with(&mut material, Format::Json, OutputOptions::empty(), Some(&library))
        .unwrap();
    assert!(out.has_errors());
    assert_eq!(out.value.as_text(), Some(r#"{"diffuse":null}"#));
}

// A type from another crate that cannot implement `Serializable`
#[derive(Debug, Default, PartialEq)]
struct Rgba {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

#[derive(Default)]
struct Swatch {
    color: Rgba,
}

impl Serializable for Swatch {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.custom("color", &mut self.color);
    }
}

#[test]
fn test_custom_serializer() {
    let mut registry = TypeRegistry::new();
    registry.register_serializer::<Rgba, _>(|color, s| {
        s.field("r", &mut color.r);
        s.field("g", &mut color.g);
        s.field("b", &mut color.b);
        s.field_or("a", &mut color.a, 255);
    });
    let engine = Engine::new().with_registry(registry);

    for format in FORMATS {
        let mut swatch = Swatch {
            color: Rgba {
                r: 10,
                g: 20,
                b: 30,
                a: 255,
            },
        };
        let back = round_trip(&engine, &mut swatch, format);
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        assert_eq!(back.value.color, swatch.color);
    }

    let out = engine
        .write(&mut Swatch::default(), Format::Json, OutputOptions::empty())
        .unwrap();
    assert_eq!(out.value.as_text(), Some(r#"{"color":{"r":0,"g":0,"b":0,"a":0}}"#));
}

#[test]
fn test_unregistered_custom_serializer_is_soft() {
    let out = Engine::new()
        .write(&mut Swatch::default(), Format::Json, OutputOptions::empty())
        .unwrap();
    assert!(out.has_errors());
    assert!(out.summary().starts_with("color: no custom serializer registered"));
}

// ---- binary frames ----

#[derive(Debug, Default, PartialEq)]
struct Record {
    some_id: Uuid,
    some_float_data: f32,
}

impl Serializable for Record {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("someId", &mut self.some_id);
        s.field("someFloatData", &mut self.some_float_data);
    }
}

#[test]
fn test_binary_frame_scenario() {
    let id = Uuid::parse_str("3f2504e0-4f89-11d3-9a0c-0305e82c3301").unwrap();
    let mut record = Record {
        some_id: id,
        some_float_data: 0.1,
    };
    let out = to_output(&mut record, Format::Binary).unwrap();
    let bytes = out.as_bytes();
    assert_eq!(&bytes[..5], b"FBIN!");

    let back: Record = from_slice(bytes).unwrap();
    assert_eq!(back.some_id, id);
    assert_eq!(back.some_float_data, 0.1);
}

#[test]
fn test_readers_skip_unknown_trailing_fields() {
    let engine = Engine::new();
    for format in FORMATS {
        let mut pair = Pair {
            first: 9,
            second: Some(3),
        };
        let out = engine.write(&mut pair, format, OutputOptions::empty()).unwrap();
        let back = engine.read::<FirstOnly>(out.value.as_bytes(), format).unwrap();
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        assert_eq!(back.value.first, 9);
    }
}

#[test]
fn test_base64_transport_for_every_format() {
    let engine = Engine::new();
    for format in FORMATS {
        let mut inventory = sample_inventory();
        let out = engine
            .write(&mut inventory, format, OutputOptions::BASE64)
            .unwrap();
        let text = out.value.as_text().unwrap();
        assert_eq!(&text.as_bytes()[4..5], b"\"", "{format}");

        let back: Inventory = omniser::from_str(text).unwrap();
        assert_eq!(back, inventory, "{format}");
    }
}

#[test]
fn test_pretty_output_reads_back() {
    let engine = Engine::new();
    for format in [Format::Json, Format::Xml] {
        let mut inventory = sample_inventory();
        let out = engine
            .write(&mut inventory, format, OutputOptions::PRETTY_PRINT)
            .unwrap();
        assert!(out.value.as_text().unwrap().contains('\n'));
        let back = engine.read::<Inventory>(out.value.as_bytes(), format).unwrap();
        assert!(!back.has_errors(), "{format}: {}", back.summary());
        assert_eq!(back.value, inventory, "{format}");
    }
}

#[test]
fn test_reader_and_writer_helpers() {
    let mut buffer = Vec::new();
    omniser::to_writer(&mut buffer, &mut sample_inventory(), Format::Gzip).unwrap();
    assert!(buffer.starts_with(b"FBGZ!"));

    let back: Inventory = omniser::from_reader(buffer.as_slice()).unwrap();
    assert_eq!(back, sample_inventory());
}
