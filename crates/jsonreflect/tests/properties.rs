//! Determinism, deduplication, naming, required propagation, hooks and
//! concurrent use.

use jsonreflect::{
    DefinitionRegistry, HoistPolicy, Reflect, ReflectError, ReflectOptions, Reflector, TypeRef,
};
use rstest::rstest;
use serde_json::json;

mod billing {
    use jsonreflect::Reflect;

    #[derive(Reflect)]
    pub struct User {
        pub account: String,
    }
}

mod auth {
    use jsonreflect::Reflect;

    #[derive(Reflect)]
    pub struct User {
        pub login: String,
    }
}

#[derive(Reflect)]
struct Address {
    city: String,
}

#[derive(Reflect)]
struct Person {
    home: Address,
    work: Option<Address>,
    nickname: Option<String>,
}

#[derive(Reflect)]
struct Letter {
    to: Address,
}

#[derive(Reflect)]
struct Line {
    #[schema(example = "3")]
    qty: u32,
    #[schema(required)]
    sku: Option<String>,
}

#[derive(Reflect)]
struct Order {
    lines: Vec<Line>,
    #[schema(inline)]
    ship_to: Address,
}

#[derive(Reflect)]
struct ApiItem {
    id: u64,
}

#[derive(Reflect)]
struct ApiPage<T> {
    items: Vec<T>,
}

#[derive(Reflect)]
struct Listing {
    first: ApiPage<ApiItem>,
    second: ApiPage<String>,
}

#[derive(Reflect)]
struct Accounts {
    billing: billing::User,
    auth: auth::User,
}

fn shared() -> Reflector {
    Reflector::new(
        ReflectOptions::new()
            .hoist_policy(HoistPolicy::Shared)
            .qualify_names(false),
    )
}

#[test]
fn reflecting_twice_is_byte_identical() {
    let reflector = Reflector::default();
    let first = reflector.reflect_type::<Listing>().unwrap();
    let second = reflector.reflect_type::<Listing>().unwrap();
    let fresh = Reflector::default().reflect_type::<Listing>().unwrap();
    assert_eq!(
        first.to_canonical_string().unwrap(),
        second.to_canonical_string().unwrap()
    );
    assert_eq!(
        first.to_canonical_string().unwrap(),
        fresh.to_canonical_string().unwrap()
    );
}

#[test]
fn type_used_from_two_sites_is_defined_once() {
    let doc = shared().reflect_type::<Person>().unwrap();
    assert_eq!(doc.definition_names().collect::<Vec<_>>(), vec!["Address"]);
    let value = doc.to_value();
    assert_eq!(value["properties"]["home"], json!({"$ref": "#/definitions/Address"}));
    assert_eq!(value["properties"]["work"], json!({"$ref": "#/definitions/Address"}));
    assert_eq!(
        value["properties"]["nickname"],
        json!({"type": ["string", "null"]})
    );
}

#[test]
fn type_used_from_one_site_is_inlined() {
    let doc = shared().reflect_type::<Letter>().unwrap();
    assert_eq!(doc.definitions.len(), 0);
    assert_eq!(
        doc.to_value(),
        json!({
            "type": "object",
            "properties": {
                "to": {"type": "object", "properties": {"city": {"type": "string"}}}
            }
        })
    );
}

#[test]
fn several_roots_share_one_table() {
    let doc = shared()
        .reflect_many(&[TypeRef::of::<Letter>(), TypeRef::of::<Address>()])
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({
            "roots": [
                {"type": "object", "properties": {"to": {"$ref": "#/definitions/Address"}}},
                {"$ref": "#/definitions/Address"}
            ],
            "definitions": {
                "Address": {"type": "object", "properties": {"city": {"type": "string"}}}
            }
        })
    );
}

#[rstest]
#[case::stripped(&["Api"], vec!["Item", "Page[Item]", "Page[String]"])]
#[case::longest_prefix_wins(&["A", "Api"], vec!["Item", "Page[Item]", "Page[String]"])]
#[case::unmatched(&["Zz"], vec!["ApiItem", "ApiPage[ApiItem]", "ApiPage[String]"])]
fn prefix_is_stripped_from_every_segment(#[case] prefixes: &[&str], #[case] expected: Vec<&str>) {
    let options = prefixes
        .iter()
        .fold(ReflectOptions::new().qualify_names(false), |options, p| {
            options.strip_prefix(*p)
        });
    let doc = Reflector::new(options).reflect_type::<Listing>().unwrap();
    assert_eq!(doc.definition_names().collect::<Vec<_>>(), expected);
}

#[test]
fn explicit_required_wins_over_optionality() {
    let doc = Reflector::default().reflect_type::<Line>().unwrap();
    assert_eq!(doc.to_value()["required"], json!(["sku"]));

    let reflector = Reflector::new(ReflectOptions::new().required_from_optionality(true));
    let doc = reflector.reflect_type::<Line>().unwrap();
    assert_eq!(doc.to_value()["required"], json!(["qty", "sku"]));
}

#[test]
fn inline_fields_embed_named_types() {
    let doc = Reflector::new(ReflectOptions::new().qualify_names(false))
        .reflect_type::<Order>()
        .unwrap();
    let value = doc.to_value();
    assert_eq!(
        value["properties"]["ship_to"],
        json!({"type": "object", "properties": {"city": {"type": "string"}}})
    );
    assert_eq!(
        value["properties"]["lines"]["items"],
        json!({"$ref": "#/definitions/Line"})
    );
    assert_eq!(doc.definition_names().collect::<Vec<_>>(), vec!["Line"]);
}

#[test]
fn colliding_names_are_qualified() {
    let doc = Reflector::new(ReflectOptions::new().qualify_names(false))
        .reflect_type::<Accounts>()
        .unwrap();
    assert_eq!(
        doc.definition_names().collect::<Vec<_>>(),
        vec!["AuthUser", "User"]
    );
    let value = doc.to_value();
    assert_eq!(value["properties"]["billing"], json!({"$ref": "#/definitions/User"}));
    assert_eq!(value["properties"]["auth"], json!({"$ref": "#/definitions/AuthUser"}));
    assert_eq!(
        doc.definitions["AuthUser"].source.module(),
        Some("properties::auth")
    );
}

#[test]
fn malformed_metadata_names_the_field_path() {
    #[derive(Reflect)]
    struct BadLine {
        #[schema(example = "three")]
        qty: u32,
    }

    #[derive(Reflect)]
    struct BadOrder {
        lines: Vec<BadLine>,
    }

    let err = Reflector::default().reflect_type::<BadOrder>().unwrap_err();
    assert!(matches!(
        &err,
        ReflectError::MalformedFieldMetadata { field_path, key, raw_value, .. }
            if field_path == "BadOrder.lines.qty" && key == "example" && raw_value == "three"
    ));
    assert!(err.to_string().contains("BadOrder.lines.qty"));
}

#[test]
fn type_hooks_rewrite_nodes_before_caching() {
    let reflector = Reflector::new(
        ReflectOptions::new()
            .qualify_names(false)
            .intercept_type(|ctx, node| {
                if ctx.identity.name() == Some("Address") {
                    node.annotations.description = Some("Postal address".into());
                }
                Ok(())
            }),
    );
    let doc = reflector.reflect_type::<Person>().unwrap();
    assert_eq!(
        doc.definition("Address").and_then(|n| n.annotations.description.as_deref()),
        Some("Postal address")
    );
}

#[test]
fn field_hooks_see_the_field_path() {
    let reflector = Reflector::new(ReflectOptions::new().intercept_field(|ctx, meta| {
        if ctx.path == "Line.qty" {
            meta.required = true;
            meta.exposed_name = "quantity".into();
        }
        Ok(())
    }));
    let doc = reflector.reflect_type::<Line>().unwrap();
    let value = doc.to_value();
    assert_eq!(value["required"], json!(["quantity", "sku"]));
    assert!(value["properties"].get("qty").is_none());
}

#[test]
fn hook_errors_abort_the_call() {
    let reflector = Reflector::new(ReflectOptions::new().intercept_field(|ctx, _| {
        Err(ReflectError::UnsupportedTypeKind {
            type_name: ctx.parent.to_string(),
            reason: "rejected by policy".into(),
        })
    }));
    let err = reflector.reflect_type::<Letter>().unwrap_err();
    assert_eq!(
        err,
        ReflectError::UnsupportedTypeKind {
            type_name: "properties::Letter".into(),
            reason: "rejected by policy".into(),
        }
    );
}

#[test]
fn concurrent_calls_on_one_reflector_agree() {
    let reflector = Reflector::new(ReflectOptions::new().strip_prefix("Api"));
    let expected = reflector
        .reflect_type::<Listing>()
        .unwrap()
        .to_canonical_string()
        .unwrap();

    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    reflector
                        .reflect_type::<Listing>()
                        .unwrap()
                        .to_canonical_string()
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(outputs.iter().all(|output| *output == expected));
}

#[test]
fn shared_registry_behind_a_mutex() {
    let reflector = Reflector::new(ReflectOptions::new().qualify_names(false));
    let registry = std::sync::Mutex::new(DefinitionRegistry::new(HoistPolicy::Named));

    std::thread::scope(|scope| {
        for root in [TypeRef::of::<Person>(), TypeRef::of::<Letter>()] {
            let registry = &registry;
            let reflector = &reflector;
            scope.spawn(move || {
                let mut guard = registry.lock().unwrap();
                reflector.reflect_into(&mut guard, &[root]).unwrap();
            });
        }
    });

    let registry = registry.into_inner().unwrap();
    assert!(registry.is_hoisted("properties::Address"));
    assert_eq!(registry.name_of("properties::Address"), Some("Address"));
}
