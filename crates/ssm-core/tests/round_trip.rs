//! Marshal then unmarshal through the memory stores

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use ssm_backend::ValueType;
use ssm_core::prelude::*;
use ssm_test_utils::{setup, test_config, Database, ServiceConfig, Simple, Stores};

#[tokio::test]
async fn simple_field_lands_on_rendered_path() {
    let (stores, serializer) = setup();

    let written = Simple {
        name: "my-name".into(),
    };
    let results = serializer.marshal(&written).await.unwrap();
    assert!(results.is_empty(), "unexpected failures: {results:?}");
    assert_eq!(
        stores.parameters.value("/dev/svc1/simple/test").as_deref(),
        Some("my-name")
    );

    let mut read = Simple::default();
    let results = serializer.unmarshal(&mut read).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(read, written);
}

#[tokio::test]
async fn service_config_spreads_over_both_stores() {
    let (stores, serializer) = setup();

    let results = serializer.marshal(&ServiceConfig::sample()).await.unwrap();
    assert!(results.is_empty(), "unexpected failures: {results:?}");

    assert_eq!(
        stores.parameters.paths(),
        vec![
            "/dev/shared/region",
            "/dev/svc1/database",
            "/dev/svc1/feature/enabled",
            "/dev/svc1/limits/ratio",
            "/dev/svc1/limits/timeout",
            "/dev/svc1/name",
            "/dev/svc1/password",
            "/dev/svc1/port",
        ]
    );
    assert_eq!(stores.secrets.paths(), vec!["/dev/svc1/api-key"]);
    assert_eq!(stores.parameters.value("/dev/svc1/limits/ratio").as_deref(), Some("0.25"));
    assert_eq!(stores.parameters.value("/dev/svc1/feature/enabled").as_deref(), Some("true"));
}

#[tokio::test]
async fn unmarshal_restores_every_tagged_field() {
    let (_stores, serializer) = setup();
    serializer.marshal(&ServiceConfig::sample()).await.unwrap();

    let mut read = ServiceConfig::default();
    let results = serializer.unmarshal(&mut read).await.unwrap();
    assert!(results.is_empty(), "unexpected outcomes: {results:?}");

    let mut expected = ServiceConfig::sample();
    expected.runtime_only = String::new();
    expected.limits.untagged = String::new();
    assert_eq!(read, expected);
}

#[tokio::test]
async fn annotated_substructure_is_one_json_value() {
    let (stores, serializer) = setup();
    serializer.marshal(&ServiceConfig::sample()).await.unwrap();

    let raw = stores.parameters.value("/dev/svc1/database").unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        stored,
        serde_json::json!({ "host": "db.internal", "port": 5432 })
    );
    assert!(stores.parameters.value("/dev/svc1/database/host").is_none());

    let mut read = ServiceConfig::default();
    serializer.unmarshal(&mut read).await.unwrap();
    assert_eq!(
        read.database,
        Database {
            host: "db.internal".into(),
            port: 5432,
            user: String::new(),
        }
    );
}

#[tokio::test]
async fn secure_fields_are_encrypted_and_read_decrypted() {
    let (stores, serializer) = setup();
    serializer.marshal(&ServiceConfig::sample()).await.unwrap();

    let password = stores.parameters.entry("/dev/svc1/password").unwrap();
    assert_eq!(password.value_type, ValueType::SecureString);
    assert_eq!(password.tier, Some(Tier::Adv));
    let name = stores.parameters.entry("/dev/svc1/name").unwrap();
    assert_eq!(name.value_type, ValueType::String);
    assert_eq!(name.tier, Some(Tier::Std));

    let secret = stores.secrets.entry("/dev/svc1/api-key").unwrap();
    assert_eq!(secret.value_type, ValueType::SecureString);
    assert_eq!(secret.description.as_deref(), Some("external api"));

    let mut read = ServiceConfig::default();
    serializer.unmarshal(&mut read).await.unwrap();
    assert!(stores.parameters.last_get().unwrap().decrypt);
    assert_eq!(read.password, "hunter2");
}

#[derive(Structure, Serialize, Deserialize, Debug, Default)]
struct PlainReader {
    #[pms("password")]
    password: String,
}

#[tokio::test]
async fn plain_read_of_secure_value_is_masked() {
    let (stores, serializer) = setup();
    stores.parameters.insert_secure("/dev/svc1/password", "hunter2");

    let mut read = PlainReader::default();
    serializer.unmarshal(&mut read).await.unwrap();
    assert!(!stores.parameters.last_get().unwrap().decrypt);
    assert_eq!(read.password, ssm_backend::MASKED_VALUE);
}

#[derive(Structure, Serialize, Deserialize, Debug, Default)]
struct Tagged {
    #[pms("owned, team=core, cost=low")]
    value: String,
}

#[tokio::test]
async fn freeform_options_become_entry_tags() {
    let (stores, serializer) = setup();
    serializer
        .marshal(&Tagged {
            value: "v".into(),
        })
        .await
        .unwrap();

    let entry = stores.parameters.entry("/dev/svc1/owned").unwrap();
    let keys: Vec<&str> = entry.tags.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["team", "cost"]);
    assert_eq!(entry.tags["cost"], "low");
}

#[derive(Structure, Serialize, Deserialize, Debug, Default)]
struct Retagged {
    #[pms("owned, team=infra")]
    value: String,
}

#[tokio::test]
async fn rewriting_a_parameter_updates_its_tags() {
    let (stores, serializer) = setup();
    serializer.marshal(&Tagged { value: "v".into() }).await.unwrap();

    let results = serializer
        .marshal(&Retagged {
            value: "w".into(),
        })
        .await
        .unwrap();
    assert!(results.is_empty(), "unexpected failures: {results:?}");

    let entry = stores.parameters.entry("/dev/svc1/owned").unwrap();
    assert_eq!(entry.tags["team"], "infra");
    assert_eq!(entry.tags["cost"], "low");
    assert_eq!(stores.parameters.value("/dev/svc1/owned").as_deref(), Some("w"));
}

#[tokio::test]
async fn configured_prefix_applies_to_untagged_prefixes() {
    let stores = Stores::new();
    let serializer = stores.serializer(test_config().with_prefix("/global"));

    let mut written = ServiceConfig::sample();
    written.feature = None;
    serializer
        .marshal_with_opts(&written, &FieldFilters::new().exclude("database"), &[StoreType::Pms])
        .await
        .unwrap();

    assert!(stores.parameters.value("/dev/global/name").is_some());
    assert!(stores.parameters.value("/dev/global/limits/timeout").is_some());
    // explicit prefixes win over the configured one
    assert!(stores.parameters.value("/dev/shared/region").is_some());
    assert!(stores.parameters.value("/dev/global/database").is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_string_round_trips(name in ".*") {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (_stores, serializer) = setup();

        let written = Simple { name };
        let mut read = Simple::default();
        runtime.block_on(async {
            serializer.marshal(&written).await.unwrap();
            serializer.unmarshal(&mut read).await.unwrap();
        });
        prop_assert_eq!(read, written);
    }
}
