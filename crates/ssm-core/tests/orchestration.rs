//! Failure handling, deletion and store selection

use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use ssm_backend::{BackendError, MemoryStore, CURRENT_STAGE, PREVIOUS_STAGE};
use ssm_core::prelude::*;
use ssm_core::{FieldError, WriteError};
use ssm_tag::GenericTagParser;
use ssm_test_utils::{setup, test_config, ServiceConfig, Simple, Stores};
use std::sync::Arc;

#[derive(Structure, Serialize, Deserialize, Debug, Default, PartialEq)]
struct Numbers {
    #[pms("name")]
    name: String,
    #[pms("port")]
    port: u16,
}

#[tokio::test]
async fn missing_paths_are_reported_without_error() {
    let (_stores, serializer) = setup();

    let mut read = Simple::default();
    let results = serializer.unmarshal(&mut read).await.unwrap();

    let outcome = &results["name"];
    assert!(outcome.is_missing());
    assert_eq!(outcome.remote_name, "/dev/svc1/simple/test");
    assert_eq!(outcome.store, StoreType::Pms);
    assert_eq!(outcome.owner, "Simple");
    assert_eq!(read.name, "");
}

#[tokio::test]
async fn unparsable_value_fails_only_its_field() {
    let (stores, serializer) = setup();
    stores.parameters.insert("/dev/svc1/name", "api");
    stores.parameters.insert("/dev/svc1/port", "not-a-number");

    let mut read = Numbers::default();
    let results = serializer.unmarshal(&mut read).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(matches!(
        results["port"].error,
        Some(FieldError::Codec(ssm_reflect::CodecError::InvalidValue { .. }))
    ));
    assert_eq!(read.name, "api");
    assert_eq!(read.port, 0);
}

#[tokio::test]
async fn transient_read_failures_are_retried() {
    let (stores, serializer) = setup();
    stores.parameters.insert("/dev/svc1/simple/test", "x");
    stores.parameters.fail_next_gets(2);

    let mut read = Simple::default();
    serializer.unmarshal(&mut read).await.unwrap();
    assert_eq!(read.name, "x");

    stores.parameters.fail_next_gets(5);
    let err = serializer.unmarshal(&mut read).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, SsmError::Backend { store: StoreType::Pms, .. }));
}

#[tokio::test]
async fn unusable_roots_are_invalid_arguments() {
    let (_stores, serializer) = setup();

    let mut absent: Option<Simple> = None;
    let err = serializer.unmarshal(&mut absent).await.unwrap_err();
    assert!(err.is_invalid_argument());

    let mut scalar = 5_u32;
    let err = serializer.unmarshal(&mut scalar).await.unwrap_err();
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn store_without_backend_is_an_error_only_when_used() {
    let stores = Stores::new();
    let serializer = Serializer::new(test_config()).with_parameter_store(stores.parameters.clone());

    let results = serializer
        .marshal(&Simple {
            name: "n".into(),
        })
        .await
        .unwrap();
    assert!(results.is_empty());

    let err = serializer.marshal(&ServiceConfig::sample()).await.unwrap_err();
    assert!(matches!(err, SsmError::BackendMissing(StoreType::Asm)));
}

#[tokio::test]
async fn secret_writes_fall_back_to_update() {
    let (stores, serializer) = setup();

    let mut config = ServiceConfig::sample();
    serializer.marshal(&config).await.unwrap();
    config.api_key = "ak-456".into();
    let results = serializer.marshal(&config).await.unwrap();
    assert!(results.is_empty(), "unexpected failures: {results:?}");

    let entry = stores.secrets.entry("/dev/svc1/api-key").unwrap();
    assert_eq!(entry.versions.len(), 2);
    assert_eq!(entry.versions[0].value, "ak-123");
    assert_eq!(entry.versions[0].stages, vec![PREVIOUS_STAGE.to_string()]);
    assert_eq!(entry.versions[1].value, "ak-456");
    assert_eq!(entry.versions[1].stages, vec![CURRENT_STAGE.to_string()]);
}

#[derive(Structure, Serialize, Deserialize, Debug, Default)]
struct Locked {
    #[pms("locked, overwrite=false")]
    value: String,
}

#[tokio::test]
async fn overwrite_false_keeps_the_first_value() {
    let (stores, serializer) = setup();

    serializer.marshal(&Locked { value: "first".into() }).await.unwrap();
    let results = serializer.marshal(&Locked { value: "second".into() }).await.unwrap();

    assert!(matches!(
        results["value"].error,
        Some(FieldError::Backend(BackendError::AlreadyExists(_)))
    ));
    assert_eq!(stores.parameters.value("/dev/svc1/locked").as_deref(), Some("first"));
}

#[derive(Structure, Serialize, Deserialize, Debug, Default)]
struct Validated {
    #[pms(r"port, pattern=^\d{2}$")]
    port: u16,
    #[pms("host")]
    host: String,
    #[pms("token, keyid=local://main")]
    token: String,
}

#[tokio::test]
async fn rejected_fields_do_not_stop_siblings() {
    let (stores, serializer) = setup();

    let value = Validated {
        port: 8080,
        host: "example.org".into(),
        token: "t".into(),
    };
    let results = serializer.marshal(&value).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(matches!(
        results["port"].error,
        Some(FieldError::Write(WriteError::PatternMismatch(_)))
    ));
    assert!(matches!(
        &results["token"].error,
        Some(FieldError::Write(WriteError::UnknownKey(name))) if name == "main"
    ));
    assert_eq!(stores.parameters.paths(), vec!["/dev/svc1/host"]);
}

#[tokio::test]
async fn registered_keys_are_resolved() {
    let stores = Stores::new();
    let serializer = stores.serializer(test_config().with_key("main", "arn:aws:kms:key/main"));

    let value = Validated {
        port: 42,
        host: "example.org".into(),
        token: "t".into(),
    };
    assert!(serializer.marshal(&value).await.unwrap().is_empty());
    let token = stores.parameters.entry("/dev/svc1/token").unwrap();
    assert_eq!(token.key_id.as_deref(), Some("arn:aws:kms:key/main"));
}

#[tokio::test]
async fn store_rejections_are_per_field() {
    let (stores, serializer) = setup();
    stores.parameters.reject_writes_to("/dev/svc1/port");

    let results = serializer
        .marshal(&Numbers {
            name: "api".into(),
            port: 1,
        })
        .await
        .unwrap();

    assert!(matches!(
        results["port"].error,
        Some(FieldError::Backend(BackendError::WriteRejected { .. }))
    ));
    assert_eq!(stores.parameters.value("/dev/svc1/name").as_deref(), Some("api"));
}

#[derive(Structure, Serialize, Deserialize, Debug, Default)]
struct Pinned {
    #[asm("api-key, vs=AWSPREVIOUS")]
    previous: String,
}

#[tokio::test]
async fn secret_reads_honour_version_stage() {
    let (stores, serializer) = setup();
    stores.secrets.insert("/dev/svc1/api-key", "old");
    stores.secrets.insert("/dev/svc1/api-key", "new");

    let mut read = Pinned::default();
    serializer.unmarshal(&mut read).await.unwrap();
    assert_eq!(read.previous, "old");
}

#[tokio::test]
async fn filters_select_fields() {
    let (stores, serializer) = setup();

    let filter = FieldFilters::new().exclude("limits").include("limits.ratio");
    serializer
        .marshal_with_opts(&ServiceConfig::sample(), &filter, &[])
        .await
        .unwrap();

    assert!(stores.parameters.value("/dev/svc1/limits/ratio").is_some());
    assert!(stores.parameters.value("/dev/svc1/limits/timeout").is_none());
    assert!(stores.parameters.value("/dev/svc1/name").is_some());
}

#[tokio::test]
async fn usage_restricts_stores() {
    let stores = Stores::new();
    let serializer = stores.serializer(test_config().with_usage([StoreType::Pms]));

    serializer.marshal(&ServiceConfig::sample()).await.unwrap();
    assert!(stores.secrets.is_empty());
    assert!(!stores.parameters.is_empty());

    serializer
        .marshal_with_opts(&ServiceConfig::sample(), &FieldFilters::new(), &[StoreType::Asm])
        .await
        .unwrap();
    assert_eq!(stores.secrets.paths(), vec!["/dev/svc1/api-key"]);
}

#[derive(Structure, Serialize, Deserialize, Debug, Default)]
struct Dual {
    #[pms("dual")]
    #[asm("dual")]
    value: String,
}

#[tokio::test]
async fn secret_outcomes_replace_parameter_outcomes() {
    let (_stores, serializer) = setup();

    let mut read = Dual::default();
    let results = serializer.unmarshal(&mut read).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results["value"].store, StoreType::Asm);
}

#[tokio::test]
async fn optionals_can_stay_absent() {
    let (stores, _) = setup();
    stores.parameters.insert("/dev/svc1/feature/enabled", "true");

    let eager = stores.serializer(test_config());
    let mut read = ServiceConfig::default();
    eager.unmarshal(&mut read).await.unwrap();
    assert_eq!(read.feature.map(|f| f.enabled), Some(true));

    let lazy = stores.serializer(test_config().with_materialize_optional(false));
    let mut read = ServiceConfig::default();
    let results = lazy.unmarshal(&mut read).await.unwrap();
    assert!(read.feature.is_none());
    assert!(!results.contains_key("feature.enabled"));
}

#[derive(Structure, Serialize, Deserialize, Debug, Default)]
struct Untouched {
    #[pms("name")]
    name: String,
    #[pms("maybe")]
    maybe: Option<String>,
    cache: Option<u32>,
}

#[tokio::test]
async fn unread_optionals_stay_none() {
    let (stores, serializer) = setup();
    stores.parameters.insert("/dev/svc1/name", "n");

    let mut read = Untouched::default();
    let results = serializer.unmarshal(&mut read).await.unwrap();
    assert_eq!(read.name, "n");
    assert_eq!(read.maybe, None);
    assert_eq!(read.cache, None);
    assert!(results.is_empty(), "unexpected outcomes: {results:?}");

    stores.parameters.insert("/dev/svc1/maybe", "m");
    serializer.unmarshal(&mut read).await.unwrap();
    assert_eq!(read.maybe.as_deref(), Some("m"));
    assert_eq!(read.cache, None);
}

#[derive(Structure, Serialize, Deserialize, Debug, Default)]
struct Chain {
    #[pms("v")]
    v: String,
    next: Option<Box<Chain>>,
}

#[tokio::test]
async fn recursive_optionals_grow_only_as_deep_as_the_values() {
    let (stores, serializer) = setup();
    stores.parameters.insert("/dev/svc1/v", "first");
    stores.parameters.insert("/dev/svc1/next/v", "second");

    let mut read = Chain::default();
    let results = serializer.unmarshal(&mut read).await.unwrap();
    assert!(results.is_empty(), "unexpected outcomes: {results:?}");
    assert_eq!(read.v, "first");

    let next = read.next.as_deref().unwrap();
    assert_eq!(next.v, "second");
    assert!(next.next.is_none());
}

#[tokio::test]
async fn remotely_missing_optional_stays_none() {
    let (_stores, serializer) = setup();

    let mut read = ServiceConfig::default();
    let results = serializer.unmarshal(&mut read).await.unwrap();
    assert!(read.feature.is_none());
    assert!(!results.contains_key("feature.enabled"));
    assert!(results["name"].is_missing());
}

#[derive(Structure, Serialize, Deserialize, Debug, Default)]
struct Reported {
    #[pms("name")]
    #[ssm(report = "name-report, owner=ops")]
    name: String,
}

#[tokio::test]
async fn custom_namespaces_are_parsed_but_not_synchronized() {
    let stores = Stores::new();
    let serializer = stores
        .serializer(test_config())
        .register_tag_parser("report", GenericTagParser::new(["owner"]));

    let value = Reported {
        name: "n".into(),
    };
    let tree = serializer.parse(&value).unwrap();
    let (_, node) = tree.find("name").unwrap();
    let tag = node.tag("report").unwrap();
    assert_eq!(tag.full_name(), "/dev/svc1/name-report");
    assert_eq!(tag.base().named_value("owner"), Some("ops"));

    serializer.marshal(&value).await.unwrap();
    assert_eq!(stores.parameters.paths(), vec!["/dev/svc1/name"]);
    assert!(stores.secrets.is_empty());
}

#[tokio::test]
async fn deleting_twice_is_not_an_error() {
    let (stores, serializer) = setup();
    let value = ServiceConfig::sample();
    serializer.marshal(&value).await.unwrap();

    let results = serializer.delete(&value).await.unwrap();
    assert!(results.is_empty(), "unexpected outcomes: {results:?}");
    assert!(stores.parameters.is_empty());
    assert!(stores.secrets.is_empty());

    let results = serializer.delete(&value).await.unwrap();
    assert_eq!(results.len(), 9);
    assert!(results.values().all(FieldResult::is_missing));
    assert_eq!(results["api_key"].store, StoreType::Asm);
    assert_eq!(results["api_key"].remote_name, "/dev/svc1/api-key");
    assert_eq!(results["limits.timeout"].store, StoreType::Pms);
}

#[tokio::test]
async fn delete_reports_only_absent_entries() {
    let (stores, serializer) = setup();
    stores.parameters.insert("/dev/svc1/name", "n");

    let results = serializer.delete(&Numbers::default()).await.unwrap();
    assert_eq!(results.keys().collect::<Vec<_>>(), vec!["port"]);
    assert_eq!(results["port"].remote_name, "/dev/svc1/port");
    assert!(stores.parameters.is_empty());
}

#[tokio::test]
async fn delete_respects_filters() {
    let (stores, serializer) = setup();
    let value = ServiceConfig::sample();
    serializer.marshal(&value).await.unwrap();

    serializer
        .delete_with_opts(&value, &FieldFilters::new().exclude("limits"), &[StoreType::Pms])
        .await
        .unwrap();

    assert!(stores.parameters.value("/dev/svc1/limits/timeout").is_some());
    assert!(stores.parameters.value("/dev/svc1/name").is_none());
    assert!(!stores.secrets.is_empty());
}

#[tokio::test]
async fn delete_tree_pages_until_exhausted() {
    let stores = Stores::with_page_size(2);
    let serializer = stores.serializer(test_config());
    for i in 0..5 {
        stores.parameters.insert(format!("/dev/svc1/a/{i}"), "v");
    }
    stores.parameters.insert("/dev/svc1/b", "kept");
    stores.secrets.insert("/dev/svc1/a/secret", "s");

    let deleted = serializer
        .delete_tree(&[], &["/dev/svc1/a".to_string()])
        .await
        .unwrap();

    assert_eq!(deleted, 6);
    assert_eq!(stores.parameters.paths(), vec!["/dev/svc1/b"]);
    assert!(stores.secrets.is_empty());
}

#[tokio::test]
async fn delete_tree_needs_a_prefix() {
    let (_stores, serializer) = setup();
    assert!(serializer.delete_tree(&[], &[]).await.unwrap_err().is_invalid_argument());
    assert!(serializer
        .delete_tree(&[], &[String::new()])
        .await
        .unwrap_err()
        .is_invalid_argument());
}

#[tokio::test]
async fn delete_tree_skips_stores_without_backend() {
    let parameters = Arc::new(MemoryStore::parameters());
    parameters.insert("/dev/svc1/x", "1");
    let serializer = Serializer::new(test_config()).with_parameter_store(parameters.clone());

    let deleted = serializer
        .delete_tree(&[], &["/dev/".to_string()])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(parameters.is_empty());
}
