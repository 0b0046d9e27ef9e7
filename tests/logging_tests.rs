use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use oss_bucket::{
    BucketClient, BucketName, ClientFactory, InMemoryClientFactory, OssBucket, OssConfig,
    StorageError, StorageResult,
};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer,
};

#[derive(Debug, Clone)]
struct Record {
    level: Level,
    fields: HashMap<String, String>,
}

impl Record {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Collects events emitted by the bucket façade
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<Record>>>);

impl Captured {
    fn at(&self, level: Level) -> Vec<Record> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct FieldVisitor(HashMap<String, String>);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("oss_bucket::services") {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.0.lock().unwrap().push(Record {
            level: *event.metadata().level(),
            fields: visitor.0,
        });
    }
}

fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

fn config() -> OssConfig {
    OssConfig::builder()
        .endpoint("memory://local")
        .access_key_id("test")
        .access_key_secret("test")
        .bucket(BucketName::new("log-bucket").unwrap())
        .build()
}

/// Counts client constructions, optionally failing the first few
struct CountingFactory {
    inner: InMemoryClientFactory,
    created: AtomicUsize,
    failures_left: AtomicUsize,
}

impl CountingFactory {
    fn new(failures: usize) -> Self {
        Self {
            inner: InMemoryClientFactory::new(),
            created: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl ClientFactory for CountingFactory {
    async fn create_client(&self, config: &OssConfig) -> StorageResult<Arc<dyn BucketClient>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StorageError::Configuration {
                message: "endpoint unreachable".to_string(),
            });
        }
        self.inner.create_client(config).await
    }
}

#[tokio::test]
async fn test_every_call_logged_with_arguments() {
    let (captured, _guard) = capture();
    let bucket = OssBucket::new(config(), Arc::new(InMemoryClientFactory::new()));

    bucket.put_object("a.txt", "hello").await.unwrap();
    bucket.list_objects("", 10, "/", "").await.unwrap();
    bucket.delete_objects(&["a.txt"]).await.unwrap();

    let info = captured.at(Level::INFO);
    assert_eq!(info.len(), 3);

    assert_eq!(info[0].field("operation"), Some("put_object"));
    assert_eq!(info[0].field("args"), Some("name=a.txt,content=<5 bytes>"));
    assert_eq!(
        info[1].field("args"),
        Some("prefix=,max_keys=10,delimiter=/,marker=")
    );
    assert_eq!(info[2].field("operation"), Some("delete_objects"));
    assert_eq!(info[2].field("args"), Some("names=0=a.txt"));

    assert!(captured.at(Level::ERROR).is_empty());
}

#[tokio::test]
async fn test_failure_logged_once_as_error() {
    let (captured, _guard) = capture();
    let bucket = OssBucket::new(config(), Arc::new(InMemoryClientFactory::new()));

    let err = bucket.get_object("missing.txt").await.unwrap_err();
    assert!(matches!(err, StorageError::ObjectNotFound { .. }));

    let errors = captured.at(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("operation"), Some("get_object"));
    assert!(errors[0].field("error").unwrap().contains("missing.txt"));

    let info = captured.at(Level::INFO);
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].field("args"), Some("name=missing.txt"));
}

#[tokio::test]
async fn test_validation_failure_logged() {
    let (captured, _guard) = capture();
    let bucket = OssBucket::new(config(), Arc::new(InMemoryClientFactory::new()));

    assert!(bucket.put_object("/absolute", "x").await.is_err());

    assert_eq!(captured.at(Level::INFO).len(), 1);
    assert_eq!(captured.at(Level::ERROR).len(), 1);
}

#[tokio::test]
async fn test_client_constructed_once() {
    let factory = Arc::new(CountingFactory::new(0));
    let bucket = Arc::new(OssBucket::new(config(), factory.clone()));

    let calls = (0..16).map(|i| {
        let bucket = bucket.clone();
        tokio::spawn(async move { bucket.put_object(&format!("obj-{}", i), "x").await })
    });
    for result in futures::future::join_all(calls).await {
        result.unwrap().unwrap();
    }

    bucket.list_objects("", 100, "/", "").await.unwrap();
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_construction_retried_on_next_call() {
    let factory = Arc::new(CountingFactory::new(1));
    let bucket = OssBucket::new(config(), factory.clone());

    let err = bucket.does_object_exist("a.txt").await.unwrap_err();
    assert!(matches!(err, StorageError::Configuration { .. }));

    assert!(!bucket.does_object_exist("a.txt").await.unwrap());
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);

    bucket.put_object("a.txt", "x").await.unwrap();
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);
}
