pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use url::Url;
use utils::{FakePushNotifier, RecordingNotifier};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::notifications::{MultiNotifier, Notifier, NotifierBackend};
use crate::orchestrator::{InMemoryOrchestrator, ProcessingMeta, Task, TaskStatus, TaskType};
use crate::webhooks::signing::{SIGNATURE_HEADER, TIMESTAMP_HEADER, verify_signature};
use crate::webhooks::{ReqwestHttpClient, UrlPolicy, WebhookConfig, WebhookDispatcher, WebhookMethod, WebhookOverride};

struct Harness {
    orchestrator: Arc<InMemoryOrchestrator>,
    dispatcher: Arc<WebhookDispatcher>,
    notifier: MultiNotifier,
}

fn harness(extra: Vec<NotifierBackend>) -> Harness {
    let orchestrator = Arc::new(InMemoryOrchestrator::new());
    let dispatcher = Arc::new(
        WebhookDispatcher::new(orchestrator.clone(), Arc::new(ReqwestHttpClient::default()))
            .with_request_timeout(Duration::from_secs(5)),
    );
    let mut backends = vec![NotifierBackend::Webhook(dispatcher.clone())];
    backends.extend(extra);

    Harness {
        orchestrator,
        dispatcher,
        notifier: MultiNotifier::new(backends),
    }
}

fn webhook(server: &MockServer) -> WebhookConfig {
    WebhookConfig::builder()
        .url(Url::parse(&format!("{}/hooks/docling", server.uri())).unwrap())
        .build()
}

/// Full lifecycle through the composer: submit, run, complete, deliver.
#[test_log::test(tokio::test)]
async fn test_e2e_task_completion_delivers_signed_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/hooks/docling"))
        .and(header("content-type", "application/json"))
        .and(header("x-team", "docs"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let push = Arc::new(FakePushNotifier::new());
    let h = harness(vec![NotifierBackend::push(push.clone())]);

    let config = WebhookConfig {
        method: WebhookMethod::Put,
        secret: Some("abc".to_string()),
        headers: [("X-Team".to_string(), "docs".to_string())].into(),
        ..webhook(&server)
    };

    h.orchestrator.upsert(Task::new("task-1", TaskType::Convert));
    h.notifier.add_task("task-1").await.unwrap();
    h.notifier.register_webhook("task-1", Some(config));

    h.orchestrator.set_status("task-1", TaskStatus::Started);
    h.notifier.notify_task_subscribers("task-1").await.unwrap();

    h.orchestrator.upsert(
        Task::new("task-1", TaskType::Convert)
            .with_status(TaskStatus::Success)
            .with_meta(ProcessingMeta {
                num_docs: 1,
                num_processed: 1,
                num_succeeded: 1,
                num_failed: 0,
            }),
    );
    h.orchestrator.set_result_locator("task-1", "s3://results/task-1.zip");
    h.notifier.notify_task_subscribers("task-1").await.unwrap();
    h.notifier.notify_task_subscribers("task-1").await.unwrap();
    h.dispatcher.drain().await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let timestamp: i64 = request.headers.get(TIMESTAMP_HEADER).unwrap().to_str().unwrap().parse().unwrap();
    let signature = request.headers.get(SIGNATURE_HEADER).unwrap().to_str().unwrap();
    assert!(verify_signature(timestamp, &request.body, signature, "abc"));
    assert!(!verify_signature(timestamp, &request.body, signature, "not-the-secret"));

    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "task_id": "task-1",
            "status": "success",
            "type": "convert",
            "processing_meta": {"num_docs": 1, "num_processed": 1, "num_succeeded": 1, "num_failed": 0},
            "result_locator": "s3://results/task-1.zip"
        })
    );

    // The push backend saw every lifecycle event too
    assert_eq!(
        push.calls(),
        vec![
            "add_task:task-1".to_string(),
            "notify_task_subscribers:task-1".to_string(),
            "notify_task_subscribers:task-1".to_string(),
            "notify_task_subscribers:task-1".to_string(),
        ]
    );
}

#[test_log::test(tokio::test)]
async fn test_e2e_failing_endpoint_is_retried_then_abandoned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let h = harness(vec![]);
    let config = WebhookConfig {
        max_retries: 2,
        backoff_factor: 0.01,
        ..webhook(&server)
    };

    h.orchestrator.upsert(Task::new("task-1", TaskType::Chunk).with_status(TaskStatus::Failure));
    h.notifier.register_webhook("task-1", Some(config));
    h.notifier.notify_task_subscribers("task-1").await.unwrap();
    h.dispatcher.drain().await;

    // Mock expectations (exactly 3 attempts) are verified when the server drops
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_e2e_unreachable_endpoint_never_reaches_orchestrator() {
    let h = harness(vec![]);
    let config = WebhookConfig::builder()
        .url(Url::parse("http://127.0.0.1:1/hook").unwrap())
        .max_retries(1)
        .backoff_factor(0.0)
        .build();

    h.orchestrator.upsert(Task::new("task-1", TaskType::Convert).with_status(TaskStatus::Success));
    h.notifier.register_webhook("task-1", Some(config));

    assert!(h.notifier.notify_task_subscribers("task-1").await.is_ok());
    h.dispatcher.drain().await;
    assert!(h.dispatcher.is_dispatched("task-1"));
}

#[tokio::test]
async fn test_e2e_unregistered_and_removed_tasks_send_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(vec![]);
    h.orchestrator.upsert(Task::new("plain", TaskType::Convert).with_status(TaskStatus::Success));
    h.orchestrator.upsert(Task::new("removed", TaskType::Convert).with_status(TaskStatus::Success));

    h.notifier.register_webhook("removed", Some(webhook(&server)));
    h.notifier.remove_task("removed").await.unwrap();

    h.notifier.notify_task_subscribers("plain").await.unwrap();
    h.notifier.notify_task_subscribers("removed").await.unwrap();
    h.dispatcher.drain().await;

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_e2e_failing_backend_does_not_stop_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let broken = Arc::new(RecordingNotifier::failing());
    let h = harness(vec![NotifierBackend::Other(broken.clone())]);
    h.orchestrator.upsert(Task::new("task-1", TaskType::Convert).with_status(TaskStatus::Success));
    h.notifier.register_webhook("task-1", Some(webhook(&server)));

    h.notifier.notify_task_subscribers("task-1").await.unwrap();
    h.dispatcher.drain().await;

    assert_eq!(broken.calls(), vec!["notify_task_subscribers:task-1".to_string()]);
}

#[tokio::test]
async fn test_e2e_override_is_validated_then_applied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/task-specific"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let default = WebhookConfig::builder()
        .url(Url::parse("https://hooks.example.com/default").unwrap())
        .build();

    // The mock server is plain http on 127.0.0.1
    let strict = UrlPolicy::new(vec!["hooks.example.com".to_string()], vec!["https".to_string()]);
    let over = WebhookOverride::new(Url::parse(&format!("{}/task-specific", server.uri())).unwrap(), None);
    assert!(over.clone().validated(&strict).is_err());

    let relaxed = UrlPolicy::new(vec!["127.0.0.1".to_string()], vec!["http".to_string()]);
    let over = over.validated(&relaxed).unwrap();

    let h = harness(vec![]);
    h.orchestrator.upsert(Task::new("task-1", TaskType::Convert).with_status(TaskStatus::Success));
    h.notifier.register_webhook("task-1", Some(default.with_override(&over)));
    h.notifier.notify_task_subscribers("task-1").await.unwrap();
    h.dispatcher.drain().await;
}
