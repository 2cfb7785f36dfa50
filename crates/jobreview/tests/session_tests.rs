//! ReviewSession against a mock job service.

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{http_session, ConfigBuilder};
use jobreview::remote::{Classifier, PredictRequest, TrainRequest};
use jobreview::session::CollectionSource;
use jobreview::{
    Category, FailurePolicy, FetchOutcome, LabelChange, LabelOutcome, NotificationKind,
    OrderingKind, ReviewError,
};

fn jobs(ids: &[&str]) -> serde_json::Value {
    let data: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "id": id,
                "title": format!("Job {id}"),
                "label": "",
                "date_created": format!("2021-05-{:02}T10:00:00Z", i + 1)
            })
        })
        .collect();
    json!({"msg": "Success", "data": data})
}

#[tokio::test]
async fn test_load_page_and_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs(&["a", "b"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/count_jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": 95})))
        .mount(&server)
        .await;

    let session = http_session(ConfigBuilder::new().endpoint(&server.uri()).page_size(10).build());

    let outcome = session.load_page().await.unwrap();
    assert_eq!(outcome, FetchOutcome::Applied { records: 2 });
    assert_eq!(session.source(), CollectionSource::Remote);
    assert_eq!(session.refresh_count().await.unwrap(), 95);

    let view = session.visible_page();
    assert_eq!(view.cursor.max_pages(), 10);
    // Most recent first.
    let ids: Vec<&str> = view.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(session.store().snapshot().columns().len(), 4);
}

#[tokio::test]
async fn test_filter_toggle_changes_query_and_resets_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .and(query_param("filter", "good,maybe,irrelevant,uncategorized"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs(&["x"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/count_jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": 100})))
        .mount(&server)
        .await;

    let session = http_session(ConfigBuilder::new().endpoint(&server.uri()).page_size(10).build());
    session.refresh_count().await.unwrap();
    assert_eq!(session.set_page(4), 4);

    assert_eq!(session.toggle_filter("bad"), Some(false));
    assert_eq!(session.toggle_filter("nonsense"), None);
    assert_eq!(session.cursor().current_page(), 1);

    session.load_page().await.unwrap();
    assert!(session.store().get("x").is_some());
}

#[tokio::test]
async fn test_stale_page_response_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jobs(&["old"]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs(&["new"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/count_jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": 30})))
        .mount(&server)
        .await;

    let session = http_session(ConfigBuilder::new().endpoint(&server.uri()).page_size(10).build());
    session.refresh_count().await.unwrap();

    let slow = {
        let session = session.clone();
        tokio::spawn(async move { session.load_page().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    session.set_page(2);
    let fast = session.load_page().await.unwrap();
    assert_eq!(fast, FetchOutcome::Applied { records: 1 });

    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow, FetchOutcome::Stale);
    assert!(session.store().get("new").is_some());
    assert!(session.store().get("old").is_none());
}

#[tokio::test]
async fn test_remote_failure_is_reported_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs(&["a"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let session = http_session(ConfigBuilder::new().endpoint(&server.uri()).build());
    let mut notifications = session.notifier().subscribe();

    session.load_page().await.unwrap();
    let before = session.store().snapshot();

    let err = session.load_page().await.unwrap_err();
    assert!(matches!(err, ReviewError::Remote(_)));
    assert!(session.store().snapshot().ptr_eq(&before));

    let notification = notifications.try_recv().unwrap();
    assert_eq!(
        notification.kind,
        NotificationKind::RemoteFailed {
            operation: "list_jobs".to_string()
        }
    );
}

#[tokio::test]
async fn test_label_failure_with_rollback_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs(&["a", "b"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/update_job"))
        .and(query_param("id", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "Failed to update"})))
        .mount(&server)
        .await;

    let config = ConfigBuilder::new()
        .endpoint(&server.uri())
        .failure_policy(FailurePolicy::Rollback)
        .build();
    let session = http_session(config);
    let mut notifications = session.notifier().subscribe();
    session.load_page().await.unwrap();

    let handle = session.set_label(LabelChange::parse("a", "Good").unwrap());
    assert_eq!(
        session.store().get("a").unwrap().label.as_deref(),
        Some("Good")
    );

    let outcome = handle.await.unwrap();
    assert!(matches!(
        outcome,
        LabelOutcome::Failed {
            rolled_back: true,
            ..
        }
    ));
    assert_eq!(session.store().get("a").unwrap().label, None);

    let kinds: Vec<NotificationKind> = std::iter::from_fn(|| notifications.try_recv().ok())
        .map(|n| n.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::LabelUpdateFailed {
                job_id: "a".to_string(),
                label: "Good".to_string()
            },
            NotificationKind::RolledBack {
                job_id: "a".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_late_failure_does_not_revert_reloaded_label() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs(&["a"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "msg": "Success",
            "data": [{"id": "a", "title": "Job a", "label": "Bad", "date_created": "2021-05-01T10:00:00Z"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/update_job"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"msg": "Failed to update"}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let config = ConfigBuilder::new()
        .endpoint(&server.uri())
        .failure_policy(FailurePolicy::Rollback)
        .build();
    let session = http_session(config);
    session.load_page().await.unwrap();

    let handle = session.set_label(LabelChange::parse("a", "Good").unwrap());
    session.load_page().await.unwrap();
    assert_eq!(session.store().get("a").unwrap().label.as_deref(), Some("Bad"));

    let outcome = handle.await.unwrap();
    assert!(matches!(
        outcome,
        LabelOutcome::Failed {
            rolled_back: false,
            ..
        }
    ));
    assert_eq!(session.store().get("a").unwrap().label.as_deref(), Some("Bad"));
}

#[tokio::test]
async fn test_label_failure_keeps_optimistic_label_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs(&["a"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/update_job"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = http_session(ConfigBuilder::new().endpoint(&server.uri()).build());
    session.load_page().await.unwrap();

    let outcome = session
        .set_label(LabelChange::parse("a", "Maybe").unwrap())
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        LabelOutcome::Failed {
            rolled_back: false,
            ..
        }
    ));
    assert_eq!(
        session.store().get("a").unwrap().label.as_deref(),
        Some("Maybe")
    );
}

#[tokio::test]
async fn test_predict_seeds_predicted_collection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "msg": [
                {"id": "p1", "title": "Maybe job", "predicted": "Maybe", "date_created": "2021-05-02"},
                {"id": "p2", "title": "Good job", "predicted": "Good", "date_created": "2021-05-01"},
                {"id": "p3", "title": "Bad job", "predicted": "Bad", "date_created": "2021-05-03"}
            ],
            "report": "accuracy 0.9"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/update_job"))
        .and(query_param("id", "p3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "Success"})))
        .expect(1)
        .mount(&server)
        .await;

    let session = http_session(
        ConfigBuilder::new()
            .endpoint(&server.uri())
            .ordering(OrderingKind::PredictedRank)
            .build(),
    );

    let count = session.predict(&PredictRequest::default()).await.unwrap();
    assert_eq!(count, 3);
    assert_eq!(session.report().as_deref(), Some("accuracy 0.9"));
    assert!(session.store().snapshot().is_empty());

    let ids: Vec<String> = session
        .predicted_records()
        .iter()
        .map(|r| r.id.to_string())
        .collect();
    assert_eq!(ids, vec!["p2", "p1", "p3"]);

    let outcome = session
        .set_predicted_label(LabelChange::parse("p3", "Irrelevant").unwrap())
        .await
        .unwrap();
    assert!(outcome.is_acknowledged());
    assert_eq!(
        session.predicted_store().get("p3").unwrap().category(),
        Some(Category::Irrelevant)
    );
}

#[tokio::test]
async fn test_train_failure_is_notified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/train"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": {}})))
        .mount(&server)
        .await;

    let session = http_session(ConfigBuilder::new().endpoint(&server.uri()).build());
    let mut notifications = session.notifier().subscribe();

    let err = session
        .train(&TrainRequest {
            search: false,
            classifier: Classifier::VotingClassifier,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::Remote(_)));
    assert_eq!(
        notifications.try_recv().unwrap().kind,
        NotificationKind::RemoteFailed {
            operation: "train".to_string()
        }
    );
}

#[tokio::test]
async fn test_refill_refetches_page_and_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "Done"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs(&["fresh"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/count_jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let session = http_session(ConfigBuilder::new().endpoint(&server.uri()).build());
    let outcome = session.refill().await.unwrap();

    assert_eq!(outcome, FetchOutcome::Applied { records: 1 });
    assert!(session.store().get("fresh").is_some());
    assert_eq!(session.cursor().total_count(), 1);
}
