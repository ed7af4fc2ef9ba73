use super::*;

const SQL: &str = "sql_dataset.jsonl";

#[tokio::test(start_paused = true)]
async fn test_preview_failure_keeps_job_completed() {
    let service = Arc::new(
        FakeService::new()
            .with_statuses(SQL, [completed(100)])
            .with_preview(
                SQL,
                Err(Error::Http {
                    status: 500,
                    message: "preview broke".into(),
                }),
            ),
    );
    let controller = create_test_controller(service.clone());
    let mut events = controller.subscribe();

    controller.submit(GenerationRequest::new("sql")).await.unwrap();
    let events = collect_until(&mut events, is_preview_outcome).await;

    match events.last().unwrap() {
        Event::PreviewUnavailable { file_name, error } => {
            assert_eq!(file_name.as_str(), SQL);
            assert!(error.as_deref().unwrap().contains("preview broke"));
        }
        other => panic!("expected PreviewUnavailable, got {other:?}"),
    }
    assert!(
        !events.iter().any(|e| matches!(e, Event::Failed { .. })),
        "a preview failure is not a job failure"
    );

    let job = controller.snapshot().await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert!(job.preview.is_empty());
    assert_eq!(job.message, PREVIEW_FAILED_MESSAGE);
    assert_eq!(
        job.download_url.unwrap().as_str(),
        "http://datagen.test/download/sql_dataset.jsonl",
        "artifact stays downloadable"
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_preview_is_not_an_error() {
    let service = Arc::new(
        FakeService::new()
            .with_statuses(SQL, [completed(100)])
            .with_preview(SQL, Ok(Vec::new())),
    );
    let controller = create_test_controller(service.clone());
    let mut events = controller.subscribe();

    controller.submit(GenerationRequest::new("sql")).await.unwrap();
    let events = collect_until(&mut events, is_preview_outcome).await;

    assert_eq!(
        events.last().unwrap(),
        &Event::PreviewUnavailable {
            file_name: FileName::new(SQL),
            error: None
        }
    );
    let job = controller.snapshot().await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.message, PREVIEW_EMPTY_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn test_preview_waits_for_settle_delay() {
    let service = Arc::new(FakeService::new().with_statuses(SQL, [completed(100)]));
    let controller = create_test_controller(service.clone());

    controller.submit(GenerationRequest::new("sql")).await.unwrap();

    // Completed at 3.0 s; preview due at 3.6 s
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(service.status_calls(), 1);
    assert_eq!(service.preview_calls(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(service.preview_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_preview_fetched_exactly_once() {
    let service = Arc::new(
        FakeService::new()
            .with_statuses(SQL, [completed(100)])
            .with_preview(SQL, Ok(vec![json!({"n": 1})])),
    );
    let controller = create_test_controller(service.clone());
    let mut events = controller.subscribe();

    controller.submit(GenerationRequest::new("sql")).await.unwrap();
    collect_until(&mut events, is_preview_outcome).await;

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(service.preview_calls(), 1);
    assert!(controller.snapshot().await.preview_requested());
}

#[tokio::test(start_paused = true)]
async fn test_superseded_job_is_not_previewed() {
    let service = Arc::new(FakeService::new().with_statuses(SQL, [completed(100)]));
    let controller = create_test_controller(service.clone());

    controller.submit(GenerationRequest::new("sql")).await.unwrap();

    // Inside the settle window of the first job
    tokio::time::sleep(Duration::from_millis(3300)).await;
    controller
        .submit(GenerationRequest::new("poetry"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(service.preview_calls(), 0);
    assert_eq!(
        controller.snapshot().await.file_name.unwrap().as_str(),
        "poetry_dataset.jsonl"
    );
}
