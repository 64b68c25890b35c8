use super::*;
use crate::types::{SecondaryDownload, WorkItem};

async fn mount_ok(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn url(server: &MockServer, route: &str) -> String {
    format!("{}{}", server.uri(), route)
}

#[tokio::test]
async fn test_failed_item_does_not_stop_the_batch() {
    let temp_dir = tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.mp3"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bbb".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ccc".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let downloader = create_test_downloader(test_config(temp_dir.path()), None);
    let items = vec![
        episode("A", &url(&server, "/a.mp3"), 0),
        episode("B", &url(&server, "/b.mp3"), 1),
        episode("C", &url(&server, "/c.mp3"), 2),
    ];

    let result = downloader.run_batch(&test_feed(3), items).await;

    assert_eq!(
        result,
        BatchResult {
            completed_count: 2,
            had_errors: true
        }
    );
    assert!(!temp_dir.path().join("A.mp3").exists());
    assert_eq!(std::fs::read(temp_dir.path().join("B.mp3")).unwrap(), b"bbb");
    assert_eq!(std::fs::read(temp_dir.path().join("C.mp3")).unwrap(), b"ccc");
}

#[tokio::test]
async fn test_missing_url_sets_error_and_continues() {
    let temp_dir = tempdir().unwrap();
    let server = MockServer::start().await;
    mount_ok(&server, "/b.mp3", b"bbb").await;

    let downloader = create_test_downloader(test_config(temp_dir.path()), None);
    let mut events = downloader.subscribe();

    let no_source = WorkItem {
        title: "Nothing".into(),
        guid: "g0".into(),
        link: Some("https://example.com/episode-page".into()),
        secondary_downloads: vec![SecondaryDownload {
            url: url(&server, "/cover.jpg"),
            output_path: temp_dir.path().join("cover.jpg"),
            key: None,
        }],
        ..Default::default()
    };
    let items = vec![no_source, episode("B", &url(&server, "/b.mp3"), 1)];

    let result = downloader.run_batch(&test_feed(2), items).await;

    assert_eq!(result.completed_count, 1);
    assert!(result.had_errors);
    // abandoned item's secondaries never run
    assert!(!temp_dir.path().join("cover.jpg").exists());

    let mut failures = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::ItemFailed { marker, error } = event {
            failures.push((marker, error));
        }
    }
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "Nothing");
    assert!(failures[0].1.contains("Unable to find episode download URL"));
}

#[tokio::test]
async fn test_pool_width_bounds_active_items() {
    let temp_dir = tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"audio".to_vec()))
        .mount(&server)
        .await;

    let mut config = test_config(temp_dir.path());
    config.download.threads = 2;
    config.post_process.mono = true;

    let transcoder = Arc::new(SlowTranscoder::default());
    let downloader = Downloader::with_parts(config, None, transcoder.clone()).unwrap();

    let items: Vec<WorkItem> = (0..6)
        .map(|i| episode(&format!("Ep{i}"), &url(&server, &format!("/{i}.mp3")), i))
        .collect();

    let result = downloader.run_batch(&test_feed(6), items).await;

    assert_eq!(result.completed_count, 6);
    assert!(!result.had_errors);
    assert_eq!(transcoder.max_active.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_width_one_admits_in_submission_order() {
    let temp_dir = tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"audio".to_vec()))
        .mount(&server)
        .await;

    let mut config = test_config(temp_dir.path());
    config.post_process.mono = true;

    let transcoder = Arc::new(SlowTranscoder::default());
    let downloader = Downloader::with_parts(config, None, transcoder.clone()).unwrap();

    let titles = ["First", "Second", "Third", "Fourth"];
    let items: Vec<WorkItem> = titles
        .iter()
        .enumerate()
        .map(|(i, t)| episode(t, &url(&server, &format!("/{i}.mp3")), i))
        .collect();

    let result = downloader.run_batch(&test_feed(4), items).await;
    assert_eq!(result.completed_count, 4);

    let started = transcoder.started.lock().unwrap().clone();
    assert_eq!(
        started,
        vec!["First.mp3", "Second.mp3", "Third.mp3", "Fourth.mp3"]
    );
    assert_eq!(transcoder.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_secondary_downloads_are_isolated() {
    let temp_dir = tempdir().unwrap();
    let server = MockServer::start().await;
    mount_ok(&server, "/ep.mp3", b"episode").await;
    mount_ok(&server, "/cover.jpg", b"jpeg").await;
    Mock::given(method("GET"))
        .and(path("/transcript.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let downloader = create_test_downloader(test_config(temp_dir.path()), None);

    let mut item = episode("Ep", &url(&server, "/ep.mp3"), 0);
    item.secondary_downloads = vec![
        SecondaryDownload {
            url: url(&server, "/transcript.txt"),
            output_path: temp_dir.path().join("extras").join("transcript.txt"),
            key: None,
        },
        SecondaryDownload {
            url: url(&server, "/cover.jpg"),
            output_path: temp_dir.path().join("extras").join("cover.jpg"),
            key: None,
        },
    ];

    let result = downloader.run_batch(&test_feed(1), vec![item]).await;

    // primary succeeded, one secondary failed, the other still ran
    assert_eq!(result.completed_count, 1);
    assert!(result.had_errors);
    assert!(temp_dir.path().join("Ep.mp3").exists());
    assert_eq!(
        std::fs::read(temp_dir.path().join("extras").join("cover.jpg")).unwrap(),
        b"jpeg"
    );
    assert!(!temp_dir.path().join("extras").join("transcript.txt").exists());
}

#[tokio::test]
async fn test_secondaries_run_after_primary_failure() {
    let temp_dir = tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ep.mp3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_ok(&server, "/cover.jpg", b"jpeg").await;

    let downloader = create_test_downloader(test_config(temp_dir.path()), None);
    let mut item = episode("Ep", &url(&server, "/ep.mp3"), 0);
    item.secondary_downloads = vec![SecondaryDownload {
        url: url(&server, "/cover.jpg"),
        output_path: temp_dir.path().join("cover.jpg"),
        key: None,
    }];

    let result = downloader.run_batch(&test_feed(1), vec![item]).await;

    assert_eq!(result.completed_count, 0);
    assert!(result.had_errors);
    assert!(temp_dir.path().join("cover.jpg").exists());
}

#[tokio::test]
async fn test_post_processing_failure_keeps_file_and_flags_error() {
    let temp_dir = tempdir().unwrap();
    let server = MockServer::start().await;
    mount_ok(&server, "/ep.mp3", b"episode").await;

    let mut config = test_config(temp_dir.path());
    config.post_process.bitrate = Some("64k".into());
    // NoOpTranscoder rejects every job
    let downloader = create_test_downloader(config, None);

    let result = downloader
        .run_batch(&test_feed(1), vec![episode("Ep", &url(&server, "/ep.mp3"), 0)])
        .await;

    assert_eq!(
        result,
        BatchResult {
            completed_count: 0,
            had_errors: true
        }
    );
    assert!(temp_dir.path().join("Ep.mp3").exists());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let temp_dir = tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ep.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"episode".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(temp_dir.path());
    config.archive.prefix = Some("show".into());
    let archive = Arc::new(MemoryArchive::new());
    let downloader = create_test_downloader(config, Some(archive.clone() as Arc<dyn ArchiveStore>));
    let items = vec![episode("Ep", &url(&server, "/ep.mp3"), 0)];

    let first = downloader.run_batch(&test_feed(1), items.clone()).await;
    assert_eq!(first.completed_count, 1);
    assert!(archive.contains(&ArchiveKey::new("show-Ep.mp3")).await.unwrap());

    // file removed locally, archive still remembers it
    std::fs::remove_file(temp_dir.path().join("Ep.mp3")).unwrap();
    let second = downloader.run_batch(&test_feed(1), items).await;

    assert_eq!(
        second,
        BatchResult {
            completed_count: 0,
            had_errors: false
        }
    );
    assert!(!temp_dir.path().join("Ep.mp3").exists());
}

#[tokio::test]
async fn test_always_postprocess_counts_existing_files() {
    let temp_dir = tempdir().unwrap();
    std::fs::write(temp_dir.path().join("Ep.mp3"), b"already here").unwrap();

    let mut config = test_config(temp_dir.path());
    config.download.always_postprocess = true;
    let downloader = create_test_downloader(config, None);

    let result = downloader
        .run_batch(
            &test_feed(1),
            vec![episode("Ep", "http://127.0.0.1:9/ep.mp3", 0)],
        )
        .await;

    assert_eq!(result.completed_count, 1);
    assert!(!result.had_errors);
}

#[tokio::test]
async fn test_episode_meta_is_written_and_archived() {
    let temp_dir = tempdir().unwrap();
    let server = MockServer::start().await;
    mount_ok(&server, "/ep.mp3", b"episode").await;

    let mut config = test_config(temp_dir.path());
    config.post_process.include_episode_meta = true;
    config.naming.episode_template = "{{podcast_title}}/{{title}}".into();
    let archive = Arc::new(MemoryArchive::new());
    let downloader = create_test_downloader(config, Some(archive.clone() as Arc<dyn ArchiveStore>));

    let mut item = episode("Ep", &url(&server, "/ep.mp3"), 0);
    item.description_text = Some("About the episode".into());

    let result = downloader.run_batch(&test_feed(1), vec![item]).await;

    assert_eq!(result.completed_count, 1);
    assert!(!result.had_errors);

    let meta_path: PathBuf = temp_dir.path().join("Test Show").join("Ep.meta.json");
    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&meta_path).unwrap()).unwrap();
    assert_eq!(json["title"], "Ep");
    assert_eq!(json["description_text"], "About the episode");

    assert!(archive.contains(&ArchiveKey::new("Ep.meta.json")).await.unwrap());
    assert!(archive.contains(&ArchiveKey::new("Ep.mp3")).await.unwrap());
}

#[tokio::test]
async fn test_batch_complete_event_carries_result() {
    let temp_dir = tempdir().unwrap();
    let downloader = create_test_downloader(test_config(temp_dir.path()), None);
    let mut events = downloader.subscribe();

    let result = downloader.run_batch(&test_feed(0), Vec::new()).await;
    assert_eq!(result, BatchResult::default());

    match events.try_recv().unwrap() {
        Event::BatchComplete { result: sent } => assert_eq!(sent, result),
        other => panic!("unexpected event: {other:?}"),
    }
}
