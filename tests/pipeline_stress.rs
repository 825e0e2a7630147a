//! Concurrency stress tests: many users pushing uploads through the pipeline
//! at once, with simulated network delay, must not lose counter updates or
//! over-admit past the rate limit.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use imgrelay::limiter::RateLimiter;
use imgrelay::pipeline::{
    FileSource, HostError, HostedImage, ImageHost, NoProgress, RemoteFile, UploadPipeline,
    UploadRequest,
};
use imgrelay::stats::ServiceStats;

struct SlowSource;

#[async_trait]
impl FileSource for SlowSource {
    async fn resolve(&self, _file_id: &str) -> anyhow::Result<RemoteFile> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(RemoteFile {
            path: "photos/file_0.jpg".into(),
            size: 1024,
        })
    }

    async fn fetch(&self, file: &RemoteFile) -> anyhow::Result<Bytes> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(Bytes::from(vec![0u8; file.size as usize]))
    }
}

struct SlowHost;

#[async_trait]
impl ImageHost for SlowHost {
    async fn upload(&self, _image: Bytes, _content_type: &str) -> Result<HostedImage, HostError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(HostedImage {
            url: "https://i.ibb.co/x/a.jpg".into(),
            delete_url: "https://ibb.co/x/del".into(),
            title: None,
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_users_all_count() {
    const USERS: u64 = 32;

    let stats = Arc::new(ServiceStats::new());
    let pipeline = Arc::new(UploadPipeline::new(
        Arc::new(RateLimiter::default()),
        stats.clone(),
        10 * 1024 * 1024,
    ));

    let tasks: Vec<_> = (0..USERS)
        .map(|user_id| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .process(
                        &SlowSource,
                        &SlowHost,
                        &NoProgress,
                        UploadRequest {
                            user_id,
                            file_id: format!("file-{user_id}"),
                            declared_size: 1024,
                        },
                    )
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }
    assert_eq!(stats.uploads_processed(), USERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_user_is_capped_at_the_limit() {
    const ATTEMPTS: usize = 40;
    const LIMIT: usize = 10;

    let stats = Arc::new(ServiceStats::new());
    let pipeline = Arc::new(UploadPipeline::new(
        Arc::new(RateLimiter::new(LIMIT, Duration::from_secs(60))),
        stats.clone(),
        10 * 1024 * 1024,
    ));

    let tasks: Vec<_> = (0..ATTEMPTS)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .process(
                        &SlowSource,
                        &SlowHost,
                        &NoProgress,
                        UploadRequest {
                            user_id: 7,
                            file_id: format!("file-{i}"),
                            declared_size: 1024,
                        },
                    )
                    .await
            })
        })
        .collect();

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, LIMIT);
    assert_eq!(stats.uploads_processed(), LIMIT as u64);
}
