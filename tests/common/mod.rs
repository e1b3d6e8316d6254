//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns a temp directory with two source
//! images and a [`MockServer`] standing in for the provider API.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use tempfile::TempDir;
use wiremock::MockServer;

use vidstage::config::Config;
use vidstage_jobs::ProviderKind;

pub struct TestHarness {
    pub dir: TempDir,
    pub server: MockServer,
    pub before: PathBuf,
    pub after: PathBuf,
}

impl TestHarness {
    /// Start a mock server and write a landscape and a portrait source image.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let before = write_image(dir.path(), "before.png", 640, 480, [200, 40, 40]);
        let after = write_image(dir.path(), "after.png", 480, 640, [40, 40, 200]);
        Self {
            dir,
            server: MockServer::start().await,
            before,
            after,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Default config wired to the mock server with fast polling.
    pub fn config(&self, provider: ProviderKind) -> Config {
        let mut config = Config::default();
        config.generation.provider = provider;
        config.poll.interval_ms = 10;
        config.poll.timeout_secs = 5;

        config.openai.base_url = format!("{}/v1", self.server.uri());
        config.openai.api_key = Some("sk-test".into());

        config.veo.base_url = Some(self.server.uri());
        config.veo.storage_base_url = Some(format!("{}/storage", self.server.uri()));
        config.veo.project = Some("demo".into());
        config.veo.access_token = Some("ya29.test".into());
        config
    }
}

/// Write a solid-color PNG and return its path.
pub fn write_image(dir: &Path, name: &str, width: u32, height: u32, rgb: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb(rgb))
        .save(&path)
        .expect("failed to write test image");
    path
}
