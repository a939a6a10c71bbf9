//! Integration tests for NoCloud seed directories using tempfile

use std::fs;
use std::io::Write;

use cloud_init_fixture::fixtures::{UBUNTU_USER_DATA, ubuntu};
use cloud_init_fixture::{FixtureError, Seed};
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

fn seed_dir(user_data: &[u8]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("user-data"), user_data).unwrap();
    fs::write(
        temp_dir.path().join("meta-data"),
        "instance-id: cloud\nlocal-hostname: cloud\n",
    )
    .unwrap();
    temp_dir
}

/// Test a seed carrying the bundled fixture
#[tokio::test]
async fn test_seed_with_fixture() {
    let temp_dir = seed_dir(UBUNTU_USER_DATA.as_bytes());

    let seed = Seed::read(temp_dir.path()).await.unwrap();
    assert_eq!(seed.metadata().instance_id.as_deref(), Some("cloud"));
    assert_eq!(seed.metadata().local_hostname.as_deref(), Some("cloud"));
    assert!(seed.network_config().is_none());
    assert_eq!(seed.dir(), temp_dir.path());
    assert_eq!(seed.user_data(), UBUNTU_USER_DATA.as_bytes());

    let doc = seed.document().unwrap();
    assert_eq!(doc, ubuntu().unwrap());
}

/// Test a seed with gzip compressed user-data and a network-config
#[tokio::test]
async fn test_seed_gzip_and_network_config() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(UBUNTU_USER_DATA.as_bytes()).unwrap();
    let temp_dir = seed_dir(&encoder.finish().unwrap());

    let network_config = "version: 2\nethernets:\n  id0:\n    match:\n      macaddress: 12:34:56:78:90:ab\n";
    fs::write(temp_dir.path().join("network-config"), network_config).unwrap();

    let seed = Seed::read(temp_dir.path()).await.unwrap();
    assert_eq!(seed.network_config(), Some(network_config));
    assert_eq!(seed.document().unwrap().write_files().len(), 4);
}

/// Test that a seed without meta-data is rejected
#[tokio::test]
async fn test_seed_missing_metadata() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("user-data"), UBUNTU_USER_DATA).unwrap();

    let err = Seed::read(temp_dir.path()).await.unwrap_err();
    match err {
        FixtureError::Io { path, .. } => assert!(path.ends_with("meta-data")),
        other => panic!("Expected Io, got {other:?}"),
    }
}

/// Test a seed whose user-data is a script rather than a cloud-config
#[tokio::test]
async fn test_seed_script_userdata() {
    let temp_dir = seed_dir(b"#!/bin/bash\necho hello\n");

    let seed = Seed::read(temp_dir.path()).await.unwrap();
    assert!(matches!(
        seed.document(),
        Err(FixtureError::NotCloudConfig(_))
    ));
}

/// Reading a seed leaves the directory untouched
#[tokio::test]
async fn test_seed_read_only() {
    let temp_dir = seed_dir(UBUNTU_USER_DATA.as_bytes());
    let before: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();

    let seed = Seed::read(temp_dir.path()).await.unwrap();
    seed.document().unwrap();

    let after: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(before.len(), after.len());
    assert_eq!(fs::read_to_string(temp_dir.path().join("user-data")).unwrap(), UBUNTU_USER_DATA);
}
