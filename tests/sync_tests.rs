//! End-to-end tests for copy, upload and download
//!
//! Local trees live in temporary directories; the remote side is an
//! in-memory bucket so every object and marker can be inspected.

mod common;

use common::*;
use dirsync::{DirSync, ObjectStoreFs, WriteOptions};
use object_bucket::{MemoryBucket, ObjectAttributes, ObjectBucket};
use rstest::rstest;
use std::time::Duration;
use tempfile::TempDir;

const TREE: &[(&str, &str)] = &[("a/x.txt", "hello from x"), ("a/b/y.txt", "and from y, a bit longer")];

fn memory_sync() -> DirSync<ObjectStoreFs<MemoryBucket>> {
    DirSync::with_bucket(settings(), MemoryBucket::new("test-bucket"))
}

#[compio::test]
async fn test_copy_reproduces_tree() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), TREE);
    let src = path_str(&temp_dir.path().join("a"));
    let dst = path_str(&temp_dir.path().join("c"));

    let stats = memory_sync().copy(&src, &dst).await.unwrap();

    assert_eq!(
        read_tree(&temp_dir.path().join("c")),
        vec![
            ("b/".to_string(), None),
            ("b/y.txt".to_string(), Some("and from y, a bit longer".to_string())),
            ("x.txt".to_string(), Some("hello from x".to_string())),
        ]
    );
    assert_eq!(stats.files_copied, 2);
    assert_eq!(stats.bytes_copied, 36);
    assert_eq!(stats.directories_created, 2);
    assert_eq!(stats.directories_existing, 0);
}

#[compio::test]
async fn test_copy_into_existing_tree_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), TREE);
    let src = path_str(&temp_dir.path().join("a"));
    let dst = path_str(&temp_dir.path().join("c"));
    let sync = memory_sync();

    sync.copy(&src, &dst).await.unwrap();
    let again = sync.copy(&src, &dst).await.unwrap();

    assert_eq!(again.directories_created, 0);
    assert_eq!(again.directories_existing, 2);
    assert_eq!(again.files_copied, 2);
    assert_eq!(read_tree(&temp_dir.path().join("c")).len(), 3);
}

#[compio::test]
async fn test_upload_then_download_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), TREE);
    let src = path_str(&temp_dir.path().join("a"));
    let out = temp_dir.path().join("out");
    let sync = memory_sync();

    let uploaded = sync.upload(&src, "site").await.unwrap();
    assert_eq!(uploaded.files_copied, 2);
    assert_eq!(
        sync.remote().bucket().keys(),
        vec!["site/", "site/b/", "site/b/y.txt", "site/x.txt"]
    );

    let downloaded = sync.download("site", &path_str(&out)).await.unwrap();
    assert_eq!(downloaded.files_copied, 2);
    assert_eq!(downloaded.directories_created, 2);
    assert_eq!(read_tree(&out), read_tree(&temp_dir.path().join("a")));
}

#[compio::test]
async fn test_upload_single_file_does_no_directory_work() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), &[("note.txt", "just one")]);
    let sync = memory_sync();

    let stats = sync
        .upload(&path_str(&temp_dir.path().join("note.txt")), "notes/n.txt")
        .await
        .unwrap();

    assert_eq!(stats.files_copied, 1);
    assert_eq!(stats.directories_created + stats.directories_existing, 0);
    assert_eq!(sync.remote().bucket().keys(), vec!["notes/n.txt"]);
    assert_eq!(sync.remote().bucket().put_count(), 1);
}

#[compio::test]
async fn test_download_missing_root_touches_nothing_locally() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");

    let err = memory_sync()
        .download("does/not/exist", &path_str(&out))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(!out.exists());
}

#[compio::test]
async fn test_write_options_land_on_objects() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(
        temp_dir.path(),
        &[("www/index.html", "<html/>"), ("www/app.js", "run()")],
    );
    let sync = memory_sync();

    let options = |path: &str| {
        let options = WriteOptions::default().with_cache_control("max-age=300");
        if path.ends_with(".html") {
            options.with_content_type("text/html")
        } else {
            options
        }
    };
    sync.upload_with(&path_str(&temp_dir.path().join("www")), "site", &options)
        .await
        .unwrap();

    let bucket = sync.remote().bucket();
    let html = bucket.head("site/index.html").await.unwrap().unwrap();
    assert_eq!(html.attributes.content_type.as_deref(), Some("text/html"));
    assert_eq!(html.attributes.cache_control.as_deref(), Some("max-age=300"));

    let js = bucket.head("site/app.js").await.unwrap().unwrap();
    assert_eq!(js.attributes.content_type, None);

    // Directory markers never carry file options
    let marker = bucket.head("site/").await.unwrap().unwrap();
    assert!(marker.attributes.is_empty());
}

#[compio::test]
async fn test_directory_created_before_its_files_are_written() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), TREE);
    let remote = RecordingCapability::new(ObjectStoreFs::new(
        MemoryBucket::new("test-bucket"),
        "us-east-1",
    ));
    let sync = DirSync::new(settings(), remote);

    sync.upload(&path_str(&temp_dir.path().join("a")), "site")
        .await
        .unwrap();

    let recorder = sync.remote();
    assert!(recorder.position("mkdir site/") < recorder.position("write site/x.txt"));
    assert!(recorder.position("mkdir site/") < recorder.position("mkdir site/b/"));
    assert!(recorder.position("mkdir site/b/") < recorder.position("write site/b/y.txt"));
    assert_eq!(recorder.count("mkdir "), 2);
    assert_eq!(recorder.count("write "), 2);
}

#[compio::test]
async fn test_second_upload_creates_no_markers() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), TREE);
    let src = path_str(&temp_dir.path().join("a"));
    let sync = memory_sync();

    sync.upload(&src, "site").await.unwrap();
    let puts = sync.remote().bucket().put_count();
    let stats = sync.upload(&src, "site").await.unwrap();

    // Only the two files are written again
    assert_eq!(sync.remote().bucket().put_count(), puts + 2);
    assert_eq!(stats.directories_created, 0);
    assert_eq!(stats.directories_existing, 2);
}

#[compio::test]
async fn test_upload_onto_file_is_conflict() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), TREE);
    let bucket = MemoryBucket::new("test-bucket");
    bucket
        .put("site", b"occupied".to_vec(), ObjectAttributes::default())
        .await
        .unwrap();
    let sync = DirSync::with_bucket(settings(), bucket);

    let err = sync
        .upload(&path_str(&temp_dir.path().join("a")), "site")
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(sync.remote().bucket().keys(), vec!["site"]);
}

#[compio::test]
async fn test_nested_conflict_fails_whole_copy() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), TREE);
    // A file where the copy needs the `b` directory
    write_tree(temp_dir.path(), &[("c/b", "in the way")]);

    let err = memory_sync()
        .copy(
            &path_str(&temp_dir.path().join("a")),
            &path_str(&temp_dir.path().join("c")),
        )
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert!(err.to_string().contains("already exists and is a file not a directory"));
}

#[compio::test]
async fn test_in_flight_bound_holds_on_wide_tree() {
    let _guard = test_timeout_guard(Duration::from_secs(30));
    let temp_dir = TempDir::new().unwrap();
    let names: Vec<String> = (0..40).map(|i| format!("wide/d{}/f{i}.txt", i % 4)).collect();
    let entries: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "payload")).collect();
    write_tree(temp_dir.path(), &entries);

    let sync = DirSync::with_bucket(settings_with_limit(2), MemoryBucket::new("test-bucket"));
    let stats = sync
        .upload(&path_str(&temp_dir.path().join("wide")), "wide")
        .await
        .unwrap();

    assert_eq!(stats.files_copied, 40);
    assert_eq!(stats.directories_created, 5);
    assert!(sync.limiter().peak() >= 1);
    assert!(sync.limiter().peak() <= 2);
    assert_eq!(sync.limiter().in_flight(), 0);
}

#[compio::test]
async fn test_limit_of_one_still_completes_deep_tree() {
    let _guard = test_timeout_guard(Duration::from_secs(30));
    let temp_dir = TempDir::new().unwrap();
    write_tree(
        temp_dir.path(),
        &[("deep/1/2/3/4/5/leaf.txt", "bottom"), ("deep/1/side.txt", "side")],
    );
    let sync = DirSync::with_bucket(settings_with_limit(1), MemoryBucket::new("test-bucket"));

    let stats = sync
        .copy(
            &path_str(&temp_dir.path().join("deep")),
            &path_str(&temp_dir.path().join("copy")),
        )
        .await
        .unwrap();

    assert_eq!(stats.files_copied, 2);
    assert_eq!(stats.directories_created, 6);
    assert_eq!(sync.limiter().peak(), 1);
}

/// `wide/d{i}/f{j}.txt` for `dirs` × `files`
fn write_wide_tree(root: &std::path::Path, dirs: usize, files: usize) {
    let names: Vec<String> = (0..dirs)
        .flat_map(|d| (0..files).map(move |f| format!("wide/d{d}/f{f}.txt")))
        .collect();
    let entries: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "payload")).collect();
    write_tree(root, &entries);
}

#[rstest]
#[case::limit_one(1)]
#[case::limit_two(2)]
#[compio::test]
async fn test_copy_wide_tree_under_small_bound(#[case] limit: usize) {
    let _guard = test_timeout_guard(Duration::from_secs(60));
    let temp_dir = TempDir::new().unwrap();
    write_wide_tree(temp_dir.path(), 40, 3);
    let sync = DirSync::with_bucket(settings_with_limit(limit), MemoryBucket::new("test-bucket"));

    let stats = sync
        .copy(
            &path_str(&temp_dir.path().join("wide")),
            &path_str(&temp_dir.path().join("copy")),
        )
        .await
        .unwrap();

    assert_eq!(stats.files_copied, 120);
    assert_eq!(stats.directories_created, 41);
    assert_eq!(read_tree(&temp_dir.path().join("copy")).len(), 160);
    assert!(sync.limiter().peak() <= limit);
    assert_eq!(sync.limiter().in_flight(), 0);
}

#[rstest]
#[case::limit_one(1)]
#[case::limit_two(2)]
#[compio::test]
async fn test_upload_wide_tree_under_small_bound(#[case] limit: usize) {
    let _guard = test_timeout_guard(Duration::from_secs(60));
    let temp_dir = TempDir::new().unwrap();
    write_wide_tree(temp_dir.path(), 40, 3);
    let sync = DirSync::with_bucket(settings_with_limit(limit), MemoryBucket::new("test-bucket"));

    let stats = sync
        .upload(&path_str(&temp_dir.path().join("wide")), "wide")
        .await
        .unwrap();

    assert_eq!(stats.files_copied, 120);
    assert_eq!(stats.directories_created, 41);
    // 120 objects plus the root and 40 directory markers
    assert_eq!(sync.remote().bucket().keys().len(), 161);
    assert!(sync.limiter().peak() <= limit);
}

#[compio::test]
async fn test_default_bound_handles_hundreds_of_siblings() {
    let _guard = test_timeout_guard(Duration::from_secs(60));
    let temp_dir = TempDir::new().unwrap();
    write_wide_tree(temp_dir.path(), 600, 2);

    let stats = memory_sync()
        .copy(
            &path_str(&temp_dir.path().join("wide")),
            &path_str(&temp_dir.path().join("copy")),
        )
        .await
        .unwrap();

    assert_eq!(stats.files_copied, 1200);
    assert_eq!(stats.directories_created, 601);
}

#[cfg(unix)]
#[compio::test]
async fn test_copy_fails_on_unreadable_entry_name() {
    use std::os::unix::ffi::OsStrExt;

    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), &[("src/ok.txt", "fine")]);
    let bad = std::ffi::OsStr::from_bytes(b"bad\xff.txt");
    std::fs::write(temp_dir.path().join("src").join(bad), "lost").unwrap();

    let err = memory_sync()
        .copy(
            &path_str(&temp_dir.path().join("src")),
            &path_str(&temp_dir.path().join("dst")),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("readdir"), "{err}");
    assert!(err.to_string().contains("InvalidData"), "{err}");
}
