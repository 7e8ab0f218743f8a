use std::fs::File;
use std::io::Write;

use attachment_codec::{decode, encode_path, EncodingError, MAX_ATTACHMENT_BYTES};

#[tokio::test]
async fn encode_path_names_attachment_after_the_file() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("snippet.json");
    let mut file = File::create(&path).expect("source file should be created");
    write!(file, "{{\"answer\": 42}}").expect("source should be written");

    let attachment = encode_path(&path)
        .await
        .expect("small files encode");

    assert_eq!(attachment.name(), "snippet.json");
    assert_eq!(attachment.mime_type(), "application/json");
    assert_eq!(
        decode(&attachment).expect("payload decodes"),
        b"{\"answer\": 42}".to_vec()
    );
}

#[tokio::test]
async fn encode_path_reports_unreadable_sources() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("missing.png");

    let error = encode_path(&path)
        .await
        .expect_err("missing file must fail");
    assert!(matches!(error, EncodingError::Io { .. }));
}

#[tokio::test]
async fn encode_path_rejects_files_over_the_ceiling_without_reading_them() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("video.mp4");
    let file = File::create(&path).expect("source file should be created");
    file.set_len(MAX_ATTACHMENT_BYTES + 1)
        .expect("sparse file should be sized");

    let error = encode_path(&path)
        .await
        .expect_err("oversized file must fail");
    assert!(matches!(
        error,
        EncodingError::TooLarge { ref name, size, .. }
            if name == "video.mp4" && size == MAX_ATTACHMENT_BYTES + 1
    ));
}

#[tokio::test]
async fn encode_path_accepts_files_exactly_at_the_ceiling() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("edge.bin");
    let file = File::create(&path).expect("source file should be created");
    file.set_len(MAX_ATTACHMENT_BYTES)
        .expect("sparse file should be sized");

    let attachment = encode_path(&path)
        .await
        .expect("file at the limit encodes");
    assert_eq!(
        decode(&attachment).expect("payload decodes").len() as u64,
        MAX_ATTACHMENT_BYTES
    );
}
