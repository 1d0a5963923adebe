//! Integration tests for archive creation

use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use triage_errors::{ArchiveError, Error};

fn entries(archive_path: &Path) -> BTreeMap<String, String> {
    let file = std::fs::File::open(archive_path).expect("open archive");
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut out = BTreeMap::new();
    for entry in archive.entries().expect("entries") {
        let mut entry = entry.expect("entry");
        let path = entry.path().expect("path").display().to_string();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).expect("read");
        out.insert(path, contents);
    }
    out
}

#[tokio::test]
async fn packages_the_tree_relative_to_its_parent() {
    let workdir = tempfile::tempdir().expect("workdir");
    let machine_dir = workdir.path().join("local");
    std::fs::create_dir_all(&machine_dir).expect("mkdir");
    std::fs::write(machine_dir.join("uname.txt"), "Linux\n").expect("write");
    std::fs::write(workdir.path().join("top.txt"), "top\n").expect("write");

    let out_dir = tempfile::tempdir().expect("out");
    let archive_path = out_dir.path().join("nested/dir/diag.tar.gz");
    triage_archive::create(workdir.path(), &archive_path)
        .await
        .expect("create");

    let name = workdir
        .path()
        .file_name()
        .expect("name")
        .to_string_lossy()
        .to_string();
    let entries = entries(&archive_path);
    assert_eq!(
        entries.get(&format!("{name}/local/uname.txt")).map(String::as_str),
        Some("Linux\n")
    );
    assert_eq!(
        entries.get(&format!("{name}/top.txt")).map(String::as_str),
        Some("top\n")
    );
}

#[tokio::test]
async fn relative_sources_are_rejected() {
    let err = triage_archive::create(Path::new("relative/dir"), Path::new("/tmp/x.tar.gz"))
        .await
        .expect_err("relative");
    assert!(matches!(
        err,
        Error::Archive(ArchiveError::NotAbsolute { .. })
    ));
}

#[tokio::test]
async fn missing_sources_are_rejected() {
    let err = triage_archive::create(
        Path::new("/no/such/source/dir"),
        Path::new("/tmp/x.tar.gz"),
    )
    .await
    .expect_err("missing");
    assert!(matches!(
        err,
        Error::Archive(ArchiveError::SourceMissing { .. })
    ));
}
