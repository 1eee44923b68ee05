use cfgtool_store::io::{self, DirLock};
use std::fs;
use tempfile::TempDir;

#[test]
fn write_atomic_creates_parents_and_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested/dir/config.json");

    io::write_atomic(&path, b"{}").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn write_atomic_overwrites_and_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, "original").unwrap();

    io::write_atomic(&path, b"updated").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "updated");
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn read_text_missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let result = io::read_text(&temp.path().join("missing.json"));
    assert!(matches!(result, Err(cfgtool_store::Error::Io { .. })));
}

#[test]
fn dir_lock_can_be_reacquired_after_drop() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join(".lock");
    {
        let _lock = DirLock::acquire(&lock_path).unwrap();
    }
    let _again = DirLock::acquire(&lock_path).unwrap();
}
