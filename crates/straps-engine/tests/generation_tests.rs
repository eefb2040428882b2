//! Generation writer tests
//!
//! Exercise numbering and no-clobber writes against a real directory.

use std::fs;

use straps_artifact::DeclarationStore;
use straps_engine::{GenerationError, GenerationWriter};
use tempfile::TempDir;

const SOURCE: &str = "def add(a, b):\n    return a + b\n";

fn setup() -> (TempDir, GenerationWriter) {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("base.py");
    fs::write(&source, SOURCE).unwrap();
    let writer = GenerationWriter::for_source(&source).unwrap();
    (dir, writer)
}

#[test]
fn first_generation_is_one() {
    let (_dir, writer) = setup();
    assert_eq!(writer.next_number().unwrap(), 1);
}

#[test]
fn next_number_skips_gaps() {
    let (dir, writer) = setup();
    fs::write(dir.path().join("base__3.py"), "").unwrap();
    fs::write(dir.path().join("base__5.py"), "").unwrap();

    assert_eq!(writer.next_number().unwrap(), 6);
}

#[test]
fn malformed_suffixes_do_not_abort_the_scan() {
    let (dir, writer) = setup();
    fs::write(dir.path().join("base__draft.py"), "").unwrap();
    fs::write(dir.path().join("base__2.py"), "").unwrap();
    fs::write(dir.path().join("unrelated__9.py"), "").unwrap();

    assert_eq!(writer.next_number().unwrap(), 3);
}

#[test]
fn write_creates_new_file_and_keeps_source() {
    let (dir, writer) = setup();
    fs::write(dir.path().join("base__1.py"), "previous").unwrap();

    let mut store = DeclarationStore::parse(SOURCE).unwrap();
    store.remove_all("add");
    let generation = writer.write(&store).unwrap();

    assert_eq!(generation.number, 2);
    assert_eq!(generation.path, dir.path().join("base__2.py"));
    assert_eq!(generation.fingerprint, store.fingerprint());
    assert_eq!(fs::read_to_string(&generation.path).unwrap(), store.serialize());
    assert_eq!(fs::read_to_string(dir.path().join("base__1.py")).unwrap(), "previous");
    assert_eq!(fs::read_to_string(dir.path().join("base.py")).unwrap(), SOURCE);
}

#[test]
fn consecutive_writes_are_append_only() {
    let (dir, writer) = setup();
    let store = DeclarationStore::parse(SOURCE).unwrap();

    let first = writer.write(&store).unwrap();
    let second = writer.write(&store).unwrap();

    assert_eq!((first.number, second.number), (1, 2));
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(".straps-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn output_dir_override() {
    let (_dir, writer) = setup();
    let out = tempfile::tempdir().unwrap();
    let writer = writer.with_output_dir(out.path().join("generations"));

    let store = DeclarationStore::parse(SOURCE).unwrap();
    let generation = writer.write(&store).unwrap();

    assert_eq!(generation.path, out.path().join("generations").join("base__1.py"));
}

#[test]
fn largest_generation_number_is_an_error_not_a_wrap() {
    let (dir, writer) = setup();
    fs::write(dir.path().join(format!("base__{}.py", u64::MAX)), "").unwrap();

    let err = writer.next_number().unwrap_err();
    assert!(matches!(err, GenerationError::NumberOverflow(_)));

    let store = DeclarationStore::parse(SOURCE).unwrap();
    assert!(matches!(
        writer.write(&store),
        Err(GenerationError::NumberOverflow(_))
    ));
    assert!(!dir.path().join("base__0.py").exists());
    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2, "{names:?}");
}
