//! End-to-end scenarios over on-disk logs.

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use caskade_index::{
    optional_registry, CaskadeBuilder, CaskadeConfig, CaskadeError, CaskadeView, RecordHandler,
    SyncMapping, Tag, ViewState, TAG,
};
use caskade_log::{FileLog, LogConfig, LogError, LogRecord, MemoryLog, OpenLog, RecordLog};
use caskade_registry::{EntryCode, EntryKind, PayloadShape, RegistrationError, ShapeError};
use caskade_types::ContentId;
use tempfile::TempDir;

const NOTE: EntryKind = EntryKind::new(40, "NOTE", PayloadShape::Bytes, "Free-form note.");

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn id(name: &str) -> ContentId {
    ContentId::from_bytes(name.as_bytes())
}

fn log_path(dir: &TempDir) -> PathBuf {
    dir.path().join("store.cask")
}

fn open_writable(path: &Path) -> CaskadeView {
    CaskadeView::open(path, &CaskadeConfig::writable()).unwrap()
}

fn open_read_only(path: &Path) -> Result<CaskadeView, CaskadeError> {
    CaskadeView::open(path, &CaskadeConfig::read_only())
}

#[test]
fn tag_and_overwrite_derived_survive_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let (a, f, d1, d2) = (id("A"), id("F"), id("D1"), id("D2"));
    let size = Tag::new("size").with_value(42.0);

    let mut view = open_writable(&path);
    view.tag(a, &size).unwrap();
    view.save_derived(a, f, d1).unwrap();
    view.save_derived(a, f, d2).unwrap();
    assert_eq!(view.tags(&a), &[size.clone()][..]);
    assert_eq!(view.derived(&a, &f), Some(d2));
    let live = view.snapshot();
    view.close().unwrap();

    let view = open_read_only(&path).unwrap();
    assert_eq!(view.state(), ViewState::ReadOnly);
    assert_eq!(view.tags(&a), &[size][..]);
    assert_eq!(view.derived(&a, &f), Some(d2));
    assert_eq!(view.snapshot(), live);

    let stats = view.replay_stats();
    assert_eq!(stats.records, 4);
    assert_eq!(stats.handled, 3);
    assert_eq!(stats.unclaimed, 1);
}

#[test]
fn empty_log_replays_to_empty_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    open_writable(&path).close().unwrap();

    let view = open_read_only(&path).unwrap();
    assert!(view.index().is_empty());
    assert!(view.sync().is_empty());
    assert_eq!(view.replay_stats().records, 1);
}

#[test]
fn missing_log_cannot_be_opened_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let err = open_read_only(&log_path(&dir)).err().unwrap();
    assert!(matches!(err, CaskadeError::Log(LogError::NotFound(_))));
}

#[test]
fn truncated_log_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let mut view = open_writable(&path);
    view.tag(id("A"), &Tag::new("first")).unwrap();
    view.tag(id("A"), &Tag::new("second")).unwrap();
    view.close().unwrap();

    let len = fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - 3).unwrap();

    let err = open_read_only(&path).err().unwrap();
    assert!(matches!(err, CaskadeError::CorruptLog { .. }), "{err}");
}

#[test]
fn flipped_byte_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let mut view = open_writable(&path);
    view.tag(id("A"), &Tag::new("only")).unwrap();
    view.close().unwrap();

    let len = fs::metadata(&path).unwrap().len();
    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(len - 2)).unwrap();
    file.write_all(b"#").unwrap();
    drop(file);

    match open_read_only(&path) {
        Err(CaskadeError::CorruptLog { position, reason }) => {
            assert_eq!(position.seq(), 1);
            assert!(reason.contains("CRC"), "{reason}");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("corrupt log must not open"),
    }
}

#[test]
fn malformed_tag_payload_fails_construction() {
    let registry = optional_registry().unwrap();
    let records = vec![
        LogRecord::new(TAG.code(), id("A"), br#"{"name":"ok"}"#.to_vec()),
        LogRecord::new(TAG.code(), id("A"), br#"{"value":1.0}"#.to_vec()),
    ];
    let log = MemoryLog::from_records(registry, id("log"), records);

    let err = CaskadeView::from_log(log).err().unwrap();
    assert!(matches!(
        err,
        CaskadeError::CorruptLog { position, .. } if position.seq() == 1
    ));
}

#[test]
fn unregistered_code_fails_construction() {
    let registry = optional_registry().unwrap();
    let records = vec![LogRecord::new(EntryCode::new(99), id("A"), Vec::new())];
    let log = MemoryLog::from_records(registry, id("log"), records);
    assert!(matches!(
        CaskadeView::from_log(log).err().unwrap(),
        CaskadeError::CorruptLog { .. }
    ));
}

#[test]
fn read_only_view_rejects_writes_and_keeps_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let mut view = open_writable(&path);
    view.tag(id("A"), &Tag::new("kept")).unwrap();
    view.close().unwrap();

    let mut view = open_read_only(&path).unwrap();
    let before = view.snapshot();
    let err = view.save_derived(id("A"), id("F"), id("D")).unwrap_err();
    assert!(matches!(
        err,
        CaskadeError::WriteState {
            state: ViewState::ReadOnly
        }
    ));
    assert_eq!(err.to_string(), "view is read-only; writes need a writable view");
    assert_eq!(view.snapshot(), before);
}

#[test]
fn failed_append_is_not_indexed() {
    let mut log = MemoryLog::new(optional_registry().unwrap()).unwrap();
    log.fail_next_append();
    let mut view = CaskadeView::from_log(log).unwrap();

    let err = view.tag(id("A"), &Tag::new("lost")).unwrap_err();
    assert!(matches!(err, CaskadeError::Log(LogError::Io(_))));
    assert!(view.tags(&id("A")).is_empty());
    assert_eq!(view.log().len(), 1);
}

#[test]
fn sync_and_tracking_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let (store, remote, mirror) = (id("store"), id("remote"), id("mirror"));

    let both = SyncMapping::new().with(remote, id("m1")).with(mirror, id("m1"));
    let newer = SyncMapping::new().with(remote, id("m2"));
    let seen = SyncMapping::new().with(mirror, id("m1"));

    let mut view = open_writable(&path);
    view.set_sync_point(store, &both).unwrap();
    view.set_sync_point(store, &newer).unwrap();
    view.track(store, &seen).unwrap();
    view.close().unwrap();

    let view = open_read_only(&path).unwrap();
    assert_eq!(view.sync_marker(&store, &remote), Some(id("m2")));
    assert_eq!(view.sync_marker(&store, &mirror), Some(id("m1")));
    assert_eq!(view.trackers(&store).unwrap()[&mirror], id("m1"));
    assert!(view.index().is_empty());
}

struct NoteCollector {
    notes: Arc<Mutex<Vec<(ContentId, Vec<u8>)>>>,
}

impl RecordHandler for NoteCollector {
    fn name(&self) -> &str {
        "notes"
    }

    fn check(&self, _record: &LogRecord) -> Result<(), ShapeError> {
        Ok(())
    }

    fn apply(&mut self, record: &LogRecord) -> Result<bool, ShapeError> {
        if record.kind != NOTE.code() {
            return Ok(false);
        }
        self.notes
            .lock()
            .unwrap()
            .push((record.subject, record.payload.clone()));
        Ok(true)
    }
}

#[test]
fn custom_kind_reaches_custom_handler() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);

    let live = Arc::new(Mutex::new(Vec::new()));
    let mut view = CaskadeBuilder::new()
        .with_kinds([NOTE])
        .with_handler(NoteCollector {
            notes: Arc::clone(&live),
        })
        .open(&path, &CaskadeConfig::writable())
        .unwrap();
    assert_eq!(view.handler_names(), vec!["index", "sync", "notes"]);
    view.append(&NOTE, id("A"), b"remember".to_vec()).unwrap();
    view.tag(id("A"), &Tag::new("t")).unwrap();
    view.close().unwrap();
    assert_eq!(live.lock().unwrap().len(), 1);

    let replayed = Arc::new(Mutex::new(Vec::new()));
    let view = CaskadeBuilder::new()
        .with_kinds([NOTE])
        .with_handler(NoteCollector {
            notes: Arc::clone(&replayed),
        })
        .open(&path, &CaskadeConfig::read_only())
        .unwrap();
    assert_eq!(*replayed.lock().unwrap(), *live.lock().unwrap());
    assert_eq!(view.tags(&id("A")).len(), 1);
    assert_eq!(view.replay_stats().handled, 2);
}

#[test]
fn log_with_unknown_kinds_is_rejected_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    CaskadeBuilder::new()
        .with_kinds([NOTE])
        .open(&path, &CaskadeConfig::writable())
        .unwrap()
        .close()
        .unwrap();

    let err = open_read_only(&path).err().unwrap();
    assert!(matches!(
        err,
        CaskadeError::Registration(RegistrationError::UnknownCode(code)) if code == NOTE.code()
    ));

    let renamed = EntryKind::new(40, "MEMO", PayloadShape::Bytes, "Free-form note.");
    let err = CaskadeBuilder::new()
        .with_kinds([renamed])
        .open(&path, &CaskadeConfig::read_only())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        CaskadeError::Registration(RegistrationError::CatalogMismatch { .. })
    ));
}

#[test]
fn into_writable_keeps_index_and_catches_up() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let mut writer = open_writable(&path);
    writer.tag(id("A"), &Tag::new("one")).unwrap();
    writer.close().unwrap();

    let reader = open_read_only(&path).unwrap();
    assert_eq!(reader.tags(&id("A")).len(), 1);

    // Another writer appends while the reader is open.
    let mut other = open_writable(&path);
    other.tag(id("A"), &Tag::new("two")).unwrap();
    other.close().unwrap();

    let mut view = reader.into_writable().unwrap();
    assert_eq!(view.state(), ViewState::Writable);
    let names: Vec<_> = view.tags(&id("A")).iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);

    view.tag(id("A"), &Tag::new("three")).unwrap();
    let live = view.snapshot();
    view.close().unwrap();

    assert_eq!(open_read_only(&path).unwrap().snapshot(), live);
}

#[test]
fn non_finite_tag_value_is_rejected_before_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let mut view = open_writable(&path);
    view.tag(id("A"), &Tag::new("ok").with_value(1.5)).unwrap();

    for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = view.tag(id("A"), &Tag::new("bad").with_value(value)).unwrap_err();
        assert!(matches!(err, CaskadeError::Shape(ShapeError::Encode { .. })), "{err}");
    }
    assert_eq!(view.log().len(), 2);
    assert_eq!(view.tags(&id("A")).len(), 1);
    let live = view.snapshot();
    view.close().unwrap();

    assert_eq!(open_read_only(&path).unwrap().snapshot(), live);
}

#[test]
fn undecodable_raw_tag_is_never_logged() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let mut view = open_writable(&path);

    let err = view.append(&TAG, id("A"), br#"{"value":1.0}"#.to_vec()).unwrap_err();
    assert!(matches!(err, CaskadeError::Shape(ShapeError::Decode { .. })), "{err}");
    assert_eq!(view.log().len(), 1);
    view.tag(id("A"), &Tag::new("after")).unwrap();
    view.close().unwrap();

    let view = open_read_only(&path).unwrap();
    assert_eq!(view.tags(&id("A")), &[Tag::new("after")][..]);
}

/// Accepts NOTE records only when they carry text.
struct NonEmptyNotes;

impl NonEmptyNotes {
    fn require_text(record: &LogRecord) -> Result<(), ShapeError> {
        if record.kind == NOTE.code() && record.payload.is_empty() {
            return Err(ShapeError::Decode {
                type_name: "Note",
                reason: "empty note".into(),
            });
        }
        Ok(())
    }
}

impl RecordHandler for NonEmptyNotes {
    fn name(&self) -> &str {
        "non-empty-notes"
    }

    fn check(&self, record: &LogRecord) -> Result<(), ShapeError> {
        Self::require_text(record)
    }

    fn apply(&mut self, record: &LogRecord) -> Result<bool, ShapeError> {
        Self::require_text(record)?;
        Ok(record.kind == NOTE.code())
    }
}

fn open_with_note_rules(path: &Path, config: &CaskadeConfig) -> Result<CaskadeView, CaskadeError> {
    CaskadeBuilder::new()
        .with_kinds([NOTE])
        .with_handler(NonEmptyNotes)
        .open(path, config)
}

#[test]
fn record_refused_by_custom_handler_keeps_log_openable() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);

    let mut view = open_with_note_rules(&path, &CaskadeConfig::writable()).unwrap();
    view.append(&NOTE, id("A"), b"first".to_vec()).unwrap();
    let err = view.append(&NOTE, id("A"), Vec::new()).unwrap_err();
    assert!(matches!(err, CaskadeError::Shape(_)), "{err}");
    assert_eq!(view.log().len(), 2);
    view.append(&NOTE, id("A"), b"second".to_vec()).unwrap();
    view.close().unwrap();

    let view = open_with_note_rules(&path, &CaskadeConfig::read_only()).unwrap();
    assert_eq!(view.replay_stats().records, 3);
    assert_eq!(view.replay_stats().handled, 2);
}

#[test]
fn into_writable_from_attached_log_replays_only_new_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let mut writer = open_writable(&path);
    writer.tag(id("A"), &Tag::new("one")).unwrap();
    writer.close().unwrap();

    let registry = optional_registry().unwrap();
    let log = FileLog::open_or_create(&path, &registry, &LogConfig::read_only()).unwrap();
    let reader = CaskadeView::from_log(log).unwrap();
    assert_eq!(reader.tags(&id("A")).len(), 1);

    let mut other = open_writable(&path);
    other.tag(id("A"), &Tag::new("two")).unwrap();
    other.close().unwrap();

    let view = reader.into_writable().unwrap();
    let names: Vec<_> = view.tags(&id("A")).iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);
    let live = view.snapshot();
    view.close().unwrap();
    assert_eq!(open_read_only(&path).unwrap().snapshot(), live);
}
