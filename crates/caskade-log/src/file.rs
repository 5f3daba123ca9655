use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use caskade_registry::{base, Catalog, EntryCode, EntryRegistry, ValueRecord};
use caskade_types::{ContentHasher, ContentId};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{LogConfig, SyncMode};
use crate::error::{LogError, LogResult};
use crate::record::{LogRecord, RecordPosition};
use crate::traits::{OpenLog, RecordLog, Replay};

/// Frame header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: u64 = 8;

struct LogWriter {
    writer: BufWriter<File>,
    /// End of the last complete frame in the segment file.
    offset: u64,
    #[cfg(test)]
    fail_at: Option<FailPoint>,
}

impl LogWriter {
    fn new(file: File, offset: u64) -> Self {
        Self {
            writer: BufWriter::new(file),
            offset,
            #[cfg(test)]
            fail_at: None,
        }
    }

    fn write_frame(
        &mut self,
        length: u32,
        crc: u32,
        body: &[u8],
        sync: SyncMode,
    ) -> io::Result<()> {
        self.writer.write_all(&length.to_le_bytes())?;
        self.writer.write_all(&crc.to_le_bytes())?;
        #[cfg(test)]
        self.inject(FailPoint::Body)?;
        self.writer.write_all(body)?;
        self.writer.flush()?;
        if matches!(sync, SyncMode::EveryWrite) {
            #[cfg(test)]
            self.inject(FailPoint::Sync)?;
            self.writer.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Drop any buffered bytes and cut the file back to the last complete frame.
    fn rollback(self) -> io::Result<Self> {
        let offset = self.offset;
        let (file, _unwritten) = self.writer.into_parts();
        file.set_len(offset)?;
        Ok(Self::new(file, offset))
    }

    #[cfg(test)]
    fn inject(&mut self, point: FailPoint) -> io::Result<()> {
        if self.fail_at == Some(point) {
            self.fail_at = None;
            return Err(io::Error::other(format!("injected {point:?} failure")));
        }
        Ok(())
    }
}

#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FailPoint {
    /// After the frame header has been buffered.
    Body,
    /// After the frame reached the OS, before `fsync`.
    Sync,
}

/// Single-segment file log.
///
/// On-disk format, one frame per record:
/// ```text
/// [4 bytes: body length (little-endian u32)]
/// [4 bytes: CRC32 of body (little-endian u32)]
/// [N bytes: body (bincode-serialized LogRecord)]
/// ```
///
/// The first record is always a `CASK_HEADER` whose subject is the log id and
/// whose payload is the catalog of the registry the log was created with.
/// Unlike a crash-tolerant WAL, replay never skips a bad frame: a checksum
/// mismatch or a torn tail ends the replay with [`LogError::Corrupt`].
pub struct FileLog {
    path: PathBuf,
    registry: EntryRegistry,
    config: LogConfig,
    log_id: ContentId,
    /// `None` when opened read-only.
    writer: Option<LogWriter>,
    records: u64,
}

impl FileLog {
    fn create(path: &Path, registry: &EntryRegistry, config: &LogConfig) -> LogResult<Self> {
        if !config.access.is_writable() {
            return Err(LogError::NotFound(path.to_path_buf()));
        }
        registry.require(base::CASK_HEADER.code())?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create_new(true).append(true).open(path)?;

        let log_id = ContentHasher::LOG.hash(Uuid::now_v7().as_bytes());
        let mut log = Self {
            path: path.to_path_buf(),
            registry: registry.clone(),
            config: config.clone(),
            log_id,
            writer: Some(LogWriter::new(file, 0)),
            records: 0,
        };
        let catalog = registry.catalog().encode()?;
        log.append(base::CASK_HEADER.code(), log_id, &catalog)?;

        info!(path = %path.display(), log_id = %log_id.short_hex(), "created log");
        Ok(log)
    }

    fn open_existing(
        path: &Path,
        registry: &EntryRegistry,
        config: &LogConfig,
    ) -> LogResult<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut frames = FrameReader::new(file, file_len, registry);

        let header_position = RecordPosition::new(0);
        let (_, header) = frames
            .next()
            .transpose()?
            .ok_or_else(|| LogError::corrupt(header_position, "missing segment header"))?;
        if header.kind != base::CASK_HEADER.code() {
            return Err(LogError::corrupt(
                header_position,
                format!("first record has code {}, expected segment header", header.kind),
            ));
        }
        let catalog = Catalog::decode(&header.payload)
            .map_err(|e| LogError::corrupt(header_position, e.to_string()))?;
        registry.check_catalog(&catalog)?;

        let records = 1 + frames.skip_rest()?;

        let writer = if config.access.is_writable() {
            let file = OpenOptions::new().append(true).open(path)?;
            Some(LogWriter::new(file, file_len))
        } else {
            None
        };

        info!(
            path = %path.display(),
            log_id = %header.subject.short_hex(),
            records,
            writable = writer.is_some(),
            "opened log"
        );
        Ok(Self {
            path: path.to_path_buf(),
            registry: registry.clone(),
            config: config.clone(),
            log_id: header.subject,
            writer,
            records,
        })
    }

    /// Undo a frame that failed partway so it can never become durable.
    ///
    /// If the file cannot be cut back, the writer is dropped and the log is
    /// read-only from then on.
    fn discard_partial_frame(&mut self) {
        let Some(w) = self.writer.take() else {
            return;
        };
        let offset = w.offset;
        match w.rollback() {
            Ok(w) => self.writer = Some(w),
            Err(e) => warn!(
                path = %self.path.display(),
                offset,
                error = %e,
                "cannot truncate partial frame; log is now read-only"
            ),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Current end of the segment file, if writable.
    pub fn offset(&self) -> Option<u64> {
        self.writer.as_ref().map(|w| w.offset)
    }
}

impl OpenLog for FileLog {
    fn open_or_create(
        path: &Path,
        registry: &EntryRegistry,
        config: &LogConfig,
    ) -> LogResult<Self> {
        if path.exists() {
            Self::open_existing(path, registry, config)
        } else {
            Self::create(path, registry, config)
        }
    }
}

impl RecordLog for FileLog {
    fn append(
        &mut self,
        kind: EntryCode,
        subject: ContentId,
        payload: &[u8],
    ) -> LogResult<RecordPosition> {
        let entry_kind = self.registry.require(kind)?;
        entry_kind.shape().validate(payload)?;
        let w = self.writer.as_mut().ok_or(LogError::ReadOnly)?;

        let record = LogRecord::new(kind, subject, payload);
        let body =
            bincode::serialize(&record).map_err(|e| LogError::Serialization(e.to_string()))?;
        let length = u32::try_from(body.len())
            .map_err(|_| LogError::Serialization(format!("record of {} bytes", body.len())))?;
        let crc = crc32fast::hash(&body);

        if let Err(e) = w.write_frame(length, crc, &body, self.config.sync_mode) {
            self.discard_partial_frame();
            return Err(e.into());
        }

        let offset = w.offset;
        w.offset += HEADER_SIZE + u64::from(length);
        let position = RecordPosition::new(self.records);
        self.records += 1;

        debug!(%position, offset, kind = entry_kind.name(), len = body.len(), "log append");
        Ok(position)
    }

    fn replay(&self) -> LogResult<Replay<'_>> {
        let file = File::open(&self.path)?;
        let file_len = file.metadata()?.len();
        Ok(Box::new(FrameReader::new(file, file_len, &self.registry)))
    }

    fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    fn flush(&mut self) -> LogResult<()> {
        if let Some(w) = self.writer.as_mut() {
            w.writer.flush()?;
            w.writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn len(&self) -> u64 {
        self.records
    }

    fn log_id(&self) -> ContentId {
        self.log_id
    }

    fn registry(&self) -> &EntryRegistry {
        &self.registry
    }
}

/// Sequential frame decoder over a segment file.
struct FrameReader<'a> {
    reader: BufReader<File>,
    registry: &'a EntryRegistry,
    file_len: u64,
    offset: u64,
    position: u64,
    done: bool,
}

impl<'a> FrameReader<'a> {
    fn new(file: File, file_len: u64, registry: &'a EntryRegistry) -> Self {
        Self {
            reader: BufReader::new(file),
            registry,
            file_len,
            offset: 0,
            position: 0,
            done: false,
        }
    }

    fn corrupt(&self, reason: impl std::fmt::Display) -> LogError {
        LogError::corrupt(
            RecordPosition::new(self.position),
            format!("at byte {}: {reason}", self.offset),
        )
    }

    /// Read one frame header and return the body length.
    fn read_header(&mut self) -> LogResult<(u32, u32)> {
        if self.offset + HEADER_SIZE > self.file_len {
            return Err(self.corrupt("truncated frame header"));
        }
        let mut header = [0u8; HEADER_SIZE as usize];
        self.reader.read_exact(&mut header)?;
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || self.offset + HEADER_SIZE + u64::from(length) > self.file_len {
            return Err(self.corrupt(format!("frame length {length} runs past end of log")));
        }
        Ok((length, crc))
    }

    fn read_frame(&mut self) -> LogResult<LogRecord> {
        let (length, expected_crc) = self.read_header()?;

        let mut body = vec![0u8; length as usize];
        match self.reader.read_exact(&mut body) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(self.corrupt("truncated frame body"));
            }
            Err(e) => return Err(e.into()),
        }

        let actual_crc = crc32fast::hash(&body);
        if actual_crc != expected_crc {
            return Err(self.corrupt(format!(
                "CRC mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"
            )));
        }

        let record: LogRecord = bincode::deserialize(&body)
            .map_err(|e| self.corrupt(format!("undecodable record: {e}")))?;
        let kind = self
            .registry
            .get(record.kind)
            .ok_or_else(|| self.corrupt(format!("unregistered entry code {}", record.kind)))?;
        kind.shape()
            .validate(&record.payload)
            .map_err(|e| self.corrupt(format!("{kind}: {e}")))?;

        self.offset += HEADER_SIZE + u64::from(length);
        Ok(record)
    }

    /// Hop over the remaining frames without decoding them, checking only
    /// that the framing is intact. Returns the number of frames skipped.
    fn skip_rest(mut self) -> LogResult<u64> {
        let mut skipped = 0;
        while self.offset < self.file_len {
            let (length, _) = self.read_header()?;
            self.reader.seek_relative(i64::from(length))?;
            self.offset += HEADER_SIZE + u64::from(length);
            self.position += 1;
            skipped += 1;
        }
        Ok(skipped)
    }
}

impl Iterator for FrameReader<'_> {
    type Item = LogResult<(RecordPosition, LogRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.file_len {
            return None;
        }
        let position = RecordPosition::new(self.position);
        match self.read_frame() {
            Ok(record) => {
                self.position += 1;
                Some(Ok((position, record)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
