use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tmbft_types::Height;

use crate::error::{Result, WalError};

/// On-disk record framing: `[length: u32][crc32: u32][data]`, per §4.G/§6.
/// The length-prefix lets a truncated final record (a crash mid-write) be
/// detected and dropped on the next open rather than corrupting the entries
/// after it.
const LENGTH_FIELD_SIZE: u64 = 4;
const CRC_FIELD_SIZE: u64 = 4;

/// Per-height append-only log of outgoing broadcast payloads, per §4.G.
///
/// One `Wal` instance owns the currently open height's file; switching
/// heights closes the old file (the driver decides whether to delete it, via
/// [`Wal::commit`]) and opens or creates the new one.
#[derive(Debug)]
pub struct Wal {
    dir: PathBuf,
    height: Option<Height>,
    file: Option<File>,
}

impl Wal {
    /// Opens (creating if necessary) the WAL directory. Does not open any
    /// per-height file yet; call [`Wal::open_height`] for that.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            height: None,
            file: None,
        })
    }

    fn path_for(&self, height: Height) -> PathBuf {
        self.dir.join(height.as_u64().to_string())
    }

    /// Opens the file for `height`, creating it if absent. If a file already
    /// exists (e.g. from an unclean shutdown), its valid entries are
    /// returned for replay by the liveness watchdog; a trailing partial
    /// record is silently truncated.
    pub fn open_height(&mut self, height: Height) -> Result<Vec<Vec<u8>>> {
        let path = self.path_for(height);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let entries = read_valid_entries(&mut file)?;
        file.seek(SeekFrom::End(0))?;

        self.height = Some(height);
        self.file = Some(file);
        Ok(entries)
    }

    /// Appends `payload` to the currently open height's file.
    pub fn append(&mut self, payload: &[u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(no_open_height)?;
        let pos = file.stream_position()?;

        let result = (|| -> io::Result<()> {
            file.write_all(&(payload.len() as u32).to_be_bytes())?;
            file.write_all(&crc32(payload).to_be_bytes())?;
            file.write_all(payload)?;
            Ok(())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                file.set_len(pos)?;
                Err(e.into())
            }
        }
    }

    /// fsyncs the currently open height's file, off the consensus task's
    /// critical path.
    pub fn sync(&mut self) -> Result<()> {
        if let Some(file) = &self.file {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Closes and deletes the file for `height`, per §3 ("WAL: opened on
    /// engine start, truncated per-height on commit"). A no-op if `height`
    /// isn't the currently open one.
    pub fn commit(&mut self, height: Height) -> Result<()> {
        if self.height == Some(height) {
            self.file = None;
            self.height = None;
        }
        let path = self.path_for(height);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn current_height(&self) -> Option<Height> {
        self.height
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn no_open_height() -> WalError {
    WalError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        "no WAL height file is open",
    ))
}

fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Reads every well-formed record from the start of `file`, truncating the
/// file to drop any trailing partial or corrupt record so that subsequent
/// appends start from a clean boundary.
fn read_valid_entries(file: &mut File) -> Result<Vec<Vec<u8>>> {
    file.seek(SeekFrom::Start(0))?;
    let size = file.metadata()?.len();

    let mut entries = Vec::new();
    let mut pos = 0u64;

    while size.saturating_sub(pos) > LENGTH_FIELD_SIZE + CRC_FIELD_SIZE {
        let mut length_buf = [0u8; 4];
        let mut crc_buf = [0u8; 4];
        file.read_exact(&mut length_buf)?;
        file.read_exact(&mut crc_buf)?;
        let length = u32::from_be_bytes(length_buf) as u64;
        let expected_crc = u32::from_be_bytes(crc_buf);

        let record_size = LENGTH_FIELD_SIZE + CRC_FIELD_SIZE + length;
        if size.saturating_sub(pos) < record_size {
            break;
        }

        let mut data = vec![0u8; length as usize];
        file.read_exact(&mut data)?;

        if crc32(&data) != expected_crc {
            break;
        }

        entries.push(data);
        pos += record_size;
    }

    file.set_len(pos)?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_replay_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut wal = Wal::open(dir.path()).unwrap();

        let entries = wal.open_height(Height::new(1)).unwrap();
        assert!(entries.is_empty());

        wal.append(b"proposal-bytes").unwrap();
        wal.append(b"prevote-bytes").unwrap();
        wal.sync().unwrap();
        drop(wal);

        let mut wal = Wal::open(dir.path()).unwrap();
        let replayed = wal.open_height(Height::new(1)).unwrap();
        assert_eq!(replayed, vec![b"proposal-bytes".to_vec(), b"prevote-bytes".to_vec()]);
    }

    #[test]
    fn commit_deletes_the_height_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut wal = Wal::open(dir.path()).unwrap();
        wal.open_height(Height::new(1)).unwrap();
        wal.append(b"x").unwrap();

        let path = wal.path_for(Height::new(1));
        assert!(path.exists());

        wal.commit(Height::new(1)).unwrap();
        assert!(!path.exists());
        assert!(wal.current_height().is_none());
    }

    #[test]
    fn truncated_trailing_record_is_dropped_on_replay() {
        let dir = tempfile::tempdir().unwrap();
        let mut wal = Wal::open(dir.path()).unwrap();
        wal.open_height(Height::new(1)).unwrap();
        wal.append(b"complete").unwrap();

        // Simulate a crash mid-write: append a partial record by hand.
        {
            let file = wal.file.as_mut().unwrap();
            file.write_all(&100u32.to_be_bytes()).unwrap();
            file.write_all(&0u32.to_be_bytes()).unwrap();
            file.write_all(b"short").unwrap();
        }
        drop(wal);

        let mut wal = Wal::open(dir.path()).unwrap();
        let entries = wal.open_height(Height::new(1)).unwrap();
        assert_eq!(entries, vec![b"complete".to_vec()]);
    }
}
