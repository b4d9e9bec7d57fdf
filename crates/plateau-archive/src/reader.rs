//! # Archive Reader
//!
//! Reconstructs the file held in a stored archive into a per-extraction
//! scratch directory and hands it back as an [`ExtractedFile`]. Dropping the
//! handle deletes the file and its directory, so the reconstructed copy
//! never outlives the response that serves it.
//!
//! Archives whose name ends in `.gz` are read through a zlib decoder;
//! anything else is read as a plain tar stream. Directory entries are
//! recreated inside the scratch directory, other non-file entries are
//! skipped, and reading stops at the first regular file.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};

use flate2::read::ZlibDecoder;
use plateau_core::{AssetKey, Purpose, ARCHIVE_SUFFIX};
use uuid::Uuid;

use crate::error::ArchiveError;
use crate::store::ArchiveStore;

const COPY_BUF_LEN: usize = 64 * 1024;

impl ArchiveStore {
    /// Extract the archive stored for `key` under `purpose`.
    pub fn extract(&self, key: &AssetKey, purpose: Purpose) -> Result<ExtractedFile, ArchiveError> {
        let extracted = self.extract_path(&self.archive_path(key, purpose))?;
        tracing::debug!(%key, %purpose, path = %extracted.path().display(), "archive extracted");
        Ok(extracted)
    }

    /// Extract an archive at an arbitrary path into this store's scratch area.
    pub fn extract_path(&self, archive: &Path) -> Result<ExtractedFile, ArchiveError> {
        let file = match File::open(archive) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArchiveError::ArchiveNotFound {
                    path: archive.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(ArchiveError::StorageUnavailable {
                    path: archive.to_path_buf(),
                    source,
                })
            }
        };

        let stream: Box<dyn Read> = if is_compressed(archive) {
            Box::new(ZlibDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let scratch = ScratchDir::create(self.extracted_dir().join(Uuid::new_v4().to_string()))?;
        let file_path = unpack_first_file(archive, stream, scratch.path())?;
        Ok(ExtractedFile {
            path: file_path,
            scratch,
        })
    }
}

fn is_compressed(archive: &Path) -> bool {
    archive.extension().is_some_and(|ext| ext == "gz")
}

fn unpack_first_file(archive: &Path, stream: impl Read, into: &Path) -> Result<PathBuf, ArchiveError> {
    let mut tar = tar::Archive::new(stream);
    let entries = tar
        .entries()
        .map_err(|e| ArchiveError::corrupt(archive, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ArchiveError::corrupt(archive, e))?;
        let entry_path = entry
            .path()
            .map_err(|e| ArchiveError::corrupt(archive, e))?
            .into_owned();
        let entry_type = entry.header().entry_type();
        let mode = entry.header().mode().unwrap_or(0o644);

        if entry_type.is_dir() {
            let Some(relative) = contained(&entry_path) else {
                tracing::warn!(entry = %entry_path.display(), "skipping directory entry outside extraction root");
                continue;
            };
            let dir = into.join(relative);
            fs::create_dir_all(&dir)
                .and_then(|()| set_mode(&dir, mode | 0o700))
                .map_err(|source| ArchiveError::ExtractIo { path: dir, source })?;
            continue;
        }

        if !entry_type.is_file() {
            tracing::warn!(
                entry = %entry_path.display(),
                entry_type = ?entry_type,
                "skipping unsupported tar entry"
            );
            continue;
        }

        let name = output_name(&entry_path)
            .ok_or_else(|| ArchiveError::corrupt(archive, "file entry has no usable name"))?;
        let out_path = into.join(name);
        let mut out = File::create(&out_path).map_err(|source| ArchiveError::ExtractIo {
            path: out_path.clone(),
            source,
        })?;
        copy_entry(&mut entry, &mut out, archive, &out_path)?;
        set_mode(&out_path, (mode & 0o777) | 0o600).map_err(|source| ArchiveError::ExtractIo {
            path: out_path.clone(),
            source,
        })?;
        return Ok(out_path);
    }

    Err(ArchiveError::corrupt(archive, "archive holds no regular file"))
}

/// Copy an entry body, attributing read failures to the archive and write
/// failures to the output file.
fn copy_entry(
    entry: &mut impl Read,
    out: &mut File,
    archive: &Path,
    out_path: &Path,
) -> Result<u64, ArchiveError> {
    let mut buf = vec![0u8; COPY_BUF_LEN];
    let mut written = 0u64;
    loop {
        let n = match entry.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ArchiveError::corrupt(archive, e)),
        };
        out.write_all(&buf[..n])
            .map_err(|source| ArchiveError::ExtractIo {
                path: out_path.to_path_buf(),
                source,
            })?;
        written += n as u64;
    }
    out.flush().map_err(|source| ArchiveError::ExtractIo {
        path: out_path.to_path_buf(),
        source,
    })?;
    Ok(written)
}

/// Final path segment with the archive suffix stripped.
fn output_name(entry_path: &Path) -> Option<String> {
    let base = entry_path.file_name()?.to_str()?;
    let stem = base
        .strip_suffix(ARCHIVE_SUFFIX)
        .or_else(|| base.strip_suffix(".gz"))
        .unwrap_or(base);
    (!stem.is_empty()).then(|| stem.to_string())
}

/// The normal components of `path`, or `None` if it escapes its root.
fn contained(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Directory removed recursively on drop.
#[derive(Debug)]
struct ScratchDir(PathBuf);

impl ScratchDir {
    fn create(path: PathBuf) -> Result<Self, ArchiveError> {
        fs::create_dir_all(&path).map_err(|source| ArchiveError::StorageUnavailable {
            path: path.clone(),
            source,
        })?;
        Ok(Self(path))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.0) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.0.display(), error = %e, "failed to remove extracted file");
            }
        }
    }
}

/// A reconstructed file that is deleted when this handle is dropped.
#[derive(Debug)]
pub struct ExtractedFile {
    path: PathBuf,
    scratch: ScratchDir,
}

impl ExtractedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the reconstructed file (the archive entry name without its
    /// archive suffix).
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Copy the reconstructed file to `dest`, e.g. to keep it past this
    /// handle's lifetime.
    pub fn copy_to(&self, dest: &Path) -> io::Result<u64> {
        fs::copy(&self.path, dest)
    }

    /// Directory that will be removed with this handle.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use tar::{EntryType, Header};

    fn key(subject: &str) -> AssetKey {
        AssetKey::derive(subject).unwrap()
    }

    fn entry_header(entry_type: EntryType, size: u64, mode: u32) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(entry_type);
        header.set_size(size);
        header.set_mode(mode);
        header
    }

    #[test]
    fn output_name_strips_archive_suffix() {
        assert_eq!(
            output_name(Path::new("srv/archives/jane-profile_picture.tar.gz")).as_deref(),
            Some("jane-profile_picture")
        );
        assert_eq!(output_name(Path::new("photo.jpg.gz")).as_deref(), Some("photo.jpg"));
        assert_eq!(output_name(Path::new("photo.jpg")).as_deref(), Some("photo.jpg"));
        assert_eq!(output_name(Path::new(".tar.gz")), None);
    }

    #[test]
    fn contained_rejects_escapes() {
        assert_eq!(contained(Path::new("a/./b")), Some(PathBuf::from("a/b")));
        assert_eq!(contained(Path::new("../a")), None);
        assert_eq!(contained(Path::new("/etc")), None);
        assert_eq!(contained(Path::new(".")), None);
    }

    #[test]
    fn missing_archive_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let err = store.extract(&key("ghost"), Purpose::ProfilePicture).unwrap_err();
        assert!(matches!(err, ArchiveError::ArchiveNotFound { .. }));
    }

    #[test]
    fn garbage_archive_is_corrupt() {
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let k = key("jane");
        fs::write(
            store.archive_path(&k, Purpose::ProfilePicture),
            b"this is not zlib at all",
        )
        .unwrap();
        let err = store.extract(&k, Purpose::ProfilePicture).unwrap_err();
        assert_eq!(err.kind(), "corrupt_archive");
        assert_eq!(fs::read_dir(store.extracted_dir()).unwrap().count(), 0);
    }

    #[test]
    fn skips_links_and_recreates_dirs_before_first_file() {
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let archive = root.path().join("mixed.tar");

        let mut builder = tar::Builder::new(File::create(&archive).unwrap());
        let mut dir = entry_header(EntryType::Directory, 0, 0o755);
        builder.append_data(&mut dir, "nested/", io::empty()).unwrap();
        let mut link = entry_header(EntryType::Symlink, 0, 0o777);
        builder
            .append_link(&mut link, "shortcut", "/etc/passwd")
            .unwrap();
        let body = b"payload";
        let mut file = entry_header(EntryType::Regular, body.len() as u64, 0o640);
        builder
            .append_data(&mut file, "nested/photo.jpg", &body[..])
            .unwrap();
        builder.into_inner().unwrap();

        let extracted = store.extract_path(&archive).unwrap();
        assert_eq!(extracted.file_name(), "photo.jpg");
        assert_eq!(fs::read(extracted.path()).unwrap(), body);
        assert!(extracted.scratch_dir().join("nested").is_dir());
        assert!(!extracted.scratch_dir().join("shortcut").exists());
    }

    #[test]
    fn directory_only_archive_is_corrupt() {
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let archive = root.path().join("dirs.tar.gz");

        let encoder = ZlibEncoder::new(File::create(&archive).unwrap(), Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        let mut dir = entry_header(EntryType::Directory, 0, 0o755);
        builder.append_data(&mut dir, "only/", io::empty()).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let err = store.extract_path(&archive).unwrap_err();
        assert!(matches!(err, ArchiveError::CorruptArchive { .. }));
    }

    #[test]
    fn dropping_handle_removes_file_and_scratch_dir() {
        let staging = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let source = staging.path().join("upload.jpg");
        fs::write(&source, b"bytes").unwrap();
        store
            .archive(&source, &key("jane"), Purpose::ProfilePicture)
            .unwrap();

        let extracted = store.extract(&key("jane"), Purpose::ProfilePicture).unwrap();
        let path = extracted.path().to_path_buf();
        let scratch = extracted.scratch_dir().to_path_buf();
        assert!(path.exists());
        drop(extracted);
        assert!(!path.exists());
        assert!(!scratch.exists());
    }

    #[test]
    fn concurrent_extractions_do_not_share_files() {
        let staging = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(root.path());
        let source = staging.path().join("upload.jpg");
        fs::write(&source, b"bytes").unwrap();
        store
            .archive(&source, &key("jane"), Purpose::ProfilePicture)
            .unwrap();

        let a = store.extract(&key("jane"), Purpose::ProfilePicture).unwrap();
        let b = store.extract(&key("jane"), Purpose::ProfilePicture).unwrap();
        assert_eq!(a.file_name(), b.file_name());
        assert_ne!(a.path(), b.path());
        drop(a);
        assert_eq!(fs::read(b.path()).unwrap(), b"bytes");
    }
}
