//! Compression of packaged output.

use crate::error::ArchiveError;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutput {
    /// Path of the archive.
    pub path: Utf8PathBuf,
    /// Lowercase hex SHA-256 of the archive.
    pub sha256: String,
}

/// Compresses a packaged output directory into a single file.
pub trait Archiver: Send + Sync {
    /// Archive `output_dir` and remove it.
    ///
    /// # Errors
    ///
    /// Returns an [`ArchiveError`] if the directory cannot be read or the
    /// archive cannot be written.
    fn archive(&self, output_dir: &Utf8Path) -> Result<ArchiveOutput, ArchiveError>;
}

/// Writes `<output_dir>.zip` with deflate compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn archive(&self, output_dir: &Utf8Path) -> Result<ArchiveOutput, ArchiveError> {
        let path = archive_path_for(output_dir);
        write_zip(output_dir, &path)?;
        let sha256 = compute_sha256(&path).map_err(|source| ArchiveError::Io {
            path: path.clone(),
            source,
        })?;
        fs::remove_dir_all(output_dir).map_err(|source| ArchiveError::Io {
            path: output_dir.to_owned(),
            source,
        })?;
        debug!("archived {output_dir} to {path} ({sha256})");
        Ok(ArchiveOutput { path, sha256 })
    }
}

/// Archive path written for `output_dir`: the directory name plus `.zip`.
#[must_use]
pub fn archive_path_for(output_dir: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{output_dir}.zip"))
}

/// Compute the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns any I/O error encountered while reading the file.
pub fn compute_sha256(path: &Utf8Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn write_zip(root: &Utf8Path, archive: &Utf8Path) -> Result<(), ArchiveError> {
    let io_err = |path: &Utf8Path| {
        let path = path.to_owned();
        move |source| ArchiveError::Io { path, source }
    };
    let zip_err = |source| ArchiveError::Zip {
        path: archive.to_owned(),
        source,
    };

    let file = File::create(archive).map_err(io_err(archive))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let base = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let top = root.file_name().unwrap_or_default();
    let mut pending = vec![root.to_owned()];
    while let Some(dir) = pending.pop() {
        let mut entries = dir
            .read_dir_utf8()
            .map_err(io_err(&dir))?
            .collect::<io::Result<Vec<_>>>()
            .map_err(io_err(&dir))?;
        entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));

        for entry in entries {
            let path = entry.path().to_owned();
            let relative = path.strip_prefix(root).unwrap_or(path.as_path());
            let name = format!("{top}/{relative}");
            let metadata = fs::symlink_metadata(&path).map_err(io_err(&path))?;
            let options = with_permissions(base, &metadata);

            if metadata.is_dir() {
                zip.add_directory(name, options).map_err(zip_err)?;
                pending.push(path);
            } else if metadata.is_symlink() {
                let target = fs::read_link(&path).map_err(io_err(&path))?;
                zip.add_symlink(name, target.to_string_lossy().into_owned(), options)
                    .map_err(zip_err)?;
            } else {
                zip.start_file(name, options).map_err(zip_err)?;
                let mut source = File::open(&path).map_err(io_err(&path))?;
                io::copy(&mut source, &mut zip).map_err(io_err(&path))?;
            }
        }
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

#[cfg(unix)]
fn with_permissions(options: SimpleFileOptions, metadata: &fs::Metadata) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;

    options.unix_permissions(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn with_permissions(options: SimpleFileOptions, _metadata: &fs::Metadata) -> SimpleFileOptions {
    options
}
