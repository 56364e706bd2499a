// ABOUTME: Deterministic zip archives of local code and zip content sniffing.
// ABOUTME: Entries are sorted, use '/' separators and carry a fixed timestamp.

use std::fs::File;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Local file header signature.
const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to create temporary archive: {0}")]
    Temp(#[source] io::Error),
}

/// Whether the file starts with a zip local file header.
pub fn is_zip(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == ZIP_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Zip a file or directory tree into a temporary file.
/// The file is removed when the returned handle is dropped.
pub fn zip_to_temp(source: &Path) -> Result<NamedTempFile, ArchiveError> {
    let mut temp = tempfile::Builder::new()
        .prefix("stratus-")
        .suffix(".zip")
        .tempfile()
        .map_err(ArchiveError::Temp)?;
    write_zip(source, temp.as_file_mut())?;
    Ok(temp)
}

/// Write a deterministic archive of `source` to `writer`.
///
/// A directory contributes every entry below it, relative to it; a single
/// file contributes one entry named after the file.
pub fn write_zip<W: Write + Seek>(source: &Path, writer: W) -> Result<(), ArchiveError> {
    let mut zip = ZipWriter::new(writer);

    if source.is_file() {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        add_file(&mut zip, source, name)?;
        zip.finish()?;
        return Ok(());
    }

    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| ArchiveError::Walk {
            path: source.to_path_buf(),
            source: e,
        })?;
        let name = entry_name(source, entry.path());
        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), entry_options())?;
        } else {
            add_file(&mut zip, entry.path(), name)?;
        }
    }

    zip.finish()?;
    Ok(())
}

fn add_file<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    path: &Path,
    name: String,
) -> Result<(), ArchiveError> {
    let read_err = |source| ArchiveError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(read_err)?;

    let options = entry_options();
    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        let mode = file.metadata().map_err(read_err)?.permissions().mode();
        options.unix_permissions(mode)
    };

    zip.start_file(name, options)?;
    io::copy(&mut file, zip).map_err(read_err)?;
    Ok(())
}

/// Deflated, with a fixed timestamp so identical trees give identical archives.
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
}

/// Path of `path` relative to `base`, joined with '/'.
fn entry_name(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
