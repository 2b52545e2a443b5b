use chrono::{Datelike, Local, Timelike};
use std::fs::{self, File, Metadata};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Name of the archive written to the current working directory.
pub(crate) const OUTPUT_NAME: &str = "out.zip";

// Entries at or above this size need ZIP64 headers
const LARGE_FILE_THRESHOLD: u64 = 0xFFFF_FFFF;

#[derive(Debug, Error)]
pub(crate) enum ArchiveError {
    #[error("Cannot open folder {}: {source}", path.display())]
    Source { path: PathBuf, source: io::Error },

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot read {}: {source}", path.display())]
    Entry { path: PathBuf, source: io::Error },

    #[error("Path is not valid UTF-8: {}", .0.display())]
    InvalidName(PathBuf),

    #[error("Cannot walk folder: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot write zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Cannot save archive: {0}")]
    Persist(#[from] tempfile::PersistError),
}

fn entry_error(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Entry {
        path: path.to_path_buf(),
        source,
    }
}

/// Compresses every entry below `source` into a zip archive at `destination`.
///
/// The archive is first written to a temporary file next to `destination`
/// and renamed over it once complete, so an existing archive is either fully
/// replaced or left untouched.
pub(crate) fn zip_dir(source: &Path, destination: &Path) -> Result<(), ArchiveError> {
    let root = match fs::canonicalize(source) {
        Ok(root) => root,
        Err(e) => {
            return Err(ArchiveError::Source {
                path: source.to_path_buf(),
                source: e,
            });
        }
    };

    if !root.is_dir() {
        return Err(ArchiveError::NotADirectory(source.to_path_buf()));
    }

    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".out.zip.").suffix(".tmp");
    default_permissions(&mut builder);

    let tmp = builder.tempfile_in(parent)?;

    // Neither the archive in progress nor its final path may end up inside itself
    let parent = fs::canonicalize(parent)?;
    let skip: Vec<PathBuf> = [tmp.path(), destination]
        .iter()
        .filter_map(|p| p.file_name())
        .map(|name| parent.join(name))
        .collect();

    let mut zip = ZipWriter::new(tmp);

    write_entries(&root, &skip, &mut zip)?;

    let tmp = zip.finish()?;

    // Overwriting keeps the mode of the archive being replaced
    if let Ok(existing) = fs::metadata(destination) {
        tmp.as_file().set_permissions(existing.permissions())?;
    }

    tmp.persist(destination)?;

    Ok(())
}

/// New archives get 0666 minus the umask, like any other file the user creates.
#[cfg(unix)]
fn default_permissions(builder: &mut tempfile::Builder) {
    use std::os::unix::fs::PermissionsExt;

    builder.permissions(fs::Permissions::from_mode(0o666));
}

#[cfg(not(unix))]
fn default_permissions(_builder: &mut tempfile::Builder) {}

fn write_entries<W: Write + Seek>(
    root: &Path,
    skip: &[PathBuf],
    zip: &mut ZipWriter<W>,
) -> Result<(), ArchiveError> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1);

    for entry in walker {
        let entry = entry?;
        let path = entry.path();

        if skip.iter().any(|p| p == path) {
            continue;
        }

        // Follows symlinks: a link to a file stores the target's content,
        // a link to a directory becomes an empty directory entry
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            // Dangling or looping link, neither a file nor a directory
            Err(_) if entry.path_is_symlink() => continue,
            Err(e) => return Err(entry_error(path)(e)),
        };

        let name = entry_name(root, path)?;

        let options = entry_options(&metadata);

        if metadata.is_dir() {
            zip.add_directory(name.as_str(), options)?;
        } else if metadata.is_file() {
            let options = options.large_file(metadata.len() >= LARGE_FILE_THRESHOLD);

            add_file(zip, &name, path, options)?;
        }
    }

    Ok(())
}

fn add_file<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    path: &Path,
    options: SimpleFileOptions,
) -> Result<u64, ArchiveError> {
    let mut file = File::open(path).map_err(entry_error(path))?;

    zip.start_file(name, options)?;

    io::copy(&mut file, zip).map_err(entry_error(path))
}

/// Archive name of `path` relative to `root`, always `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ArchiveError::InvalidName(path.to_path_buf()))?;

    let components = relative
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or_else(|| ArchiveError::InvalidName(path.to_path_buf()))
        })
        .collect::<Result<Vec<&str>, _>>()?;

    Ok(components.join("/"))
}

fn entry_options(metadata: &Metadata) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(modified_time(metadata));

    with_permissions(options, metadata)
}

#[cfg(unix)]
fn with_permissions(options: SimpleFileOptions, metadata: &Metadata) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;

    options.unix_permissions(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn with_permissions(options: SimpleFileOptions, _metadata: &Metadata) -> SimpleFileOptions {
    options
}

/// Local modification time, or 1980-01-01 when it falls outside what zip can store.
fn modified_time(metadata: &Metadata) -> DateTime {
    let Ok(modified) = metadata.modified() else {
        return DateTime::default();
    };

    let local: chrono::DateTime<Local> = modified.into();

    if !(1980..=2107).contains(&local.year()) {
        return DateTime::default();
    }

    DateTime::from_date_and_time(
        local.year() as u16,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_default()
}
