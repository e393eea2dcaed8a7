use collector_core::{CoreError, PostRecord};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Writes the header and one row per record, replacing whatever is at `path`.
///
/// Rows go to a temporary file next to `path` that is renamed into place once
/// complete, so readers never see a partial file.
pub fn write_csv(path: &Path, records: &[PostRecord]) -> Result<(), CoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    write_records(temp.as_file_mut(), records)?;
    temp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    debug!("Renaming {} to {}", temp.path().display(), path.display());
    temp.persist(path).map_err(|e| CoreError::Io(e.error))?;

    info!("Saved {} posts to '{}'", records.len(), path.display());
    Ok(())
}

/// CSV body for `records`, header included, on any writer.
pub fn write_records<W: Write>(writer: W, records: &[PostRecord]) -> Result<(), CoreError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer
        .write_record(PostRecord::FIELDS)
        .map_err(io::Error::from)?;
    for record in records {
        csv_writer.serialize(record).map_err(io::Error::from)?;
    }
    csv_writer.flush()?;
    Ok(())
}
