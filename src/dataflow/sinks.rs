//! JSON and CSV writers for projected cards.
//!
//! Both writers stage their output in a temporary file next to the destination
//! and rename it into place once everything is flushed, so an existing file is
//! either fully replaced or left untouched.

use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::projection::Card;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("couldn't write `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't encode JSON for `{}`: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("couldn't encode CSV for `{}`: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl SinkError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> SinkError + '_ {
        move |source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What [write_csv] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CsvOutcome {
    /// There were no cards, so no file was touched
    Skipped,
    Written { rows: usize },
}

/// Column layout of the CSV file: list fields are joined with `", "`
#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    name: &'a str,
    set_name: &'a str,
    set_id: &'a str,
    number: &'a str,
    image_small: &'a str,
    image_large: &'a str,
    supertype: &'a str,
    subtypes: String,
    hp: &'a str,
    types: String,
}

impl<'a> From<&'a Card> for CsvRow<'a> {
    fn from(card: &'a Card) -> Self {
        CsvRow {
            id: &card.id,
            name: &card.name,
            set_name: &card.set_name,
            set_id: &card.set_id,
            number: &card.number,
            image_small: &card.image_small,
            image_large: &card.image_large,
            supertype: &card.supertype,
            subtypes: card.subtypes.join(", "),
            hp: &card.hp,
            types: card.types.join(", "),
        }
    }
}

/// Runs `write` against a buffered temp file in `path`'s directory, then
/// replaces `path` with it. The temp file is removed if anything fails.
fn replace_atomically<F>(path: &Path, write: F) -> Result<(), SinkError>
where
    F: FnOnce(&mut BufWriter<NamedTempFile>) -> Result<(), SinkError>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(parent).map_err(SinkError::io(path))?;

    let temp = NamedTempFile::new_in(parent).map_err(SinkError::io(path))?;
    let mut buffer = BufWriter::new(temp);

    write(&mut buffer)?;

    let temp = buffer
        .into_inner()
        .map_err(|err| SinkError::io(path)(err.into_error()))?;

    temp.persist(path)
        .map_err(|err| SinkError::io(path)(err.error))?;

    Ok(())
}

/// Writes `cards` as one pretty-printed JSON array, non-ASCII left as-is.
/// An empty slice still produces `[]`.
pub(crate) fn write_json(cards: &[Card], path: &Path) -> Result<(), SinkError> {
    replace_atomically(path, |out| {
        serde_json::to_writer_pretty(&mut *out, cards).map_err(|source| SinkError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        out.write_all(b"\n").map_err(SinkError::io(path))
    })
}

/// Writes a header plus one row per card. Does nothing for an empty slice.
pub(crate) fn write_csv(cards: &[Card], path: &Path) -> Result<CsvOutcome, SinkError> {
    if cards.is_empty() {
        return Ok(CsvOutcome::Skipped);
    }

    let csv_err = |source| SinkError::Csv {
        path: path.to_path_buf(),
        source,
    };

    replace_atomically(path, |out| {
        let mut writer = csv::Writer::from_writer(out);

        for card in cards {
            writer.serialize(CsvRow::from(card)).map_err(csv_err)?;
        }

        writer.flush().map_err(SinkError::io(path))
    })?;

    Ok(CsvOutcome::Written { rows: cards.len() })
}
