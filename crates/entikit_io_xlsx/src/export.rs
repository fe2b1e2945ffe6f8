//! Export service: records -> category sheets -> workbook bytes -> file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tracing::{error, info};

use entikit_entity::{ExportTransformer, FieldCatalog, SpecExportSheet, ValueRecord};

use crate::error::Result;
use crate::util::derive_export_file_name;
use crate::writer::XlsxWriter;

/// Accumulates named sheets and serializes them to a binary workbook.
pub trait WorkbookSink {
    fn write_sheet(&mut self, sheet: &SpecExportSheet) -> Result<()>;

    /// Serialize everything written so far.
    fn finish(&mut self) -> Result<Vec<u8>>;
}

/// Write `sheets` in order and return the finished buffer.
pub fn write_export_sheets<W: WorkbookSink>(
    sink: &mut W,
    sheets: &[SpecExportSheet],
) -> Result<Vec<u8>> {
    for sheet in sheets {
        sink.write_sheet(sheet)?;
    }
    sink.finish()
}

/// Transform `records` and serialize them through `sink`.
pub fn export_records_with_sink<W: WorkbookSink>(
    sink: &mut W,
    catalog: &FieldCatalog,
    records: &[ValueRecord],
) -> Result<Vec<u8>> {
    let l_sheets = ExportTransformer::new(catalog).transform(records);
    write_export_sheets(sink, &l_sheets)
}

/// Workbook bytes for `records` using the default [`XlsxWriter`].
pub fn export_records_to_buffer(catalog: &FieldCatalog, records: &[ValueRecord]) -> Result<Vec<u8>> {
    export_records_with_sink(&mut XlsxWriter::default(), catalog, records)
}

/// Write `buffer` to `<dir>/entity_information_<date>.xlsx`, replacing any
/// export of the same day.
pub fn write_buffer_to_dir(buffer: &[u8], dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path_file_out = dir.join(derive_export_file_name(date));

    let mut file_tmp = NamedTempFile::new_in(dir)?;
    file_tmp.write_all(buffer)?;
    file_tmp.as_file().sync_all()?;
    file_tmp.persist(&path_file_out).map_err(|err| err.error)?;

    Ok(path_file_out)
}

/// Export `records` into `dir` with the default [`XlsxWriter`].
pub fn export_records_to_dir(
    catalog: &FieldCatalog,
    records: &[ValueRecord],
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf> {
    export_records_to_dir_with_sink(&mut XlsxWriter::default(), catalog, records, dir, date)
}

/// Export `records` into `dir` through `sink`.
///
/// The file is created only after the whole workbook has been serialized, so a
/// failed export leaves no file behind.
pub fn export_records_to_dir_with_sink<W: WorkbookSink>(
    sink: &mut W,
    catalog: &FieldCatalog,
    records: &[ValueRecord],
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf> {
    let v_buffer = export_records_with_sink(sink, catalog, records)?;
    let path_file_out = write_buffer_to_dir(&v_buffer, dir, date)?;
    info!(
        path = %path_file_out.display(),
        records = records.len(),
        bytes = v_buffer.len(),
        "entities exported"
    );
    Ok(path_file_out)
}

/// Run [`export_records_to_dir`] on a background thread.
///
/// The caller may drop the handle; failures are logged either way.
pub fn spawn_export_to_dir(
    catalog: Arc<FieldCatalog>,
    records: Vec<ValueRecord>,
    dir: PathBuf,
    date: NaiveDate,
) -> JoinHandle<Result<PathBuf>> {
    thread::spawn(move || {
        let result = export_records_to_dir(&catalog, &records, &dir, date);
        if let Err(err) = &result {
            error!(dir = %dir.display(), error = %err, "export failed");
        }
        result
    })
}
