//! Dataset materialization
//!
//! The dataset is a derived projection of the product accumulator: one row
//! per record, in accumulator order, with the fixed column header. It is
//! rewritten whole on every export.

use crate::extract::{Field, FieldMap};
use crate::output::OutputError;
use crate::storage::write_atomically;
use std::path::Path;

/// Writes `records` as a CSV table to `path`
///
/// The previous file, if any, is replaced atomically; a failed write leaves
/// it untouched. Missing fields are written as empty cells.
///
/// # Returns
///
/// * `Ok(usize)` - Number of data rows written
/// * `Err(OutputError)` - The file could not be written
pub fn write_dataset(records: &[FieldMap], path: &Path) -> Result<usize, OutputError> {
    write_atomically(path, |writer| {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(Field::header())?;
        for record in records {
            csv.write_record(record.to_row())?;
        }
        csv.flush()?;
        Ok::<(), OutputError>(())
    })?;

    tracing::info!(path = %path.display(), rows = records.len(), "dataset written");
    Ok(records.len())
}
