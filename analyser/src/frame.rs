use polars::prelude::*;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Table is empty")]
    Empty,
    #[error("Failed to read table: {0}")]
    Csv(#[from] PolarsError),
}

/// Load a comma separated table into a [DataFrame] with every column read as a string.
///
/// Types are applied afterwards by the caller, against the schema it expects, so a bad value
/// is reported against the column it belongs to instead of changing the inferred type of the
/// whole column. Short rows are padded with nulls.
///
/// Exporters write `, ` separated tables, so header names and cells are trimmed. A cell that
/// is blank after trimming is null.
pub(crate) fn load_text_table(bytes: &[u8], has_header: bool) -> Result<DataFrame, LoadError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(LoadError::Empty);
    }

    let mut frame = CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|options| options.with_truncate_ragged_lines(true))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    let names = frame
        .get_column_names()
        .iter()
        .map(|c| c.trim().to_string())
        .collect::<Vec<_>>();
    frame.set_column_names(names.iter().map(String::as_str))?;

    let frame = frame
        .lazy()
        .with_columns(names.iter().map(|name| trimmed(name)).collect::<Vec<_>>())
        .collect()?;

    log::trace!("Loaded frame: {}", frame);

    Ok(frame)
}

fn trimmed(name: &str) -> Expr {
    let stripped = col(name).str().strip_chars(lit(NULL));
    when(stripped.clone().eq(lit("")))
        .then(lit(NULL))
        .otherwise(stripped)
        .alias(name)
}
