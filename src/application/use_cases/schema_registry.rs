// Filename → table identifier + storage schema.
//
// Dimension markers are matched against the lower-cased filename in the
// order of DIMENSION_MARKERS; the first hit wins.

use crate::domain::epidemic::Dimension;
use crate::domain::error::{AppError, Result};
use crate::domain::schema::{ColumnSchema, TableDescriptor};

pub const DIMENSION_MARKERS: &[(&str, Dimension)] = &[
    ("provincedata", Dimension::Province),
    ("countrydata", Dimension::Country),
];

/// Lower-case and keep only ASCII/Unicode alphanumerics and `_`.
pub fn sanitize(filename: &str) -> String {
    filename
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

pub fn schema_for(filename: &str) -> ColumnSchema {
    let lowered = filename.to_lowercase();
    DIMENSION_MARKERS
        .iter()
        .find(|(marker, _)| lowered.contains(marker))
        .map(|(_, dimension)| ColumnSchema::with_dimension(*dimension))
        .unwrap_or(ColumnSchema::BASE)
}

/// Descriptor for a new upload. Empty identifiers are rejected.
pub fn descriptor_for(filename: &str) -> Result<TableDescriptor> {
    let identifier = sanitize(filename);
    if identifier.is_empty() {
        return Err(AppError::ValidationError(format!(
            "Filename '{}' yields an empty table identifier",
            filename
        )));
    }
    Ok(TableDescriptor::new(identifier, schema_for(filename)))
}

/// Recover the schema of an existing table from its column names.
pub fn dimension_from_columns<'a, I>(names: I) -> ColumnSchema
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = names.into_iter().collect();
    [Dimension::Province, Dimension::Country]
        .into_iter()
        .find(|d| names.iter().any(|n| n.eq_ignore_ascii_case(d.column_name())))
        .map(ColumnSchema::with_dimension)
        .unwrap_or(ColumnSchema::BASE)
}

/// Display label for a table identifier: `_` → space, words title-cased.
pub fn display_label(identifier: &str) -> String {
    identifier
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
