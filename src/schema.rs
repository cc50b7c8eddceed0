use std::collections::{BTreeSet, HashMap};

use crate::domain::{self, SchemaVariant, columns};
use crate::error::IngestError;
use crate::table::{Cell, PlateMapTable};

/// Columns coerced to numbers when present, across both variants.
pub const NUMERIC_COLUMNS: &[&str] = &[
    "Sample volume",
    "Peptide concentration",
    "Peptide mass sample",
    "Recon volume",
    "Dilution factor",
    "Reconstituted peptide concentration",
    "Recovered peptide mass",
    "Reconstitution volume",
];

/// Plate map that passed validation, tagged with its detected variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlateMap {
    variant: SchemaVariant,
    table: PlateMapTable,
}

impl ValidatedPlateMap {
    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    pub fn table(&self) -> &PlateMapTable {
        &self.table
    }

    pub fn into_table(self) -> PlateMapTable {
        self.table
    }

    /// Distinct MS file names in row order.
    pub fn file_names(&self) -> Vec<String> {
        distinct_file_names(&self.table)
    }
}

/// Validates a plate map against the files the caller intends to register.
///
/// `local_file_names` may be full paths; only their basenames are compared.
/// Validating an already validated table returns it unchanged.
pub fn validate<S: AsRef<str>>(
    mut table: PlateMapTable,
    local_file_names: &[S],
) -> Result<ValidatedPlateMap, IngestError> {
    normalize_plate_name_header(&mut table);
    let variant = SchemaVariant::detect(table.headers().iter().map(String::as_str));

    let missing = variant
        .required_columns()
        .iter()
        .filter(|column| !table.has_column(column))
        .map(|column| column.to_string())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }
    if table.is_empty() {
        return Err(IngestError::EmptyPlateMap);
    }

    check_required_values(&table)?;
    check_entity_names(&table)?;
    coerce_numeric_columns(&mut table)?;
    check_file_references(&table, local_file_names)?;
    check_plate_assignment(&table)?;

    tracing::debug!(%variant, rows = table.len(), "plate map validated");
    Ok(ValidatedPlateMap { variant, table })
}

fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_plate_name_header(table: &mut PlateMapTable) {
    let canonical = normalize_header(columns::PLATE_NAME);
    let matches = table
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, header)| {
            header.as_str() != columns::PLATE_NAME && normalize_header(header) == canonical
        })
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    for index in matches {
        table.rename_column(index, columns::PLATE_NAME);
    }
}

fn check_required_values(table: &PlateMapTable) -> Result<(), IngestError> {
    for column in [columns::MS_FILE_NAME, columns::SAMPLE_ID] {
        for row in 0..table.len() {
            if table.text(row, column).is_none() {
                return Err(IngestError::MissingRequiredValue {
                    column: column.to_string(),
                    row: row + 1,
                });
            }
        }
    }
    Ok(())
}

fn check_entity_names(table: &PlateMapTable) -> Result<(), IngestError> {
    for column in [columns::PLATE_ID, columns::PLATE_NAME] {
        for row in 0..table.len() {
            let value = table.text(row, column).unwrap_or_default();
            if !domain::is_valid_entity_name(&value) {
                return Err(IngestError::InvalidEntityName {
                    field: column.to_string(),
                    value,
                });
            }
        }
    }
    Ok(())
}

fn coerce_numeric_columns(table: &mut PlateMapTable) -> Result<(), IngestError> {
    let mut failed = Vec::new();
    for column in NUMERIC_COLUMNS {
        let Some(cells) = table.column_cells_mut(column) else {
            continue;
        };
        let mut column_ok = true;
        for cell in cells {
            let parsed = match cell {
                Cell::Text(value) => Some(value.parse::<f64>()),
                _ => None,
            };
            match parsed {
                Some(Ok(number)) if number.is_finite() => *cell = Cell::Number(number),
                Some(_) => column_ok = false,
                None => {}
            }
        }
        if !column_ok {
            failed.push(column.to_string());
        }
    }
    if failed.is_empty() {
        Ok(())
    } else {
        Err(IngestError::NonNumericColumn(failed))
    }
}

fn distinct_file_names(table: &PlateMapTable) -> Vec<String> {
    let mut seen = BTreeSet::new();
    (0..table.len())
        .filter_map(|row| table.text(row, columns::MS_FILE_NAME))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

fn check_file_references<S: AsRef<str>>(
    table: &PlateMapTable,
    local_file_names: &[S],
) -> Result<(), IngestError> {
    let in_table = distinct_file_names(table);
    let mut seen = BTreeSet::new();
    let supplied = local_file_names
        .iter()
        .map(|name| domain::basename(name.as_ref()).to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect::<Vec<_>>();

    if in_table.len() != supplied.len() {
        return Err(IngestError::FileCountMismatch {
            in_table: in_table.len(),
            supplied: supplied.len(),
        });
    }

    let table_set = in_table.iter().collect::<BTreeSet<_>>();
    let unreferenced = supplied
        .iter()
        .filter(|name| !table_set.contains(name))
        .cloned()
        .collect::<Vec<_>>();
    if !unreferenced.is_empty() {
        return Err(IngestError::MissingFileReference(unreferenced));
    }

    let bad_extensions = in_table
        .iter()
        .filter(|name| !domain::is_valid_raw_file_name(name))
        .cloned()
        .collect::<Vec<_>>();
    if !bad_extensions.is_empty() {
        return Err(IngestError::InvalidRawFileExtension(bad_extensions));
    }
    Ok(())
}

fn check_plate_assignment(table: &PlateMapTable) -> Result<(), IngestError> {
    let mut assignments: HashMap<String, (Option<String>, Option<String>)> = HashMap::new();
    let mut ambiguous = Vec::new();
    for row in 0..table.len() {
        let Some(sample_id) = table.text(row, columns::SAMPLE_ID) else {
            continue;
        };
        let plate = (
            table.text(row, columns::PLATE_ID),
            table.text(row, columns::PLATE_NAME),
        );
        match assignments.get(&sample_id) {
            Some(existing) if *existing != plate => {
                if !ambiguous.contains(&sample_id) {
                    ambiguous.push(sample_id);
                }
            }
            Some(_) => {}
            None => {
                assignments.insert(sample_id, plate);
            }
        }
    }
    if ambiguous.is_empty() {
        Ok(())
    } else {
        Err(IngestError::AmbiguousPlateAssignment(ambiguous))
    }
}
