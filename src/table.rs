use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::IngestError;

/// One plate-map cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn from_raw(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Cell rendered as text; `None` when empty.
    pub fn text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(value) => Some(value.clone()),
            Cell::Number(value) => Some(value.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(value) => write!(f, "{value}"),
            Cell::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::from_raw(value)
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map(Cell::from_raw).unwrap_or(Cell::Empty)
    }
}

/// Header-addressed table used for plate maps and sample description files.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlateMapTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl PlateMapTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding short rows with empty cells and dropping extra cells.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, IngestError> {
        if !path.exists() {
            return Err(IngestError::PathNotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|err| IngestError::Filesystem(err.to_string()))?;
        Self::from_reader(file).map_err(|message| IngestError::TableParse {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn from_csv_str(content: &str) -> Result<Self, IngestError> {
        Self::from_reader(content.as_bytes()).map_err(|message| IngestError::TableParse {
            path: "<memory>".to_string(),
            message,
        })
    }

    fn from_reader<R: Read>(reader: R) -> Result<Self, String> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|err| err.to_string())?
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
            .collect::<Vec<_>>();
        let mut table = Self::new(headers);

        for record in csv_reader.records() {
            let record = record.map_err(|err| err.to_string())?;
            if record.len() > table.headers.len() {
                tracing::debug!(line = ?record.position().map(|p| p.line()), "skipping malformed row");
                continue;
            }
            if record.iter().all(|value| value.trim().is_empty()) {
                continue;
            }
            table.push_row(record.iter().map(Cell::from_raw).collect());
        }
        Ok(table)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), IngestError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer
            .write_record(&self.headers)
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        for row in &self.rows {
            csv_writer
                .write_record(row.iter().map(|cell| cell.to_string()))
                .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        }
        csv_writer
            .flush()
            .map_err(|err| IngestError::Filesystem(err.to_string()))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn rename_column(&mut self, index: usize, name: &str) {
        if let Some(header) = self.headers.get_mut(index) {
            *header = name.to_string();
        }
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(index))
    }

    /// Text of a cell, `None` when the column is absent or the cell is empty.
    pub fn text(&self, row: usize, column: &str) -> Option<String> {
        self.cell(row, column).and_then(Cell::text)
    }

    pub fn column_cells(&self, column: &str) -> Option<impl Iterator<Item = &Cell>> {
        let index = self.column_index(column)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    pub fn column_cells_mut(&mut self, column: &str) -> Option<impl Iterator<Item = &mut Cell>> {
        let index = self.column_index(column)?;
        Some(self.rows.iter_mut().map(move |row| &mut row[index]))
    }
}
