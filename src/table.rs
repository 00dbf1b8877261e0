//! String-celled tables with the handful of relational operations the catalog
//! pipeline needs: CSV in and out, key joins, column renames, concatenation
//! and de-duplication.
//!
//! Cells are kept verbatim as read from the source so that a table written to
//! disk and loaded again is unchanged. Join keys are compared through
//! [`normalize_identifier`], which lets an integer identifier from one source
//! match a float-formatted one from another.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};

use camino::Utf8Path;

use crate::error::TessError;

#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    /// Lines starting with this byte are skipped.
    pub comment: Option<u8>,
    /// Treat an unnamed first column as a positional row index and drop it.
    pub index_col: bool,
}

impl CsvOptions {
    pub fn commented() -> Self {
        Self {
            comment: Some(b'#'),
            index_col: false,
        }
    }

    pub fn indexed() -> Self {
        Self {
            comment: Some(b'#'),
            index_col: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Keep only left rows with a match on the right.
    Inner,
    /// Keep every left row; unmatched rows get empty right-hand cells.
    Left,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TessError> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), TessError> {
        if row.len() != self.columns.len() {
            return Err(TessError::Csv(format!(
                "row has {} cells but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn require_column(&self, name: &str, context: &str) -> Result<usize, TessError> {
        self.column_index(name)
            .ok_or_else(|| TessError::MissingColumn {
                column: name.to_string(),
                context: context.to_string(),
            })
    }

    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    pub fn select(&self, names: &[&str], context: &str) -> Result<Table, TessError> {
        let indices = names
            .iter()
            .map(|name| self.require_column(name, context))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Table {
            columns: names.iter().map(|name| name.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&idx| row[idx].clone()).collect())
                .collect(),
        })
    }

    /// Renames every column found in `mapping`; names not present are ignored.
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| from == column) {
                *column = to.to_string();
            }
        }
    }

    pub fn drop_column(&mut self, name: &str) {
        if let Some(idx) = self.column_index(name) {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
    }

    /// Replaces the column if present, otherwise appends it.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<(), TessError> {
        if values.len() != self.rows.len() {
            return Err(TessError::Csv(format!(
                "column `{name}` has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Joins `right` onto `self` by key. Left row order is preserved. When both
    /// keys share a name the right key column is folded into the left one;
    /// other clashing names get `_x` / `_y` suffixes.
    pub fn join(
        &self,
        right: &Table,
        left_on: &str,
        right_on: &str,
        kind: JoinKind,
    ) -> Result<Table, TessError> {
        let left_key = self.require_column(left_on, "left side of join")?;
        let right_key = right.require_column(right_on, "right side of join")?;
        let shared_key = left_on == right_on;

        let right_cols = (0..right.columns.len())
            .filter(|&idx| !(shared_key && idx == right_key))
            .collect::<Vec<_>>();

        let right_names = right_cols
            .iter()
            .map(|&idx| right.columns[idx].as_str())
            .collect::<HashSet<_>>();
        let mut columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let folded_key = shared_key && idx == left_key;
                if !folded_key && right_names.contains(name.as_str()) {
                    format!("{name}_x")
                } else {
                    name.clone()
                }
            })
            .collect::<Vec<_>>();
        let left_names = self.columns.iter().map(String::as_str).collect::<HashSet<_>>();
        columns.extend(right_cols.iter().map(|&idx| {
            let name = &right.columns[idx];
            if left_names.contains(name.as_str()) {
                format!("{name}_y")
            } else {
                name.clone()
            }
        }));

        let mut lookup: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, row) in right.rows.iter().enumerate() {
            lookup
                .entry(normalize_identifier(&row[right_key]))
                .or_default()
                .push(idx);
        }

        let mut rows = Vec::new();
        for left_row in &self.rows {
            let key = normalize_identifier(&left_row[left_key]);
            match lookup.get(&key) {
                Some(matches) => {
                    for &right_idx in matches {
                        let mut row = left_row.clone();
                        row.extend(
                            right_cols
                                .iter()
                                .map(|&idx| right.rows[right_idx][idx].clone()),
                        );
                        rows.push(row);
                    }
                }
                None if kind == JoinKind::Left => {
                    let mut row = left_row.clone();
                    row.extend(std::iter::repeat_n(String::new(), right_cols.len()));
                    rows.push(row);
                }
                None => {}
            }
        }

        Ok(Table { columns, rows })
    }

    /// Stacks tables vertically over the union of their columns. Cells for
    /// columns a table lacks are left empty.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            let mapping = columns
                .iter()
                .map(|column| table.column_index(column))
                .collect::<Vec<_>>();
            for row in table.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|idx| idx.map(|idx| row[idx].clone()).unwrap_or_default())
                        .collect(),
                );
            }
        }
        Table { columns, rows }
    }

    /// Keeps the first row for each distinct key in `column`.
    pub fn drop_duplicates(&mut self, column: &str) -> Result<(), TessError> {
        let idx = self.require_column(column, "drop_duplicates")?;
        let mut seen = HashSet::new();
        self.rows
            .retain(|row| seen.insert(normalize_identifier(&row[idx])));
        Ok(())
    }

    pub fn read_csv<R: Read>(reader: R, options: CsvOptions) -> Result<Table, TessError> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(options.comment)
            .flexible(true)
            .from_reader(reader);

        let mut columns = reader
            .headers()
            .map_err(|err| TessError::Csv(err.to_string()))?
            .iter()
            .map(|name| name.trim().to_string())
            .collect::<Vec<_>>();
        let drop_index = options.index_col
            && columns
                .first()
                .map(|name| name.is_empty() || name.starts_with("Unnamed: "))
                .unwrap_or(false);
        if drop_index {
            columns.remove(0);
        }
        let skip = usize::from(drop_index);

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|err| TessError::Csv(err.to_string()))?;
            let mut row = record
                .iter()
                .skip(skip)
                .map(str::to_string)
                .collect::<Vec<_>>();
            if row.len() > columns.len() {
                return Err(TessError::Csv(format!(
                    "record {} has {} fields, expected {}",
                    line + 1,
                    row.len(),
                    columns.len()
                )));
            }
            row.resize(columns.len(), String::new());
            rows.push(row);
        }

        Ok(Table { columns, rows })
    }

    pub fn from_csv_bytes(bytes: &[u8], options: CsvOptions) -> Result<Table, TessError> {
        Self::read_csv(bytes, options)
    }

    pub fn read_csv_path(path: &Utf8Path, options: CsvOptions) -> Result<Table, TessError> {
        let file = File::open(path.as_std_path())
            .map_err(|err| TessError::Filesystem(format!("open {path}: {err}")))?;
        Self::read_csv(file, options)
    }

    /// Writes the table with a leading unnamed positional index column.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TessError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(std::iter::once("").chain(self.columns.iter().map(String::as_str)))
            .map_err(|err| TessError::Csv(err.to_string()))?;
        for (idx, row) in self.rows.iter().enumerate() {
            let index = idx.to_string();
            writer
                .write_record(std::iter::once(index.as_str()).chain(row.iter().map(String::as_str)))
                .map_err(|err| TessError::Csv(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| TessError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, TessError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(buffer)
    }
}

/// Canonical spelling of a catalog identifier: trimmed, with integral floats
/// such as `"100.0"` collapsed to `"100"`.
pub fn normalize_identifier(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.parse::<u64>().is_ok() {
        return trimmed.trim_start_matches('+').to_string();
    }
    match trimmed.parse::<f64>() {
        Ok(parsed)
            if parsed.is_finite()
                && parsed >= 0.0
                && parsed < u64::MAX as f64
                && parsed.fract() == 0.0 =>
        {
            format!("{}", parsed as u64)
        }
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn read_skips_comments_and_index() {
        let csv = b"# generated\n,ID,noise\n0,100,1.5\n1,200,2.5\n";
        let parsed = Table::from_csv_bytes(csv, CsvOptions::indexed()).unwrap();
        assert_eq!(parsed.columns(), &["ID".to_string(), "noise".to_string()]);
        assert_eq!(parsed.column("noise").unwrap(), vec!["1.5", "2.5"]);
    }

    #[test]
    fn named_first_column_is_kept() {
        let csv = b"toi,period\n101.01,3.2\n";
        let parsed = Table::from_csv_bytes(csv, CsvOptions::indexed()).unwrap();
        assert_eq!(parsed.columns()[0], "toi");
    }

    #[test]
    fn inner_join_drops_unmatched() {
        let left = table(&["ID", "Tmag"], &[&["100", "9.1"], &["200", "10.2"]]);
        let right = table(
            &["TICID", "Camera"],
            &[&["100", "1"], &["200", "2"], &["300", "3"]],
        );
        let joined = left.join(&right, "ID", "TICID", JoinKind::Inner).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.columns(), &["ID", "Tmag", "TICID", "Camera"]);
        assert_eq!(joined.column("Camera").unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn left_join_keeps_unmatched_with_empty_cells() {
        let left = table(&["ID"], &[&["100"], &["200"]]);
        let right = table(&["ID", "noise"], &[&["200.0", "55"]]);
        let joined = left.join(&right, "ID", "ID", JoinKind::Left).unwrap();
        assert_eq!(joined.columns(), &["ID", "noise"]);
        assert_eq!(joined.column("noise").unwrap(), vec!["", "55"]);
    }

    #[test]
    fn join_suffixes_clashing_columns() {
        let left = table(&["ID", "ra"], &[&["1", "10"]]);
        let right = table(&["TICID", "ra"], &[&["1", "11"]]);
        let joined = left.join(&right, "ID", "TICID", JoinKind::Inner).unwrap();
        assert_eq!(joined.columns(), &["ID", "ra_x", "TICID", "ra_y"]);
    }

    #[test]
    fn concat_unions_columns() {
        let a = table(&["ticid", "noise"], &[&["1", "5"]]);
        let b = table(&["ticid"], &[&["2"]]);
        let stacked = Table::concat(vec![a, b]);
        assert_eq!(stacked.columns(), &["ticid", "noise"]);
        assert_eq!(stacked.rows()[1], vec!["2".to_string(), String::new()]);
    }

    #[test]
    fn drop_duplicates_keeps_first() {
        let mut t = table(&["ticid", "sector"], &[&["1", "3"], &["2", "3"], &["1", "4"]]);
        t.drop_duplicates("ticid").unwrap();
        assert_eq!(t.column("sector").unwrap(), vec!["3", "3"]);
    }

    #[test]
    fn write_then_read_round_trips() {
        let original = table(&["ticid", "comment"], &[&["1", "has, comma"], &["2", ""]]);
        let bytes = original.to_csv_bytes().unwrap();
        let loaded = Table::from_csv_bytes(&bytes, CsvOptions::indexed()).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn normalizes_identifiers() {
        assert_eq!(normalize_identifier(" 100 "), "100");
        assert_eq!(normalize_identifier("100.0"), "100");
        assert_eq!(normalize_identifier("100.5"), "100.5");
        assert_eq!(normalize_identifier("abc"), "abc");
    }

    #[test]
    fn out_of_range_floats_keep_their_text() {
        assert_eq!(normalize_identifier("1e30"), "1e30");
        assert_ne!(normalize_identifier("1e30"), normalize_identifier("2e30"));
        assert_eq!(normalize_identifier("1e5"), "100000");
    }
}
