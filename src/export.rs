use crate::error::{ReportError, Result};
use crate::report::{LabeledRow, LabeledTable};
use crate::table::WideTable;

impl WideTable {
    /// Converts to a [`LabeledTable`] indexed by `establishment`, keeping
    /// row and column order.
    pub fn to_labeled(&self) -> LabeledTable {
        LabeledTable {
            index_name: "establishment".to_string(),
            columns: self.column_names(),
            rows: self
                .rows()
                .iter()
                .map(|row| LabeledRow {
                    label: row.establishment.clone(),
                    cells: row.values.iter().copied().map(Some).collect(),
                })
                .collect(),
        }
    }

    pub fn to_csv(&self) -> Result<String> {
        self.to_labeled().to_csv()
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl LabeledTable {
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Header row is the index name then the columns; `None` cells are empty.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let header = std::iter::once(self.index_name.as_str())
            .chain(self.columns.iter().map(String::as_str));
        writer.write_record(header)?;

        for row in &self.rows {
            let cells = row
                .cells
                .iter()
                .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default());
            writer.write_record(std::iter::once(row.label.clone()).chain(cells))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ReportError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| {
            ReportError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("| {} |", self.index_name));
        for column in &self.columns {
            output.push_str(&format!(" {} |", column));
        }
        output.push('\n');

        output.push_str("|---|");
        for _ in &self.columns {
            output.push_str("---:|");
        }
        output.push('\n');

        for row in &self.rows {
            output.push_str(&format!("| {} |", row.label));
            for cell in &row.cells {
                match cell {
                    Some(v) => output.push_str(&format!(" {:.2} |", v)),
                    None => output.push_str("  |"),
                }
            }
            output.push('\n');
        }

        output
    }
}
