//! Loading intensity traces exported from Fiji.
//!
//! Fiji's "Measure" export is a comma-separated table with a header row and one
//! row per frame. Region-of-interest columns are named `Mean1`, `Mean2`, ...;
//! they are exposed here as `Region1`, `Region2`, ...

use std::{fs, path::Path, str::FromStr};

use crate::error::{Error, Result};

/// A table of named numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Trace {
    /// Parses comma-separated text with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the header is missing, a row has the wrong
    /// number of cells, or a cell is not a number.
    ///
    /// # Example
    ///
    /// ```
    /// use cardio_bpm::Trace;
    ///
    /// let trace = Trace::parse(" ,Mean1,Mean2\n1,10.5,3.0\n2,11.0,2.5\n")?;
    /// assert_eq!(trace.region_columns(), vec!["Region1", "Region2"]);
    /// assert_eq!(trace.column("Region1"), Some(&[10.5, 11.0][..]));
    /// # Ok::<(), cardio_bpm::Error>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let (_, header) = lines.next().ok_or_else(|| Error::Parse {
            line: 1,
            reason: "missing header row".to_string(),
        })?;

        let headers = header
            .split(',')
            .map(|cell| cell.trim().trim_matches('"').replace("Mean", "Region"))
            .collect::<Vec<_>>();
        let mut columns = vec![Vec::new(); headers.len()];

        for (line, row) in lines {
            let cells = row.split(',').collect::<Vec<_>>();
            if cells.len() != headers.len() {
                return Err(Error::Parse {
                    line,
                    reason: format!("expected {} cells, found {}", headers.len(), cells.len()),
                });
            }
            for (column, cell) in columns.iter_mut().zip(cells) {
                let cell = cell.trim().trim_matches('"');
                let value = cell.parse::<f64>().map_err(|e| Error::Parse {
                    line,
                    reason: format!("{cell:?} is not a number: {e}"),
                })?;
                column.push(value);
            }
        }

        tracing::debug!(
            columns = headers.len(),
            rows = columns.first().map_or(0, Vec::len),
            "Parsed trace table"
        );

        Ok(Self { headers, columns })
    }

    /// Reads and parses a trace file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        tracing::info!("Loaded trace from {}", path.display());
        Self::parse(&text)
    }

    /// Column names, with `Mean` already renamed to `Region`.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Names of the region-of-interest columns, in file order.
    pub fn region_columns(&self) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|name| name.contains("Region"))
            .map(String::as_str)
            .collect()
    }

    /// Samples of the named column.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.headers
            .iter()
            .position(|header| header == name)
            .map(|index| self.columns[index].as_slice())
    }

    /// Number of rows (frames).
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for Trace {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_renames_mean_columns() {
        let trace: Trace = "Frame,Mean1,Area\n1,0.5,10\n2,0.7,10\n".parse().unwrap();
        assert_eq!(trace.headers(), &["Frame", "Region1", "Area"]);
        assert_eq!(trace.region_columns(), vec!["Region1"]);
        assert_eq!(trace.column("Region1"), Some(&[0.5, 0.7][..]));
        assert_eq!(trace.column("Mean1"), None);
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn test_parse_skips_blank_lines_and_quotes() {
        let trace = Trace::parse("\"Mean1\"\n\n1.5\n  \n\"2.5\"\n").unwrap();
        assert_eq!(trace.column("Region1"), Some(&[1.5, 2.5][..]));
    }

    #[test]
    fn test_parse_reports_ragged_row() {
        let result = Trace::parse("A,B\n1,2\n3\n");
        assert!(matches!(result, Err(Error::Parse { line: 3, .. })));
    }

    #[test]
    fn test_parse_reports_bad_number() {
        let result = Trace::parse("A\n1\nabc\n");
        assert!(matches!(result, Err(Error::Parse { line: 3, .. })));
        let result = Trace::parse("A,B\n1,\n");
        assert!(matches!(result, Err(Error::Parse { line: 2, .. })));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(matches!(Trace::parse("\n\n"), Err(Error::Parse { line: 1, .. })));
    }

    #[test]
    fn test_header_only_is_empty() {
        let trace = Trace::parse("Mean1,Mean2\n").unwrap();
        assert!(trace.is_empty());
        assert_eq!(trace.column("Region2"), Some(&[][..]));
    }

    #[test]
    fn test_missing_file() {
        let result = Trace::from_path("/nonexistent/trace.csv");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
