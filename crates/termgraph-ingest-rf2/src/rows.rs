//! Tab-delimited row reading.

use std::io::BufRead;
use termgraph_store::{ComponentMeta, EffectiveTime, GraphStore, Partition};
use uuid::Uuid;

use crate::{LoadError, RowError};

/// Column names from a file's header row.
#[derive(Debug, Clone)]
pub struct Header {
    names: Vec<String>,
}

impl Header {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn column(&self, index: usize) -> &str {
        self.names.get(index).map(String::as_str).unwrap_or("?")
    }
}

/// One data row. `line` is the physical line number; the header is line 1.
#[derive(Debug, Clone)]
pub struct Row<'h> {
    pub line: usize,
    header: &'h Header,
    fields: Vec<String>,
}

impl<'h> Row<'h> {
    pub fn str(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    pub(crate) fn invalid(&self, index: usize, message: impl Into<String>) -> RowError {
        RowError::InvalidField {
            column: self.header.column(index).to_string(),
            value: self.str(index).to_string(),
            message: message.into(),
        }
    }

    pub fn u64(&self, index: usize) -> Result<u64, RowError> {
        self.str(index)
            .parse()
            .map_err(|_| self.invalid(index, "expected a numeric identifier"))
    }

    /// Identifier column checked under the store's identifier policy.
    pub fn sctid(&self, store: &GraphStore, index: usize, partition: Partition) -> Result<u64, RowError> {
        Ok(store.resolve_identifier(self.str(index), partition)?)
    }

    pub fn uuid(&self, index: usize) -> Result<Uuid, RowError> {
        Uuid::parse_str(self.str(index)).map_err(|e| self.invalid(index, format!("invalid UUID: {e}")))
    }

    pub fn active(&self, index: usize) -> Result<bool, RowError> {
        match self.str(index) {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(self.invalid(index, "active must be 0 or 1")),
        }
    }

    pub fn u32(&self, index: usize) -> Result<u32, RowError> {
        self.str(index)
            .parse()
            .map_err(|_| self.invalid(index, "expected a non-negative integer"))
    }

    /// The common `effectiveTime, active, moduleId` columns at 1..=3.
    pub fn meta(&self) -> Result<ComponentMeta, RowError> {
        let effective_time =
            EffectiveTime::parse_column(self.str(1)).map_err(|e| self.invalid(1, e.to_string()))?;
        Ok(ComponentMeta::new(effective_time, self.active(2)?, self.u64(3)?))
    }

    /// Trailing columns from `from` on, paired with their header names.
    pub fn named_fields(&self, from: usize) -> Vec<(String, String)> {
        (from..self.fields.len())
            .map(|i| (self.header.column(i).to_string(), self.fields[i].clone()))
            .collect()
    }
}

/// Read every data row of an RF2 stream, handing each to `apply`.
///
/// The first row failure stops reading and is returned with its line number.
pub fn read_rows<R, F>(file: &str, reader: R, min_columns: usize, mut apply: F) -> Result<usize, LoadError>
where
    R: BufRead,
    F: FnMut(&Row<'_>) -> Result<(), RowError>,
{
    let io = |source| LoadError::Io {
        file: file.to_string(),
        source,
    };
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => Header {
            names: split(&line.map_err(io)?),
        },
        None => {
            return Err(LoadError::MissingHeader {
                file: file.to_string(),
            })
        }
    };

    let mut count = 0;
    for (index, line) in lines.enumerate() {
        let line_no = index + 2;
        let line = line.map_err(io)?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split(&line);
        let wrap = |source| LoadError::Line {
            file: file.to_string(),
            line: line_no,
            source,
        };
        if fields.len() < min_columns {
            return Err(wrap(RowError::MissingColumns {
                expected: min_columns,
                found: fields.len(),
            }));
        }
        let row = Row {
            line: line_no,
            header: &header,
            fields,
        };
        apply(&row).map_err(wrap)?;
        count += 1;
    }
    Ok(count)
}

fn split(line: &str) -> Vec<String> {
    line.trim_end_matches(['\r', '\n'])
        .split('\t')
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_numbered_from_the_header() {
        let text = "id\teffectiveTime\tactive\tmoduleId\n100005\t20200101\t1\t900000000000207008\n\n200009\t\t0\t900000000000207008\r\n";
        let mut seen = Vec::new();
        let count = read_rows("c.txt", text.as_bytes(), 4, |row| {
            seen.push((row.line, row.u64(0)?, row.meta()?));
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen[0].0, 2);
        assert_eq!(seen[1].0, 4);
        assert_eq!(seen[1].2.effective_time, None);
        assert!(!seen[1].2.active);
    }

    #[test]
    fn short_rows_fail_with_line_number() {
        let text = "id\teffectiveTime\tactive\tmoduleId\n100005\t20200101\n";
        let err = read_rows("c.txt", text.as_bytes(), 4, |_| Ok(())).unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(err.to_string().starts_with("c.txt: error on line 2"));
    }

    #[test]
    fn field_errors_name_the_column() {
        let text = "id\teffectiveTime\tactive\tmoduleId\n100005\t20200101\tyes\t1\n";
        let err = read_rows("c.txt", text.as_bytes(), 4, |row| row.meta().map(|_| ())).unwrap_err();
        match err {
            LoadError::Line {
                source: RowError::InvalidField { column, .. },
                ..
            } => assert_eq!(column, "active"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(
            read_rows("c.txt", "".as_bytes(), 4, |_| Ok(())),
            Err(LoadError::MissingHeader { .. })
        ));
    }
}
