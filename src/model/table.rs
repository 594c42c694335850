// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tables attached to steps and `Examples` blocks.

use derive_more::{Display, Error};

/// Error of addressing a [`Table`] column by a name it doesn't have.
#[derive(Clone, Debug, Display, Error)]
#[display(fmt = "Table has no column named {:?}", column)]
pub struct UnknownColumnError {
    /// The missing column name.
    pub column: String,
}

/// One body row of a [`Table`].
///
/// `index` and `id` stay unset until scenario-outline expansion assigns
/// them (`id` follows the `"{example.index}.{row.index}"` schema).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    /// Cell values, one per table heading.
    pub cells: Vec<String>,
    /// Source line this row was written on.
    pub line: usize,
    /// 1-based position within its `Examples` block.
    pub index: Option<usize>,
    /// Unique row identifier, assigned during expansion.
    pub id: Option<String>,
}

impl Row {
    /// Creates a row with unassigned expansion metadata.
    #[must_use]
    pub fn new(cells: Vec<String>, line: usize) -> Self {
        Self { cells, line, index: None, id: None }
    }

    /// Cell at the given 0-based position.
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }
}

/// Headings plus body rows.
///
/// Invariant: every row holds exactly one cell per heading. All column
/// operations below preserve it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Table {
    /// Column names, in declaration order.
    pub headings: Vec<String>,
    /// Body rows, in declaration order.
    pub rows: Vec<Row>,
    /// Source line of the header row, when parsed from text.
    pub line: Option<usize>,
}

impl Table {
    /// Creates a table with the given headings and no rows.
    #[must_use]
    pub fn new(headings: Vec<String>) -> Self {
        Self { headings, rows: Vec::new(), line: None }
    }

    /// 0-based position of the named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headings.iter().position(|h| h == name)
    }

    /// Cell of `row` under the named column.
    #[must_use]
    pub fn value<'a>(&self, row: &'a Row, column: &str) -> Option<&'a str> {
        // Rows are indexed through their table so that headings stay in one
        // place instead of being shared into every row.
        self.column_index(column)
            .and_then(|idx| row.cells.get(idx).map(String::as_str))
    }

    /// Appends a column, filling every existing row with `default`.
    pub fn add_column(&mut self, name: impl Into<String>, default: &str) -> usize {
        self.headings.push(name.into());
        for row in &mut self.rows {
            row.cells.push(default.to_string());
        }
        self.headings.len() - 1
    }

    /// Removes the named column from the headings and from every row.
    ///
    /// # Errors
    ///
    /// If no such column exists.
    pub fn remove_column(&mut self, name: &str) -> Result<(), UnknownColumnError> {
        let idx = self.require_column(name)?;
        let _ = self.headings.remove(idx);
        for row in &mut self.rows {
            let _ = row.cells.remove(idx);
        }
        Ok(())
    }

    /// Position of the named column, failing when absent.
    ///
    /// # Errors
    ///
    /// If no such column exists.
    pub fn require_column(&self, name: &str) -> Result<usize, UnknownColumnError> {
        self.column_index(name)
            .ok_or_else(|| UnknownColumnError { column: name.to_string() })
    }

    /// Position of the named column, appending it (with empty cells) when
    /// absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        self.column_index(name)
            .unwrap_or_else(|| self.add_column(name, ""))
    }

    /// Appends a body row.
    ///
    /// Callers must supply exactly one cell per heading; the parser enforces
    /// this with a proper diagnostic before calling.
    pub fn push_row(&mut self, row: Row) {
        debug_assert_eq!(row.cells.len(), self.headings.len());
        self.rows.push(row);
    }
}
