// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Source position of a parsed element.

use std::cmp::Ordering;

/// Filename plus optional line number, stamped onto every parsed node.
///
/// Ordering is lexicographic on filename, then numeric on line (a missing
/// line sorts first). Comparing against a plain `str` matches on the
/// filename alone, so locations can stand in for display strings and map
/// keys.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FileLocation {
    /// Name of the source document.
    pub filename: String,
    /// 1-based line number, when known.
    pub line: Option<usize>,
}

impl FileLocation {
    /// Creates a location with a known line.
    #[must_use]
    pub fn new(filename: impl Into<String>, line: usize) -> Self {
        Self { filename: filename.into(), line: Some(line) }
    }

    /// Creates a location naming only the document.
    #[must_use]
    pub fn of_file(filename: impl Into<String>) -> Self {
        Self { filename: filename.into(), line: None }
    }
}

impl PartialEq<str> for FileLocation {
    fn eq(&self, other: &str) -> bool {
        self.filename == other
    }
}

impl PartialEq<&str> for FileLocation {
    fn eq(&self, other: &&str) -> bool {
        self.filename == *other
    }
}

impl PartialOrd for FileLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.filename
            .cmp(&other.filename)
            .then_with(|| self.line.cmp(&other.line))
    }
}

impl std::fmt::Display for FileLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.filename),
            None => f.write_str(&self.filename),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_filename_then_line() {
        let a = FileLocation::new("a.feature", 10);
        let b = FileLocation::new("b.feature", 1);
        let a_early = FileLocation::new("a.feature", 2);
        let a_no_line = FileLocation::of_file("a.feature");

        assert!(a < b);
        assert!(a_early < a);
        assert!(a_no_line < a_early);
    }

    #[test]
    fn compares_equal_to_plain_filename() {
        let loc = FileLocation::of_file("x.feature");
        assert_eq!(loc, "x.feature");
        let with_line = FileLocation::new("x.feature", 3);
        assert_eq!(with_line, "x.feature");
        assert_ne!(with_line, FileLocation::of_file("x.feature"));
    }

    #[test]
    fn display_includes_line_when_known() {
        assert_eq!(FileLocation::new("f.feature", 7).to_string(), "f.feature:7");
        assert_eq!(FileLocation::of_file("f.feature").to_string(), "f.feature");
    }
}
