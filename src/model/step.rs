// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Steps: the atomic unit of execution.

use std::time::Duration;

use derive_more::Display;

use super::{location::FileLocation, status::Status, table::Table};

/// Semantic type of a [`Step`].
///
/// `And`/`But` never appear here: during parsing they resolve to the type
/// of the most recent `Given`/`When`/`Then`.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum StepType {
    /// Precondition step.
    #[display(fmt = "given")]
    Given,
    /// Action step.
    #[display(fmt = "when")]
    When,
    /// Assertion step.
    #[display(fmt = "then")]
    Then,
}

/// One `Given`/`When`/`Then`/`And`/`But` line of a scenario.
///
/// `keyword` keeps the literal localized text as written (including `And`
/// and `But`), so formatters can echo the source exactly; `step_type` is
/// the resolved semantic type.
#[derive(Clone, Debug)]
pub struct Step {
    /// Where this step was written.
    pub location: FileLocation,
    /// Literal keyword text as written in the source.
    pub keyword: String,
    /// Resolved semantic type.
    pub step_type: StepType,
    /// Step text after the keyword.
    pub name: String,
    /// Docstring argument, when a triple-quoted block follows the step.
    pub text: Option<String>,
    /// Table argument, when `|`-rows follow the step.
    pub table: Option<Table>,

    /// Outcome of the last run.
    pub status: Status,
    /// How long the last execution took.
    pub duration: Duration,
    /// Failure rendering from the last run, if any.
    pub error_message: Option<String>,
}

impl Step {
    /// Creates an untested step without arguments.
    #[must_use]
    pub fn new(
        location: FileLocation,
        keyword: impl Into<String>,
        step_type: StepType,
        name: impl Into<String>,
    ) -> Self {
        Self {
            location,
            keyword: keyword.into(),
            step_type,
            name: name.into(),
            text: None,
            table: None,
            status: Status::Untested,
            duration: Duration::ZERO,
            error_message: None,
        }
    }

    /// Clears all runtime fields for a fresh run.
    pub fn reset(&mut self) {
        self.status = Status::Untested;
        self.duration = Duration::ZERO;
        self.error_message = None;
    }

    /// A value copy with runtime fields cleared, for materializing
    /// per-scenario background steps and expanded outline steps.
    #[must_use]
    pub fn fresh_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.reset();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_runtime_fields() {
        let mut step = Step::new(
            FileLocation::new("f.feature", 3),
            "Given",
            StepType::Given,
            "a step",
        );
        step.status = Status::Failed;
        step.duration = Duration::from_millis(5);
        step.error_message = Some("boom".into());

        step.reset();
        assert_eq!(step.status, Status::Untested);
        assert_eq!(step.duration, Duration::ZERO);
        assert!(step.error_message.is_none());
    }

    #[test]
    fn fresh_copy_is_independent() {
        let mut step = Step::new(
            FileLocation::new("f.feature", 3),
            "When",
            StepType::When,
            "something happens",
        );
        step.status = Status::Passed;
        let copy = step.fresh_copy();
        assert_eq!(copy.status, Status::Untested);
        assert_eq!(step.status, Status::Passed);
        assert_eq!(copy.name, step.name);
    }
}
