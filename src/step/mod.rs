// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step implementations and their matching against parsed steps.

pub mod collection;

use derive_more::{Display, Error};

use crate::model::{Row, Step, StepType};

#[doc(inline)]
pub use self::collection::Collection;

/// Failure reported by a step implementation.
///
/// Both variants are normal, expected outcomes recorded on the [`Step`],
/// never propagated to abort a run.
#[derive(Clone, Debug, Display, Error)]
pub enum StepFailure {
    /// A checked expectation did not hold.
    #[display(fmt = "Assertion Failed: {}", _0)]
    Assertion(#[error(not(source))] String),

    /// The implementation reported any other error.
    #[display(fmt = "{}", _0)]
    Error(#[error(not(source))] String),
}

/// One captured piece of a step's name, bound by the matching pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Argument {
    /// Character offset where the capture starts in the step's name.
    pub start: usize,
    /// Character offset just past the capture's end.
    pub end: usize,
    /// Verbatim matched substring.
    pub original: String,
    /// The argument's value handed to the implementation. Matching does no
    /// type conversion, so this equals [`Argument::original`]; kept
    /// separate so custom [`Registry`]s can convert.
    pub value: String,
    /// Name of the capture group, when the pattern names it.
    pub name: Option<String>,
}

/// Everything a step implementation can see while running.
#[derive(Clone, Debug)]
pub struct StepContext {
    /// The document step being executed (arguments included).
    pub step: Step,

    /// Captures of the step's name, in pattern order; unmatched optional
    /// groups come through as empty arguments.
    pub arguments: Vec<Argument>,

    /// Example row of the generated scenario currently running, if the
    /// step runs inside an expanded scenario outline.
    pub active_row: Option<Row>,
}

/// Alias for a [`fn`] implementing a step.
pub type StepFn<W> = fn(&mut W, &StepContext) -> Result<(), StepFailure>;

/// A successful lookup: the implementation to call plus the captures that
/// bound it to the step's name.
pub struct Match<W> {
    /// The implementation to run.
    pub func: StepFn<W>,

    /// Captures of the step's name, in pattern order.
    pub arguments: Vec<Argument>,

    /// Pattern the implementation was registered under; plays the role of
    /// the implementation's source location in diagnostics.
    pub pattern: String,
}

impl<W> Match<W> {
    /// Runs the implementation against `world`.
    ///
    /// # Errors
    ///
    /// Whatever [`StepFailure`] the implementation reports.
    pub fn run(
        &self,
        world: &mut W,
        step: &Step,
        active_row: Option<&Row>,
    ) -> Result<(), StepFailure> {
        let context = StepContext {
            step: step.clone(),
            arguments: self.arguments.clone(),
            active_row: active_row.cloned(),
        };
        (self.func)(world, &context)
    }

    /// The observer-facing description of this match.
    #[must_use]
    pub fn info(&self) -> MatchInfo {
        MatchInfo {
            pattern: Some(self.pattern.clone()),
            arguments: self.arguments.clone(),
        }
    }
}

/// What observers learn about a lookup, found or not.
///
/// Kept free of the world type so observers need no generics.
#[derive(Clone, Debug)]
pub struct MatchInfo {
    /// Pattern of the matched implementation; [`None`] when the step is
    /// undefined.
    pub pattern: Option<String>,

    /// Captures of the step's name, in pattern order; empty for an
    /// undefined step.
    pub arguments: Vec<Argument>,
}

impl MatchInfo {
    /// The description of a failed lookup.
    #[must_use]
    pub fn no_match() -> Self {
        Self { pattern: None, arguments: Vec::new() }
    }

    /// Whether an implementation was found.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.pattern.is_some()
    }
}

/// Source of step implementations consulted once per executed step.
///
/// Returning [`None`] makes the step undefined, which is an outcome, not
/// an error.
pub trait Registry<W> {
    /// Looks up the implementation for a step of the given type and name.
    fn find(&self, ty: StepType, name: &str) -> Option<Match<W>>;
}
