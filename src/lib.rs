// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Core of a [Gherkin]-based BDD runner: a hand-written state-machine
//! parser for feature documents, a scenario-outline expander, a
//! tag-expression evaluator and a sequential execution engine.
//!
//! The usual flow:
//! 1. [`parser::parse_feature()`] turns feature text into a [`Feature`]
//!    tree, localized via the [`keyword`] table.
//! 2. A [`TagExpression`] and an optional name filter pick what runs.
//! 3. A [`Runner`] walks the selected tree against a step [`Registry`]
//!    (such as [`step::Collection`]), notifying [`Observer`]s and
//!    [`Reporter`]s and rolling statuses up the tree.
//!
//! Output formatting, CLI handling and step discovery are deliberately
//! left to the caller; this crate stops at the [`Observer`]/[`Reporter`]
//! call contract.
//!
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

pub mod keyword;
pub mod model;
pub mod observer;
pub mod parser;
pub mod runner;
pub mod step;
pub mod tag;

pub use self::{
    keyword::{Keywords, KeywordTable},
    model::{
        Background, Examples, Feature, FileLocation, Row, Scenario,
        ScenarioKind, ScenarioOutline, Status, Step, StepType, Table, Tag,
    },
    observer::{Observer, Reporter},
    parser::{Parser, ParserError},
    runner::{Hooks, RunConfig, Runner},
    step::{Argument, Match, Registry, StepContext, StepFailure, StepFn},
    tag::{TagExprError, TagExpression},
};
