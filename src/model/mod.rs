// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The document tree produced by parsing a feature file, plus its derived
//! runtime state (status rollups, background materialization, outline
//! expansion).

pub mod feature;
pub mod location;
pub mod scenario;
pub mod status;
pub mod step;
pub mod table;

pub use self::{
    feature::{Background, Feature, ScenarioKind, Tag},
    location::FileLocation,
    scenario::{Examples, Scenario, ScenarioOutline, DEFAULT_ANNOTATION_SCHEMA},
    status::Status,
    step::{Step, StepType},
    table::{Row, Table, UnknownColumnError},
};
