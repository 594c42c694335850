// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution status of document nodes.

use derive_more::Display;

/// Outcome of (not) executing a document node.
///
/// Features, scenarios and outlines only ever roll up to `Untested`,
/// `Skipped`, `Passed` or `Failed`; `Undefined` is a step-only status
/// meaning no implementation matched the step text.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Status {
    /// Not yet run (or aborted before being reached).
    #[display(fmt = "untested")]
    Untested,

    /// Deselected or skipped after an earlier failure.
    #[display(fmt = "skipped")]
    Skipped,

    /// Ran to completion successfully.
    #[display(fmt = "passed")]
    Passed,

    /// Ran and failed, or contains a failure.
    #[display(fmt = "failed")]
    Failed,

    /// No step implementation matched (steps only).
    #[display(fmt = "undefined")]
    Undefined,
}

impl Status {
    /// Whether this status is final for a run and may be memoized.
    ///
    /// `Untested` is never cached so that a node reached later in an
    /// aborted run can still be recomputed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Untested
    }
}
