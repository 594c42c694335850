// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Listener surface for formatters and reporters.
//!
//! Observers receive fine-grained notifications while a document runs, in
//! a fixed relative order per feature: [`uri`], [`feature`], optionally
//! [`background`], then per scenario [`scenario`] (or
//! [`scenario_outline`]/[`examples`]) followed by [`step`], [`step_match`]
//! and [`result`] for every step shown, then [`eof`] when the feature
//! ends and [`close`] once at the end of the run. [`result`] fires exactly
//! once per step announced via [`step`].
//!
//! [`background`]: Observer::background
//! [`close`]: Observer::close
//! [`eof`]: Observer::eof
//! [`examples`]: Observer::examples
//! [`feature`]: Observer::feature
//! [`result`]: Observer::result
//! [`scenario`]: Observer::scenario
//! [`scenario_outline`]: Observer::scenario_outline
//! [`step`]: Observer::step
//! [`step_match`]: Observer::step_match
//! [`uri`]: Observer::uri

use crate::{
    model::{Background, Examples, Feature, Scenario, ScenarioOutline, Step},
    step::MatchInfo,
};

/// Listener over the execution of parsed documents.
///
/// All methods default to no-ops, so implementors pick the notifications
/// they care about.
pub trait Observer {
    /// A document is about to run; `path` names its source.
    fn uri(&mut self, path: &str) {
        let _ = path;
    }

    /// A feature started.
    fn feature(&mut self, feature: &Feature) {
        let _ = feature;
    }

    /// The feature's background is about to apply to its scenarios.
    fn background(&mut self, background: &Background) {
        let _ = background;
    }

    /// A scenario started.
    fn scenario(&mut self, scenario: &Scenario) {
        let _ = scenario;
    }

    /// A scenario outline started expanding.
    fn scenario_outline(&mut self, outline: &ScenarioOutline) {
        let _ = outline;
    }

    /// An examples block of the current outline is about to run.
    fn examples(&mut self, examples: &Examples) {
        let _ = examples;
    }

    /// A step is about to be looked up, before matching.
    fn step(&mut self, step: &Step) {
        let _ = step;
    }

    /// Lookup outcome for the step last announced via [`Observer::step`].
    fn step_match(&mut self, info: &MatchInfo) {
        let _ = info;
    }

    /// The step finished; its status and timing are now final.
    fn result(&mut self, step: &Step) {
        let _ = step;
    }

    /// The current feature finished.
    fn eof(&mut self) {}

    /// The whole run finished.
    fn close(&mut self) {}
}

/// Aggregating listener invoked once per finished feature and once at the
/// very end of a run, for summary-style output.
pub trait Reporter {
    /// A feature finished; its status is final.
    fn feature(&mut self, feature: &Feature) {
        let _ = feature;
    }

    /// The whole run finished.
    fn end(&mut self) {}
}

/// Fan-out over registered [`Observer`]s, preserving registration order.
#[derive(Default)]
pub struct Observers {
    observers: Vec<Box<dyn Observer>>,
}

impl Observers {
    /// Creates an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an [`Observer`]; it will be notified after all earlier
    /// registrations.
    pub fn register(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Whether no [`Observer`] is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Notifies every registered [`Observer`] in order.
    pub fn each(&mut self, mut notify: impl FnMut(&mut dyn Observer)) {
        for observer in &mut self.observers {
            notify(observer.as_mut());
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.observers.len())
            .finish()
    }
}
