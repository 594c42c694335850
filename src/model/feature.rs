// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Top-level document nodes: features, backgrounds and tags.

use std::{cmp::Ordering, hash::Hash};

use derive_more::Display;
use regex::Regex;

use super::{
    location::FileLocation,
    scenario::{Scenario, ScenarioOutline},
    status::Status,
    step::Step,
};
use crate::tag::TagExpression;

/// A `@name` label attached to a feature, scenario or outline.
///
/// Equality and hashing consider the name only; the line is diagnostic
/// metadata.
#[derive(Clone, Debug, Display)]
#[display(fmt = "@{}", name)]
pub struct Tag {
    /// Tag name, without the `@` sigil.
    pub name: String,
    /// Source line the tag was declared on.
    pub line: usize,
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Steps implicitly prefixed to every scenario of a feature.
///
/// A background is a template: scenarios materialize their own copies of
/// its steps (see [`Scenario::attach_background()`]), so nothing here is
/// mutated at run time.
#[derive(Clone, Debug)]
pub struct Background {
    /// Where the `Background:` line was written.
    pub location: FileLocation,
    /// Literal block keyword as written.
    pub keyword: String,
    /// Block name after the keyword.
    pub name: String,
    /// Template steps.
    pub steps: Vec<Step>,
}

impl Background {
    /// Creates a background with no steps.
    #[must_use]
    pub fn new(
        location: FileLocation,
        keyword: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            location,
            keyword: keyword.into(),
            name: name.into(),
            steps: Vec::new(),
        }
    }
}

/// A direct child of a [`Feature`]: plain scenario or templated outline.
#[derive(Clone, Debug)]
pub enum ScenarioKind {
    /// A concrete scenario written directly.
    Scenario(Scenario),
    /// A scenario outline expanded against its examples.
    Outline(ScenarioOutline),
}

impl ScenarioKind {
    /// The child's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scenario(s) => &s.name,
            Self::Outline(o) => &o.name,
        }
    }

    /// The child's source location.
    #[must_use]
    pub fn location(&self) -> &FileLocation {
        match self {
            Self::Scenario(s) => &s.location,
            Self::Outline(o) => &o.location,
        }
    }

    /// The child's declared tags.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        match self {
            Self::Scenario(s) => &s.tags,
            Self::Outline(o) => &o.tags,
        }
    }

    /// Whether the optional name filter selects this child.
    #[must_use]
    pub fn should_run_with_name(&self, name_filter: Option<&Regex>) -> bool {
        match self {
            Self::Scenario(s) => s.should_run_with_name(name_filter),
            Self::Outline(o) => o.should_run_with_name(name_filter),
        }
    }

    /// Memoizing status accessor (see [`Scenario::status()`]).
    pub fn status(&mut self, dry_run: bool) -> Status {
        match self {
            Self::Scenario(s) => s.status(dry_run),
            Self::Outline(o) => o.status(dry_run),
        }
    }

    /// Marks this child (and everything below it) as deselected.
    pub fn mark_skipped(&mut self) {
        match self {
            Self::Scenario(s) => s.mark_skipped(),
            Self::Outline(o) => o.mark_skipped(),
        }
    }

    /// Clears runtime state before a re-run.
    pub fn reset(&mut self) {
        match self {
            Self::Scenario(s) => s.reset(),
            Self::Outline(o) => o.reset(),
        }
    }
}

/// The top-level unit of a parsed feature document.
#[derive(Clone, Debug)]
pub struct Feature {
    /// Where the `Feature:` line was written.
    pub location: FileLocation,
    /// Literal block keyword as written.
    pub keyword: String,
    /// Feature name.
    pub name: String,
    /// Free-form description lines below the `Feature:` line.
    pub description: Vec<String>,
    /// Tags declared on the feature.
    pub tags: Vec<Tag>,
    /// Shared background template, if declared.
    pub background: Option<Background>,
    /// Scenarios and outlines, in declaration order.
    pub scenarios: Vec<ScenarioKind>,
    /// Language the document was written in.
    pub language: String,
    /// Selection verdict, set by tag-based selection.
    pub should_skip: bool,

    /// Memoized terminal status.
    status: Option<Status>,
}

impl Feature {
    /// Creates a feature with no children.
    #[must_use]
    pub fn new(
        location: FileLocation,
        keyword: impl Into<String>,
        name: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            location,
            keyword: keyword.into(),
            name: name.into(),
            description: Vec::new(),
            tags: Vec::new(),
            background: None,
            scenarios: Vec::new(),
            language: language.into(),
            should_skip: false,
            status: None,
        }
    }

    /// Whether the tag expression selects this feature.
    ///
    /// True when the feature's own tags match, or when any child would be
    /// selected through its effective tags (tag inheritance flows down, so
    /// a feature runs whenever something inside it would).
    pub fn should_run(&mut self, expr: &TagExpression) -> bool {
        if self.should_skip {
            return false;
        }
        if expr.is_empty() {
            return true;
        }
        let feature_tags = self.tags.clone();
        let own: Vec<String> =
            feature_tags.iter().map(|t| t.name.clone()).collect();
        if expr.check(own) {
            return true;
        }
        self.scenarios.iter_mut().any(|child| match child {
            ScenarioKind::Scenario(s) => {
                s.should_run_with_tags(&feature_tags, expr)
            }
            ScenarioKind::Outline(o) => {
                o.should_run_with_tags(&feature_tags, expr)
            }
        })
    }

    /// Rolls up child statuses, bottom-up and in declaration order.
    ///
    /// Any failed child fails the feature. An untested child after an
    /// earlier pass also fails it (the run was aborted mid-way); untested
    /// with nothing passed yet stays untested. All-skipped (including zero
    /// children) is skipped; otherwise passed.
    pub fn compute_status(&mut self, dry_run: bool) -> Status {
        let total = self.scenarios.len();
        let mut any_passed = false;
        let mut skipped = 0_usize;
        for child in &mut self.scenarios {
            match child.status(dry_run) {
                Status::Failed | Status::Undefined => return Status::Failed,
                Status::Untested => {
                    return if any_passed {
                        Status::Failed
                    } else {
                        Status::Untested
                    };
                }
                Status::Skipped => skipped += 1,
                Status::Passed => any_passed = true,
            }
        }
        if total == 0 || skipped == total {
            Status::Skipped
        } else {
            Status::Passed
        }
    }

    /// Memoizing status accessor: terminal results are cached until
    /// [`Feature::reset()`].
    pub fn status(&mut self, dry_run: bool) -> Status {
        if let Some(cached) = self.status {
            return cached;
        }
        let status = self.compute_status(dry_run);
        if status.is_terminal() {
            self.status = Some(status);
        }
        status
    }

    /// Memoized status, if one was cached.
    #[must_use]
    pub fn cached_status(&self) -> Option<Status> {
        self.status
    }

    /// Marks this feature and every child as deselected.
    pub fn mark_skipped(&mut self) {
        self.should_skip = true;
        for child in &mut self.scenarios {
            child.mark_skipped();
        }
        self.status = Some(Status::Skipped);
    }

    /// Clears all runtime state for a fresh run.
    pub fn reset(&mut self) {
        self.status = None;
        self.should_skip = false;
        if let Some(bg) = &mut self.background {
            for step in &mut bg.steps {
                step.reset();
            }
        }
        for child in &mut self.scenarios {
            child.reset();
        }
    }
}

// Features order by (keyword, name), ignoring location, so sorting a run
// set does not depend on filenames.
impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.keyword == other.keyword && self.name == other.name
    }
}

impl Eq for Feature {}

impl PartialOrd for Feature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Feature {
    fn cmp(&self, other: &Self) -> Ordering {
        self.keyword
            .cmp(&other.keyword)
            .then_with(|| self.name.cmp(&other.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::step::StepType;

    fn scenario_with_status(name: &str, status: Status) -> ScenarioKind {
        let mut scenario =
            Scenario::new(FileLocation::new("f.feature", 3), "Scenario", name);
        let mut step = Step::new(
            FileLocation::new("f.feature", 4),
            "Given",
            StepType::Given,
            "a step",
        );
        step.status = status;
        scenario.steps.push(step);
        ScenarioKind::Scenario(scenario)
    }

    fn feature_with(children: Vec<ScenarioKind>) -> Feature {
        let mut feature = Feature::new(
            FileLocation::new("f.feature", 1),
            "Feature",
            "F",
            "en",
        );
        feature.scenarios = children;
        feature
    }

    #[test]
    fn failed_child_fails_the_feature() {
        let mut feature = feature_with(vec![
            scenario_with_status("a", Status::Passed),
            scenario_with_status("b", Status::Failed),
        ]);
        assert_eq!(feature.status(false), Status::Failed);
    }

    #[test]
    fn untested_after_a_pass_reads_as_aborted() {
        let mut feature = feature_with(vec![
            scenario_with_status("a", Status::Passed),
            scenario_with_status("b", Status::Untested),
        ]);
        assert_eq!(feature.status(false), Status::Failed);
    }

    #[test]
    fn untested_with_no_pass_stays_untested() {
        let mut feature = feature_with(vec![
            scenario_with_status("a", Status::Skipped),
            scenario_with_status("b", Status::Untested),
        ]);
        assert_eq!(feature.status(false), Status::Untested);
        // Untested is never cached.
        assert_eq!(feature.cached_status(), None);
    }

    #[test]
    fn all_skipped_and_empty_features_are_skipped() {
        let mut feature = feature_with(vec![
            scenario_with_status("a", Status::Skipped),
            scenario_with_status("b", Status::Skipped),
        ]);
        assert_eq!(feature.status(false), Status::Skipped);

        let mut empty = feature_with(Vec::new());
        assert_eq!(empty.status(false), Status::Skipped);
    }

    #[test]
    fn terminal_status_is_cached_idempotently() {
        let mut feature = feature_with(vec![
            scenario_with_status("a", Status::Passed),
        ]);
        let first = feature.status(false);
        assert_eq!(first, Status::Passed);
        assert_eq!(feature.cached_status(), Some(Status::Passed));

        // Second call returns the cache without rescanning children.
        if let ScenarioKind::Scenario(s) = &mut feature.scenarios[0] {
            s.steps[0].status = Status::Failed;
        }
        assert_eq!(feature.status(false), first);

        feature.reset();
        assert_eq!(feature.cached_status(), None);
    }

    #[test]
    fn tag_selection_considers_children() {
        let expr = TagExpression::new(&["@wanted"]).unwrap();
        let mut feature = feature_with(vec![
            scenario_with_status("a", Status::Untested),
        ]);
        assert!(!feature.should_run(&expr));

        if let ScenarioKind::Scenario(s) = &mut feature.scenarios[0] {
            s.tags.push(Tag { name: "wanted".into(), line: 2 });
        }
        assert!(feature.should_run(&expr));
    }

    #[test]
    fn tags_compare_by_name_only() {
        let a = Tag { name: "wip".into(), line: 1 };
        let b = Tag { name: "wip".into(), line: 99 };
        assert_eq!(a, b);
    }

    #[test]
    fn features_order_by_keyword_then_name() {
        let a = Feature::new(
            FileLocation::new("zzz.feature", 9),
            "Feature",
            "Alpha",
            "en",
        );
        let b = Feature::new(
            FileLocation::new("aaa.feature", 1),
            "Feature",
            "Beta",
            "en",
        );
        assert!(a < b);
    }
}
