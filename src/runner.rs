// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution and selection engine.
//!
//! Strictly sequential: features, scenarios and steps run depth-first in
//! declaration order, one at a time. The only cancellation mechanism is a
//! cooperative abort flag checked between features and scenarios, never
//! inside a step.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use regex::Regex;
use smart_default::SmartDefault;
use tracing::debug;

use crate::{
    model::{
        Background, Feature, Row, Scenario, ScenarioKind, ScenarioOutline,
        Status, Step, Tag, DEFAULT_ANNOTATION_SCHEMA,
    },
    observer::{Observer, Observers, Reporter},
    step::{Match, MatchInfo, Registry},
    tag::TagExpression,
};

/// Selection and behavior switches for one run.
#[derive(Debug, SmartDefault)]
pub struct RunConfig {
    /// Tag expression selecting which features and scenarios run.
    pub tags: TagExpression,

    /// Scenario name filter; unselected scenarios are marked skipped.
    pub name_filter: Option<Regex>,

    /// Match steps against implementations without executing them, to
    /// surface undefined steps.
    pub dry_run: bool,

    /// Stop the whole run at the first failing scenario.
    pub stop_on_failure: bool,

    /// Naming schema applied to scenarios generated from outlines.
    #[default(DEFAULT_ANNOTATION_SCHEMA.to_string())]
    pub annotation_schema: String,
}

/// User-supplied lifecycle callbacks.
///
/// All methods default to no-ops. Under [`RunConfig::dry_run`] every hook
/// is skipped except [`before_all`]/[`after_all`].
///
/// [`after_all`]: Hooks::after_all
/// [`before_all`]: Hooks::before_all
pub trait Hooks<W> {
    /// Runs once before anything else.
    fn before_all(&mut self, world: &mut W) {
        let _ = world;
    }

    /// Runs once after everything else.
    fn after_all(&mut self, world: &mut W) {
        let _ = world;
    }

    /// Runs before each selected feature.
    fn before_feature(&mut self, world: &mut W, feature: &Feature) {
        let _ = (world, feature);
    }

    /// Runs after each selected feature.
    fn after_feature(&mut self, world: &mut W, feature: &Feature) {
        let _ = (world, feature);
    }

    /// Runs before each selected scenario.
    fn before_scenario(&mut self, world: &mut W, scenario: &Scenario) {
        let _ = (world, scenario);
    }

    /// Runs after each selected scenario.
    fn after_scenario(&mut self, world: &mut W, scenario: &Scenario) {
        let _ = (world, scenario);
    }

    /// Runs before each executed step.
    fn before_step(&mut self, world: &mut W, step: &Step) {
        let _ = (world, step);
    }

    /// Runs after each executed step.
    fn after_step(&mut self, world: &mut W, step: &Step) {
        let _ = (world, step);
    }

    /// Runs once per tag when entering the tagged feature or scenario.
    fn before_tag(&mut self, world: &mut W, tag: &Tag) {
        let _ = (world, tag);
    }

    /// Runs once per tag when leaving the tagged feature or scenario.
    fn after_tag(&mut self, world: &mut W, tag: &Tag) {
        let _ = (world, tag);
    }
}

/// The do-nothing [`Hooks`] implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl<W> Hooks<W> for NoopHooks {}

/// How the step loop treats the remaining steps of a scenario.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    /// Execute steps normally.
    Run,
    /// An earlier step failed; mark the rest skipped.
    SkipRemaining,
    /// Dry run: match but never execute.
    Dry,
}

/// Sequential executor of parsed [`Feature`]s against a step [`Registry`].
pub struct Runner<W> {
    config: RunConfig,
    observers: Observers,
    reporters: Vec<Box<dyn Reporter>>,
    hooks: Box<dyn Hooks<W>>,
    abort: Arc<AtomicBool>,
    undefined: Vec<Step>,
    active_row: Option<Row>,
    failed: bool,
}

impl<W> Runner<W> {
    /// Creates a runner with no observers, reporters or hooks.
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            observers: Observers::new(),
            reporters: Vec::new(),
            hooks: Box::new(NoopHooks),
            abort: Arc::new(AtomicBool::new(false)),
            undefined: Vec::new(),
            active_row: None,
            failed: false,
        }
    }

    /// Registers an [`Observer`] notified during execution.
    pub fn register_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.register(observer);
    }

    /// Registers a [`Reporter`] notified per finished feature and at the
    /// end of the run.
    pub fn register_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    /// Replaces the lifecycle [`Hooks`].
    pub fn set_hooks(&mut self, hooks: Box<dyn Hooks<W>>) {
        self.hooks = hooks;
    }

    /// Handle for requesting cooperative cancellation: once set, no new
    /// feature or scenario starts.
    #[must_use]
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Steps that found no implementation during the last run, in the
    /// order they were discovered.
    #[must_use]
    pub fn undefined_steps(&self) -> &[Step] {
        &self.undefined
    }

    /// Runs every feature in order and returns whether anything failed.
    ///
    /// Features deselected by tags are marked skipped without running.
    /// [`Reporter::feature()`] fires once per feature (skipped included),
    /// [`Observer::close()`] and [`Reporter::end()`] once at the end.
    pub fn run(
        &mut self,
        registry: &dyn Registry<W>,
        world: &mut W,
        features: &mut [Feature],
    ) -> bool {
        self.failed = false;
        self.undefined.clear();
        self.hooks.before_all(world);
        for feature in features.iter_mut() {
            if self.abort.load(Ordering::Relaxed) {
                break;
            }
            self.run_feature(registry, world, feature);
            for reporter in &mut self.reporters {
                reporter.feature(feature);
            }
            if self.failed && self.config.stop_on_failure {
                break;
            }
        }
        self.hooks.after_all(world);
        self.observers.each(|o| o.close());
        for reporter in &mut self.reporters {
            reporter.end();
        }
        debug!(
            failed = self.failed,
            undefined = self.undefined.len(),
            "run finished",
        );
        self.failed
    }

    fn run_feature(
        &mut self,
        registry: &dyn Registry<W>,
        world: &mut W,
        feature: &mut Feature,
    ) {
        if !feature.should_run(&self.config.tags) {
            feature.mark_skipped();
            return;
        }
        let dry = self.config.dry_run;
        self.observers.each(|o| o.uri(&feature.location.filename));
        self.observers.each(|o| o.feature(feature));
        if !dry {
            self.hooks.before_feature(world, feature);
            for tag in &feature.tags {
                self.hooks.before_tag(world, tag);
            }
        }
        if let Some(background) = &feature.background {
            self.observers.each(|o| o.background(background));
        }

        // Scenarios borrow the feature mutably below, so the shared parts
        // they need are cloned out first.
        let background = feature.background.clone();
        let feature_tags = feature.tags.clone();
        for child in &mut feature.scenarios {
            if self.abort.load(Ordering::Relaxed) {
                break;
            }
            if !child.should_run_with_name(self.config.name_filter.as_ref()) {
                child.mark_skipped();
                continue;
            }
            let child_failed = match child {
                ScenarioKind::Scenario(scenario) => self.run_scenario(
                    registry,
                    world,
                    scenario,
                    &feature_tags,
                    background.as_ref(),
                ),
                ScenarioKind::Outline(outline) => self.run_outline(
                    registry,
                    world,
                    outline,
                    &feature_tags,
                    background.as_ref(),
                ),
            };
            if child_failed {
                self.failed = true;
                if self.config.stop_on_failure {
                    break;
                }
            }
        }
        if !dry {
            for tag in &feature.tags {
                self.hooks.after_tag(world, tag);
            }
            self.hooks.after_feature(world, feature);
        }
        let status = feature.status(dry);
        debug!(feature = feature.name.as_str(), %status, "feature finished");
        self.observers.each(|o| o.eof());
    }

    /// Runs one concrete scenario and returns whether it failed.
    fn run_scenario(
        &mut self,
        registry: &dyn Registry<W>,
        world: &mut W,
        scenario: &mut Scenario,
        feature_tags: &[Tag],
        background: Option<&Background>,
    ) -> bool {
        if !scenario.should_run(
            feature_tags,
            &self.config.tags,
            self.config.name_filter.as_ref(),
        ) {
            scenario.mark_skipped();
            return false;
        }
        scenario.attach_background(background);

        let dry = self.config.dry_run;
        self.observers.each(|o| o.scenario(scenario));
        if !dry {
            self.hooks.before_scenario(world, scenario);
            for tag in &scenario.tags {
                self.hooks.before_tag(world, tag);
            }
        }

        let mut mode = if dry { Mode::Dry } else { Mode::Run };
        let mut failed = false;
        for step in scenario.all_steps_mut() {
            self.observers.each(|o| o.step(step));
            let found = registry.find(step.step_type, &step.name);
            let info = found.as_ref().map_or_else(MatchInfo::no_match, Match::info);
            self.observers.each(|o| o.step_match(&info));
            match mode {
                Mode::Run => match found {
                    Some(implementation) => {
                        self.hooks.before_step(world, step);
                        let started = Instant::now();
                        let outcome = implementation.run(
                            world,
                            step,
                            self.active_row.as_ref(),
                        );
                        step.duration = started.elapsed();
                        match outcome {
                            Ok(()) => step.status = Status::Passed,
                            Err(failure) => {
                                step.status = Status::Failed;
                                step.error_message = Some(failure.to_string());
                                failed = true;
                                mode = Mode::SkipRemaining;
                            }
                        }
                        self.hooks.after_step(world, step);
                    }
                    None => {
                        step.status = Status::Undefined;
                        self.undefined.push(step.clone());
                        failed = true;
                        mode = Mode::SkipRemaining;
                    }
                },
                Mode::SkipRemaining | Mode::Dry => {
                    // Not executed, but the lookup above still surfaces
                    // every undefined step in the document.
                    step.status = if mode == Mode::Dry {
                        Status::Untested
                    } else {
                        Status::Skipped
                    };
                    if found.is_none() {
                        step.status = Status::Undefined;
                        self.undefined.push(step.clone());
                    }
                }
            }
            self.observers.each(|o| o.result(step));
        }

        if !dry {
            for tag in &scenario.tags {
                self.hooks.after_tag(world, tag);
            }
            self.hooks.after_scenario(world, scenario);
        }
        let _ = scenario.status(dry);
        failed
    }

    /// Runs every scenario generated from an outline and returns whether
    /// any of them failed.
    fn run_outline(
        &mut self,
        registry: &dyn Registry<W>,
        world: &mut W,
        outline: &mut ScenarioOutline,
        feature_tags: &[Tag],
        background: Option<&Background>,
    ) -> bool {
        if outline.annotation_schema != self.config.annotation_schema {
            outline.annotation_schema = self.config.annotation_schema.clone();
            outline.invalidate_scenarios();
        }
        let selected = !outline.should_skip
            && outline.should_run_with_tags(feature_tags, &self.config.tags)
            && outline.should_run_with_name(self.config.name_filter.as_ref());
        if !selected {
            outline.mark_skipped();
            return false;
        }

        self.observers.each(|o| o.scenario_outline(outline));
        for examples in &outline.examples {
            self.observers.each(|o| o.examples(examples));
        }

        let mut failed = false;
        for child in outline.scenarios_mut() {
            if self.abort.load(Ordering::Relaxed) {
                break;
            }
            // The originating row is visible to step implementations only
            // while its generated scenario runs.
            self.active_row = child.row.clone();
            let child_failed = self.run_scenario(
                registry,
                world,
                child,
                feature_tags,
                background,
            );
            self.active_row = None;
            if child_failed {
                failed = true;
                if self.config.stop_on_failure {
                    break;
                }
            }
        }
        let _ = outline.status(self.config.dry_run);
        failed
    }
}

impl<W> std::fmt::Debug for Runner<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("observers", &self.observers)
            .field("reporters", &self.reporters.len())
            .field("undefined", &self.undefined.len())
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use lazy_regex::regex;

    use super::*;
    use crate::{
        parser::parse_feature,
        step::{Collection, StepContext, StepFailure},
    };

    #[derive(Debug, Default)]
    struct Calculator {
        value: i64,
    }

    fn registry() -> Collection<Calculator> {
        fn start(
            world: &mut Calculator,
            context: &StepContext,
        ) -> Result<(), StepFailure> {
            world.value = context.arguments[0]
                .value
                .parse()
                .map_err(|e| StepFailure::Error(format!("{e}")))?;
            Ok(())
        }
        fn add(
            world: &mut Calculator,
            context: &StepContext,
        ) -> Result<(), StepFailure> {
            let amount: i64 = context.arguments[0]
                .value
                .parse()
                .map_err(|e| StepFailure::Error(format!("{e}")))?;
            world.value += amount;
            Ok(())
        }
        fn total(
            world: &mut Calculator,
            context: &StepContext,
        ) -> Result<(), StepFailure> {
            let expected: i64 = context.arguments[0]
                .value
                .parse()
                .map_err(|e| StepFailure::Error(format!("{e}")))?;
            if world.value != expected {
                return Err(StepFailure::Assertion(format!(
                    "expected {expected}, got {}",
                    world.value,
                )));
            }
            Ok(())
        }
        Collection::new()
            .given(Regex::clone(regex!(r"^the number (-?\d+)$")), start)
            .when(Regex::clone(regex!(r"^I add (-?\d+)$")), add)
            .then(Regex::clone(regex!(r"^the total is (-?\d+)$")), total)
    }

    const GOOD: &str = "\
Feature: Addition
  Scenario: Two plus three
    Given the number 2
    When I add 3
    Then the total is 5
";

    const FAILING: &str = "\
Feature: Addition
  Scenario: Wrong total
    Given the number 2
    When I add 3
    Then the total is 6
    And the total is 6
";

    #[test]
    fn passing_feature_runs_green() {
        let mut feature = parse_feature(GOOD, "good.feature", None).unwrap();
        let mut runner = Runner::new(RunConfig::default());
        let failed =
            runner.run(&registry(), &mut Calculator::default(), std::slice::from_mut(&mut feature));

        assert!(!failed);
        assert_eq!(feature.status(false), Status::Passed);
    }

    #[test]
    fn failing_step_skips_the_rest_of_the_scenario() {
        let mut feature = parse_feature(FAILING, "bad.feature", None).unwrap();
        let mut runner = Runner::new(RunConfig::default());
        let failed =
            runner.run(&registry(), &mut Calculator::default(), std::slice::from_mut(&mut feature));

        assert!(failed);
        let ScenarioKind::Scenario(scenario) = &mut feature.scenarios[0] else {
            panic!("expected a plain scenario");
        };
        assert_eq!(scenario.steps[2].status, Status::Failed);
        assert_eq!(
            scenario.steps[2].error_message.as_deref(),
            Some("Assertion Failed: expected 6, got 5"),
        );
        assert_eq!(scenario.steps[3].status, Status::Skipped);
        assert_eq!(feature.status(false), Status::Failed);
    }

    #[test]
    fn dry_run_surfaces_every_undefined_step() {
        let text = "\
Feature: F
  Scenario: S
    Given the number 1
    When I do something unknown
    Then I do something else unknown
";
        let mut feature = parse_feature(text, "f.feature", None).unwrap();
        let mut runner =
            Runner::new(RunConfig { dry_run: true, ..RunConfig::default() });
        let failed =
            runner.run(&registry(), &mut Calculator::default(), std::slice::from_mut(&mut feature));

        // Dry runs never fail; they only discover.
        assert!(!failed);
        let names: Vec<_> = runner
            .undefined_steps()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            names,
            ["I do something unknown", "I do something else unknown"],
        );
        assert_eq!(feature.status(true), Status::Untested);
    }

    #[test]
    fn tag_deselected_features_are_skipped() {
        let mut feature = parse_feature(GOOD, "good.feature", None).unwrap();
        let config = RunConfig {
            tags: TagExpression::new(&["@nonexistent"]).unwrap(),
            ..RunConfig::default()
        };
        let mut runner = Runner::new(config);
        let failed =
            runner.run(&registry(), &mut Calculator::default(), std::slice::from_mut(&mut feature));

        assert!(!failed);
        assert_eq!(feature.cached_status(), Some(Status::Skipped));
    }

    #[test]
    fn name_filter_skips_unselected_scenarios() {
        let text = "\
Feature: F
  Scenario: Wanted one
    Given the number 1
    Then the total is 1

  Scenario: Other
    Given the number 2
    Then the total is 1
";
        let mut feature = parse_feature(text, "f.feature", None).unwrap();
        let config = RunConfig {
            name_filter: Some(Regex::new("Wanted").unwrap()),
            ..RunConfig::default()
        };
        let mut runner = Runner::new(config);
        let failed =
            runner.run(&registry(), &mut Calculator::default(), std::slice::from_mut(&mut feature));

        // The failing "Other" scenario never ran.
        assert!(!failed);
        assert_eq!(feature.scenarios[1].status(false), Status::Skipped);
        assert_eq!(feature.status(false), Status::Passed);
    }

    #[test]
    fn abort_flag_stops_new_scenarios() {
        struct AbortingHooks(Arc<AtomicBool>);
        impl Hooks<Calculator> for AbortingHooks {
            fn after_scenario(&mut self, _: &mut Calculator, _: &Scenario) {
                self.0.store(true, Ordering::Relaxed);
            }
        }

        let text = "\
Feature: F
  Scenario: First
    Given the number 1
    Then the total is 1

  Scenario: Second
    Given the number 2
    Then the total is 2
";
        let mut feature = parse_feature(text, "f.feature", None).unwrap();
        let mut runner = Runner::new(RunConfig::default());
        runner.set_hooks(Box::new(AbortingHooks(runner.abort_handle())));
        let _ = runner.run(&registry(), &mut Calculator::default(), std::slice::from_mut(&mut feature));

        assert_eq!(feature.scenarios[0].status(false), Status::Passed);
        // Never started, so never marked skipped.
        assert_eq!(feature.scenarios[1].status(false), Status::Untested);
    }

    #[test]
    fn outline_rows_are_exposed_to_steps() {
        fn check_row(
            _: &mut Calculator,
            context: &StepContext,
        ) -> Result<(), StepFailure> {
            let row = context
                .active_row
                .as_ref()
                .ok_or_else(|| StepFailure::Error("no active row".into()))?;
            if row.id.is_none() {
                return Err(StepFailure::Error("row without id".into()));
            }
            Ok(())
        }
        let registry = Collection::new()
            .given(Regex::clone(regex!(r"^row (\d+)$")), check_row);

        let text = "\
Feature: F
  Scenario Outline: O
    Given row <n>

    Examples:
      | n |
      | 1 |
      | 2 |
";
        let mut feature = parse_feature(text, "f.feature", None).unwrap();
        let mut runner = Runner::new(RunConfig::default());
        let failed =
            runner.run(&registry, &mut Calculator::default(), std::slice::from_mut(&mut feature));

        assert!(!failed);
        assert_eq!(feature.status(false), Status::Passed);
    }
}
