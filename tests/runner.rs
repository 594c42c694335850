// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{cell::RefCell, rc::Rc};

use lazy_regex::{regex, Regex};

use conduct::{
    parser,
    runner::{RunConfig, Runner},
    step::{Collection, StepContext, StepFailure},
    Feature, Observer, Reporter, ScenarioKind, Status, Step, TagExpression,
};

#[derive(Debug, Default)]
struct Basket {
    cucumbers: i64,
}

fn registry() -> Collection<Basket> {
    fn have(world: &mut Basket, cx: &StepContext) -> Result<(), StepFailure> {
        world.cucumbers = parse_int(&cx.arguments[0].value)?;
        Ok(())
    }
    fn eat(world: &mut Basket, cx: &StepContext) -> Result<(), StepFailure> {
        world.cucumbers -= parse_int(&cx.arguments[0].value)?;
        Ok(())
    }
    fn left(world: &mut Basket, cx: &StepContext) -> Result<(), StepFailure> {
        let expected = parse_int(&cx.arguments[0].value)?;
        if world.cucumbers != expected {
            return Err(StepFailure::Assertion(format!(
                "expected {expected} cucumbers, got {}",
                world.cucumbers,
            )));
        }
        Ok(())
    }
    Collection::new()
        .given(Regex::clone(regex!(r"^(\d+) cucumbers$")), have)
        .when(Regex::clone(regex!(r"^I eat (\d+) cucumbers$")), eat)
        .then(Regex::clone(regex!(r"^(\d+) cucumbers are left$")), left)
}

fn parse_int(text: &str) -> Result<i64, StepFailure> {
    text.parse().map_err(|e| StepFailure::Error(format!("{e}")))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn run(
    config: RunConfig,
    features: &mut [Feature],
) -> (bool, Runner<Basket>) {
    init_tracing();
    let mut runner = Runner::new(config);
    let failed = runner.run(&registry(), &mut Basket::default(), features);
    (failed, runner)
}

const SHARED_BACKGROUND: &str = "\
Feature: Eating from a shared basket
  Background:
    Given 10 cucumbers

  Scenario: First eater
    When I eat 4 cucumbers
    Then 6 cucumbers are left

  Scenario: Second eater
    When I eat 9 cucumbers
    Then 1 cucumbers are left
";

#[test]
fn background_state_does_not_bleed_between_scenarios() {
    let mut feature =
        parser::parse_feature(SHARED_BACKGROUND, "basket.feature", None)
            .unwrap();
    let (failed, _) =
        run(RunConfig::default(), std::slice::from_mut(&mut feature));

    // Both scenarios see a full basket of 10, not the first one's leftovers.
    assert!(!failed);
    assert_eq!(feature.status(false), Status::Passed);

    // Each scenario ran its own copy of the background step; the template
    // on the feature stays untouched.
    let template = &feature.background.as_ref().unwrap().steps[0];
    assert_eq!(template.status, Status::Untested);
    for child in &mut feature.scenarios {
        let ScenarioKind::Scenario(s) = child else { panic!("plain expected") };
        assert!(s.all_steps().all(|step| step.status == Status::Passed));
        assert_eq!(s.all_steps().count(), 3);
    }
}

#[test]
fn reset_allows_an_identical_rerun() {
    let mut feature =
        parser::parse_feature(SHARED_BACKGROUND, "basket.feature", None)
            .unwrap();
    let (first, _) =
        run(RunConfig::default(), std::slice::from_mut(&mut feature));
    assert!(!first);

    feature.reset();
    assert_eq!(feature.cached_status(), None);

    let (second, _) =
        run(RunConfig::default(), std::slice::from_mut(&mut feature));
    assert!(!second);
    assert_eq!(feature.status(false), Status::Passed);
}

#[test]
fn observers_fire_in_document_order() {
    #[derive(Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Observer for Recorder {
        fn uri(&mut self, path: &str) {
            self.0.borrow_mut().push(format!("uri {path}"));
        }
        fn feature(&mut self, feature: &Feature) {
            self.0.borrow_mut().push(format!("feature {}", feature.name));
        }
        fn background(&mut self, _: &conduct::Background) {
            self.0.borrow_mut().push("background".into());
        }
        fn scenario(&mut self, scenario: &conduct::Scenario) {
            self.0.borrow_mut().push(format!("scenario {}", scenario.name));
        }
        fn step(&mut self, step: &Step) {
            self.0.borrow_mut().push(format!("step {}", step.name));
        }
        fn step_match(&mut self, info: &conduct::step::MatchInfo) {
            self.0
                .borrow_mut()
                .push(format!("match {}", info.is_match()));
        }
        fn result(&mut self, step: &Step) {
            self.0.borrow_mut().push(format!("result {}", step.status));
        }
        fn eof(&mut self) {
            self.0.borrow_mut().push("eof".into());
        }
        fn close(&mut self) {
            self.0.borrow_mut().push("close".into());
        }
    }

    let text = "\
Feature: F
  Scenario: S
    Given 2 cucumbers
    Then 2 cucumbers are left
";
    let mut feature = parser::parse_feature(text, "f.feature", None).unwrap();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut runner = Runner::new(RunConfig::default());
    runner.register_observer(Box::new(Recorder(Rc::clone(&calls))));
    let failed = runner.run(
        &registry(),
        &mut Basket::default(),
        std::slice::from_mut(&mut feature),
    );

    assert!(!failed);
    assert_eq!(
        *calls.borrow(),
        [
            "uri f.feature",
            "feature F",
            "scenario S",
            "step 2 cucumbers",
            "match true",
            "result passed",
            "step 2 cucumbers are left",
            "match true",
            "result passed",
            "eof",
            "close",
        ],
    );
}

#[test]
fn reporters_see_every_feature_and_the_end_of_run() {
    #[derive(Default)]
    struct Summary(Rc<RefCell<(Vec<String>, bool)>>);

    impl Reporter for Summary {
        fn feature(&mut self, feature: &Feature) {
            self.0.borrow_mut().0.push(feature.name.clone());
        }
        fn end(&mut self) {
            self.0.borrow_mut().1 = true;
        }
    }

    let good = "\
Feature: Good
  Scenario: S
    Given 1 cucumbers
    Then 1 cucumbers are left
";
    let skipped = "\
Feature: Unselected
  Scenario: S
    Given 1 cucumbers
";
    let mut features = vec![
        parser::parse_feature(good, "good.feature", None).unwrap(),
        parser::parse_feature(skipped, "skipped.feature", None).unwrap(),
    ];
    // Tag selection drops the second feature, but reporters still see it.
    features[0].tags.push(conduct::Tag { name: "run".into(), line: 1 });

    let seen = Rc::new(RefCell::new((Vec::new(), false)));
    let config = RunConfig {
        tags: TagExpression::new(&["@run"]).unwrap(),
        ..RunConfig::default()
    };
    let mut runner = Runner::new(config);
    runner.register_reporter(Box::new(Summary(Rc::clone(&seen))));
    let failed =
        runner.run(&registry(), &mut Basket::default(), &mut features);

    assert!(!failed);
    let (names, ended) = &*seen.borrow();
    assert_eq!(names, &["Good", "Unselected"]);
    assert!(*ended);
    assert_eq!(features[1].cached_status(), Some(Status::Skipped));
}

#[test]
fn stop_on_failure_halts_the_run() {
    let failing = "\
Feature: Failing
  Scenario: Wrong
    Given 2 cucumbers
    Then 3 cucumbers are left
";
    let untouched = "\
Feature: Later
  Scenario: Fine
    Given 2 cucumbers
    Then 2 cucumbers are left
";
    let mut features = vec![
        parser::parse_feature(failing, "a.feature", None).unwrap(),
        parser::parse_feature(untouched, "b.feature", None).unwrap(),
    ];
    let config =
        RunConfig { stop_on_failure: true, ..RunConfig::default() };
    let (failed, _) = run(config, &mut features);

    assert!(failed);
    assert_eq!(features[0].status(false), Status::Failed);
    // Never started.
    assert_eq!(features[1].status(false), Status::Untested);
}

#[test]
fn dry_run_discovers_undefined_steps_across_scenarios() {
    let text = "\
Feature: F
  Scenario: A
    Given 2 cucumbers
    When I do something unheard of
    Then 2 cucumbers are left

  Scenario: B
    Then something equally novel happens
";
    let mut feature = parser::parse_feature(text, "f.feature", None).unwrap();
    let config = RunConfig { dry_run: true, ..RunConfig::default() };
    let (failed, runner) =
        run(config, std::slice::from_mut(&mut feature));

    assert!(!failed);
    let names: Vec<_> = runner
        .undefined_steps()
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(
        names,
        ["I do something unheard of", "something equally novel happens"],
    );
    // Nothing actually executed.
    assert_eq!(feature.status(true), Status::Untested);
}

#[test]
fn undefined_step_fails_its_scenario_in_a_real_run() {
    let text = "\
Feature: F
  Scenario: S
    Given 2 cucumbers
    When nobody wrote this step
    Then 2 cucumbers are left
";
    let mut feature = parser::parse_feature(text, "f.feature", None).unwrap();
    let (failed, runner) =
        run(RunConfig::default(), std::slice::from_mut(&mut feature));

    assert!(failed);
    assert_eq!(runner.undefined_steps().len(), 1);
    let ScenarioKind::Scenario(scenario) = &mut feature.scenarios[0] else {
        panic!("plain expected");
    };
    assert_eq!(scenario.steps[1].status, Status::Undefined);
    assert_eq!(scenario.steps[2].status, Status::Skipped);
    assert_eq!(scenario.status(false), Status::Failed);
}

#[test]
fn outline_features_run_end_to_end() {
    let text = "\
Feature: Outlined eating
  Scenario Outline: Eat <eat>
    Given <start> cucumbers
    When I eat <eat> cucumbers
    Then <left> cucumbers are left

    Examples:
      | start | eat | left |
      | 12    | 5   | 7    |
      | 20    | 20  | 0    |
";
    let mut feature = parser::parse_feature(text, "f.feature", None).unwrap();
    let (failed, _) =
        run(RunConfig::default(), std::slice::from_mut(&mut feature));

    assert!(!failed);
    assert_eq!(feature.status(false), Status::Passed);
    let ScenarioKind::Outline(outline) = &mut feature.scenarios[0] else {
        panic!("outline expected");
    };
    assert_eq!(outline.scenarios().len(), 2);
    assert!(outline.scenarios()[1].name.starts_with("Eat 20"));
}
