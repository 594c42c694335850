// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use conduct::{parser, ScenarioKind, ScenarioOutline, Status};

const OUTLINE: &str = "\
Feature: Eating
  @outline.<count>
  Scenario Outline: Eat <count> of <fruit>
    Given <count> fresh <fruit>
    When I eat <count> of them:
      | fruit   | amount  |
      | <fruit> | <count> |
    Then none are left

    Examples: weekday <fruit>
      | count | fruit  |
      | 2     | apples |
      | 3     | pears  |

    Examples: weekend
      | count | fruit   |
      | 12    | bananas |
";

fn parsed_outline(text: &str) -> ScenarioOutline {
    let feature = parser::parse_feature(text, "eat.feature", None).unwrap();
    let ScenarioKind::Outline(outline) = feature.scenarios.into_iter().next().unwrap()
    else {
        panic!("expected an outline");
    };
    outline
}

#[test]
fn rows_expand_in_example_then_row_order() {
    let mut outline = parsed_outline(OUTLINE);
    let scenarios = outline.scenarios();

    assert_eq!(scenarios.len(), 3);
    let ids: Vec<_> = scenarios
        .iter()
        .map(|s| s.row.as_ref().unwrap().id.as_deref().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["1.1", "1.2", "2.1"]);
}

#[test]
fn generated_names_follow_the_annotation_schema() {
    let mut outline = parsed_outline(OUTLINE);
    let names: Vec<_> =
        outline.scenarios().iter().map(|s| s.name.clone()).collect();
    assert_eq!(
        names,
        [
            "Eat 2 of apples -- @1.1 weekday apples",
            "Eat 3 of pears -- @1.2 weekday pears",
            "Eat 12 of bananas -- @2.1 weekend",
        ],
    );
}

#[test]
fn generated_scenarios_point_at_their_example_row() {
    let mut outline = parsed_outline(OUTLINE);
    let lines: Vec<_> = outline
        .scenarios()
        .iter()
        .map(|s| (s.location.filename.clone(), s.location.line))
        .collect();
    assert_eq!(
        lines,
        [
            ("eat.feature".to_string(), Some(12)),
            ("eat.feature".to_string(), Some(13)),
            ("eat.feature".to_string(), Some(17)),
        ],
    );
}

#[test]
fn placeholders_substitute_into_steps_text_and_tables() {
    let mut outline = parsed_outline(OUTLINE);
    let first = &outline.scenarios()[0];

    assert_eq!(first.steps[0].name, "2 fresh apples");
    let table = first.steps[1].table.as_ref().unwrap();
    assert_eq!(table.rows[0].cells, ["apples", "2"]);
    // Untouched steps come through verbatim.
    assert_eq!(first.steps[2].name, "none are left");
}

#[test]
fn outline_tags_substitute_and_sanitize() {
    let mut outline = parsed_outline(OUTLINE);
    let tags: Vec<_> = outline.scenarios()[0]
        .tags
        .iter()
        .map(|t| t.name.clone())
        .collect();
    assert_eq!(tags, ["outline.2"]);
}

#[test]
fn tags_with_unresolved_placeholders_are_dropped() {
    let text = "\
Feature: F
  @keep @missing.<nope>
  Scenario Outline: O <n>
    Given <n>

    Examples:
      | n |
      | 1 |
";
    let mut outline = parsed_outline(text);
    let tags: Vec<_> = outline.scenarios()[0]
        .tags
        .iter()
        .map(|t| t.name.clone())
        .collect();
    assert_eq!(tags, ["keep"]);
}

#[test]
fn unmatched_placeholders_stay_verbatim_in_names() {
    let text = "\
Feature: F
  Scenario Outline: O <n> and <unknown>
    Given <n>

    Examples:
      | n |
      | 7 |
";
    let mut outline = parsed_outline(text);
    assert!(outline.scenarios()[0].name.starts_with("O 7 and <unknown>"));
}

#[test]
fn zero_example_outlines_produce_nothing_and_skip() {
    let text = "\
Feature: F
  Scenario Outline: O <n>
    Given <n>
";
    let mut outline = parsed_outline(text);
    assert!(outline.scenarios().is_empty());
    assert_eq!(outline.status(false), Status::Skipped);
}

#[test]
fn zero_row_blocks_contribute_no_scenarios() {
    let text = "\
Feature: F
  Scenario Outline: O <n>
    Given <n>

    Examples: empty
      | n |

    Examples: full
      | n |
      | 1 |
";
    let mut outline = parsed_outline(text);
    assert_eq!(outline.scenarios().len(), 1);
    assert_eq!(
        outline.scenarios()[0].row.as_ref().unwrap().id.as_deref(),
        Some("2.1"),
    );
    // The empty block still got its position assigned.
    assert_eq!(outline.examples[0].index, Some(1));
}

#[test]
fn expansion_is_cached_until_invalidated() {
    let mut outline = parsed_outline(OUTLINE);
    outline.scenarios_mut()[0].name = "renamed".to_string();
    assert_eq!(outline.scenarios()[0].name, "renamed");

    outline.invalidate_scenarios();
    assert!(outline.scenarios()[0].name.starts_with("Eat 2 of apples"));
}

#[test]
fn custom_annotation_schema_changes_generated_names() {
    let mut outline = parsed_outline(OUTLINE);
    outline.annotation_schema = "{name} [{examples.index}/{row.index}]".into();
    let names: Vec<_> =
        outline.scenarios().iter().map(|s| s.name.clone()).collect();
    assert_eq!(names[0], "Eat 2 of apples [1/1]");
    assert_eq!(names[2], "Eat 12 of bananas [2/1]");
}
