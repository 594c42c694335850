// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Scenarios, scenario outlines and their `Examples`-driven expansion.

use regex::Regex;
use tracing::warn;

use super::{
    feature::{Background, Tag},
    location::FileLocation,
    status::Status,
    step::Step,
    table::Row,
};
use crate::tag::TagExpression;

/// Naming schema applied to every scenario generated from an outline row.
///
/// `{name}` is the outline's (placeholder-substituted) own name, `{row.id}`
/// and `{row.index}` come from the example row, `{examples.name}` and
/// `{examples.index}` from the owning `Examples` block.
pub const DEFAULT_ANNOTATION_SCHEMA: &str = "{name} -- @{row.id} {examples.name}";

/// An `Examples` table attached to a [`ScenarioOutline`].
#[derive(Clone, Debug)]
pub struct Examples {
    /// Where the `Examples:` line was written.
    pub location: FileLocation,
    /// Literal block keyword as written.
    pub keyword: String,
    /// Block name after the keyword (may contain `<column>` placeholders).
    pub name: String,
    /// The placeholder-value table, absent only for a degenerate block.
    pub table: Option<super::table::Table>,
    /// 1-based position among the outline's blocks, assigned at expansion.
    pub index: Option<usize>,
}

impl Examples {
    /// Creates an empty block.
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
            table: None,
            index: None,
        }
    }
}

/// A concrete scenario: either written directly or generated from an
/// outline row.
#[derive(Clone, Debug)]
pub struct Scenario {
    /// Where the scenario (or its originating example row) was written.
    pub location: FileLocation,
    /// Literal block keyword as written.
    pub keyword: String,
    /// Scenario name.
    pub name: String,
    /// Free-form description lines before the first step.
    pub description: Vec<String>,
    /// Tags declared on (or generated for) this scenario.
    pub tags: Vec<Tag>,
    /// The scenario's own steps, excluding background.
    pub steps: Vec<Step>,
    /// Originating example row, for generated scenarios only.
    pub row: Option<Row>,
    /// Selection verdict, set by tag/name selection independently of
    /// execution outcome.
    pub should_skip: bool,

    /// Per-scenario copies of the feature background's steps, materialized
    /// once by [`Scenario::attach_background()`].
    background_steps: Option<Vec<Step>>,
    /// Memoized terminal status.
    status: Option<Status>,
}

impl Scenario {
    /// Creates a scenario with no steps.
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
            description: Vec::new(),
            tags: Vec::new(),
            steps: Vec::new(),
            row: None,
            should_skip: false,
            background_steps: None,
            status: None,
        }
    }

    /// Materializes this scenario's own copies of the background steps.
    ///
    /// Copies are made once and kept, so that step status stays local to
    /// this scenario instead of bleeding through a shared background.
    pub fn attach_background(&mut self, background: Option<&Background>) {
        if self.background_steps.is_some() {
            return;
        }
        self.background_steps = Some(
            background
                .map(|bg| bg.steps.iter().map(Step::fresh_copy).collect())
                .unwrap_or_default(),
        );
    }

    /// Background-step copies followed by the scenario's own steps.
    pub fn all_steps(&self) -> impl Iterator<Item = &Step> {
        self.background_steps.iter().flatten().chain(self.steps.iter())
    }

    /// Mutable variant of [`Scenario::all_steps()`].
    pub fn all_steps_mut(&mut self) -> impl Iterator<Item = &mut Step> {
        self.background_steps
            .iter_mut()
            .flatten()
            .chain(self.steps.iter_mut())
    }

    /// Feature tags followed by this scenario's own tags.
    #[must_use]
    pub fn effective_tags(&self, feature_tags: &[Tag]) -> Vec<String> {
        feature_tags
            .iter()
            .chain(self.tags.iter())
            .map(|tag| tag.name.clone())
            .collect()
    }

    /// Whether the tag expression selects this scenario.
    #[must_use]
    pub fn should_run_with_tags(
        &self,
        feature_tags: &[Tag],
        expr: &TagExpression,
    ) -> bool {
        expr.check(self.effective_tags(feature_tags))
    }

    /// Whether the optional name filter selects this scenario.
    #[must_use]
    pub fn should_run_with_name(&self, name_filter: Option<&Regex>) -> bool {
        name_filter.map_or(true, |re| re.is_match(&self.name))
    }

    /// Full selection verdict: not explicitly skipped, tag-selected and
    /// name-selected.
    #[must_use]
    pub fn should_run(
        &self,
        feature_tags: &[Tag],
        expr: &TagExpression,
        name_filter: Option<&Regex>,
    ) -> bool {
        !self.should_skip
            && self.should_run_with_tags(feature_tags, expr)
            && self.should_run_with_name(name_filter)
    }

    /// Rolls up step statuses: the first non-passed step wins.
    ///
    /// An undefined step makes the scenario `Failed`, or `Untested` under a
    /// dry run used to discover undefined steps.
    #[must_use]
    pub fn compute_status(&self, dry_run: bool) -> Status {
        for step in self.all_steps() {
            match step.status {
                Status::Passed => {}
                Status::Undefined => {
                    return if dry_run { Status::Untested } else { Status::Failed };
                }
                other => return other,
            }
        }
        Status::Passed
    }

    /// Memoizing status accessor: terminal results are cached until
    /// [`Scenario::reset()`].
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

    /// Marks this scenario (and all its steps) as deselected.
    pub fn mark_skipped(&mut self) {
        self.should_skip = true;
        for step in self.all_steps_mut() {
            step.status = Status::Skipped;
        }
        self.status = Some(Status::Skipped);
    }

    /// Clears memoized status, the selection verdict and every step's
    /// runtime fields before a re-run.
    pub fn reset(&mut self) {
        self.status = None;
        self.should_skip = false;
        for step in self.all_steps_mut() {
            step.reset();
        }
    }
}

/// A templated scenario expanded against its `Examples` tables into
/// concrete [`Scenario`]s.
#[derive(Clone, Debug)]
pub struct ScenarioOutline {
    /// Where the outline was written.
    pub location: FileLocation,
    /// Literal block keyword as written.
    pub keyword: String,
    /// Outline name (may contain `<column>` placeholders).
    pub name: String,
    /// Free-form description lines before the first step.
    pub description: Vec<String>,
    /// Tags declared on the outline (templated into row tags).
    pub tags: Vec<Tag>,
    /// Templated steps.
    pub steps: Vec<Step>,
    /// `Examples` blocks, in declaration order.
    pub examples: Vec<Examples>,
    /// Naming schema for generated scenarios.
    pub annotation_schema: String,
    /// Selection verdict, set by tag/name selection.
    pub should_skip: bool,

    /// Concrete scenarios, expanded once and cached.
    scenarios: Option<Vec<Scenario>>,
    /// Memoized terminal status.
    status: Option<Status>,
}

impl ScenarioOutline {
    /// Creates an outline with no steps or examples.
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
            description: Vec::new(),
            tags: Vec::new(),
            steps: Vec::new(),
            examples: Vec::new(),
            annotation_schema: DEFAULT_ANNOTATION_SCHEMA.to_string(),
            should_skip: false,
            scenarios: None,
            status: None,
        }
    }

    /// The expanded concrete scenarios, materializing them on first access.
    pub fn scenarios(&mut self) -> &[Scenario] {
        self.expanded()
    }

    /// Mutable variant of [`ScenarioOutline::scenarios()`].
    pub fn scenarios_mut(&mut self) -> &mut [Scenario] {
        self.expanded()
    }

    fn expanded(&mut self) -> &mut Vec<Scenario> {
        if self.scenarios.is_none() {
            let built = self.build_scenarios();
            self.scenarios = Some(built);
        }
        self.scenarios.get_or_insert_with(Vec::new)
    }

    /// Drops the expansion cache entirely (e.g. after editing examples).
    pub fn invalidate_scenarios(&mut self) {
        self.scenarios = None;
        self.status = None;
    }

    /// Whether this outline is selected by the tag expression: either its
    /// own effective tags match, or any generated scenario's do (rows can
    /// carry their own substituted tags).
    pub fn should_run_with_tags(
        &mut self,
        feature_tags: &[Tag],
        expr: &TagExpression,
    ) -> bool {
        let own = feature_tags
            .iter()
            .chain(self.tags.iter())
            .map(|tag| tag.name.clone())
            .collect::<Vec<_>>();
        if expr.check(own) {
            return true;
        }
        self.expanded()
            .iter()
            .any(|s| s.should_run_with_tags(feature_tags, expr))
    }

    /// Whether the optional name filter selects this outline.
    #[must_use]
    pub fn should_run_with_name(&self, name_filter: Option<&Regex>) -> bool {
        name_filter.map_or(true, |re| re.is_match(&self.name))
    }

    /// Rolls up generated-scenario statuses: the first non-passed child
    /// wins. An outline that generated nothing is `Skipped`.
    pub fn compute_status(&mut self, dry_run: bool) -> Status {
        let children = self.expanded();
        if children.is_empty() {
            return Status::Skipped;
        }
        for child in children {
            match child.status(dry_run) {
                Status::Passed => {}
                other => return other,
            }
        }
        Status::Passed
    }

    /// Memoizing status accessor, as on [`Scenario::status()`].
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

    /// Marks this outline and all generated scenarios as deselected.
    pub fn mark_skipped(&mut self) {
        self.should_skip = true;
        for child in self.expanded() {
            child.mark_skipped();
        }
        self.status = Some(Status::Skipped);
    }

    /// Clears memoized status and every generated scenario's runtime state
    /// before a re-run. The expansion cache itself is kept.
    pub fn reset(&mut self) {
        self.status = None;
        self.should_skip = false;
        for step in &mut self.steps {
            step.reset();
        }
        if let Some(children) = &mut self.scenarios {
            for child in children {
                child.reset();
            }
        }
    }

    /// Expands `(steps × examples × rows)` into concrete scenarios.
    ///
    /// Runs example-block by example-block, row by row, assigning
    /// `example.index`, `row.index` and `row.id` along the way.
    fn build_scenarios(&mut self) -> Vec<Scenario> {
        for (ei, example) in self.examples.iter_mut().enumerate() {
            example.index = Some(ei + 1);
            if let Some(table) = &mut example.table {
                for (ri, row) in table.rows.iter_mut().enumerate() {
                    row.index = Some(ri + 1);
                    row.id = Some(format!("{}.{}", ei + 1, ri + 1));
                }
            }
        }

        let mut generated = Vec::new();
        for example in &self.examples {
            let Some(table) = &example.table else { continue };
            let example_index = example.index.unwrap_or_default();

            for row in &table.rows {
                let row_index = row.index.unwrap_or_default();
                let row_id = row
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{example_index}.{row_index}"));

                let row_pairs: Vec<(String, String)> = table
                    .headings
                    .iter()
                    .cloned()
                    .zip(row.cells.iter().cloned())
                    .collect();

                let examples_name = substitute(&example.name, &row_pairs);

                let mut params = row_pairs.clone();
                params.push(("examples.name".into(), examples_name.clone()));
                params.push((
                    "examples.index".into(),
                    example_index.to_string(),
                ));
                params.push(("row.index".into(), row_index.to_string()));
                params.push(("row.id".into(), row_id.clone()));

                let outline_name = substitute(&self.name, &params);
                let scenario_name = render_annotation(
                    &self.annotation_schema,
                    &outline_name,
                    &row_id,
                    row_index,
                    &examples_name,
                    example_index,
                );

                let mut scenario = Scenario::new(
                    FileLocation::new(
                        self.location.filename.clone(),
                        row.line,
                    ),
                    self.keyword.clone(),
                    scenario_name,
                );
                scenario.tags = make_row_tags(&self.tags, &params);
                scenario.steps = self
                    .steps
                    .iter()
                    .map(|step| make_row_step(step, &row_pairs, &params))
                    .collect();
                scenario.row = Some(row.clone());
                generated.push(scenario);
            }
        }
        generated
    }
}

/// Replaces every `<name>` token of `pairs` inside `text`.
///
/// Replacement targets the full token including its angle brackets, so a
/// column named `a` never touches `<abc>`; tokens with no matching column
/// are left verbatim.
fn substitute(text: &str, pairs: &[(String, String)]) -> String {
    let mut out = text.to_string();
    for (name, value) in pairs {
        let token = format!("<{name}>");
        if out.contains(&token) {
            out = out.replace(&token, value);
        }
    }
    out
}

/// Renders the outline annotation schema with the computed naming parts.
fn render_annotation(
    schema: &str,
    name: &str,
    row_id: &str,
    row_index: usize,
    examples_name: &str,
    examples_index: usize,
) -> String {
    schema
        .replace("{name}", name)
        .replace("{row.id}", row_id)
        .replace("{row.index}", &row_index.to_string())
        .replace("{examples.name}", examples_name)
        .replace("{examples.index}", &examples_index.to_string())
}

/// Computes the tag list for one generated scenario.
///
/// Outline tags containing placeholders are substituted; tags still holding
/// `<`/`>` afterwards are dropped. Every surviving tag is unescaped
/// (literal `\t`/`\n`) and sanitized into a valid tag token.
fn make_row_tags(outline_tags: &[Tag], params: &[(String, String)]) -> Vec<Tag> {
    let mut tags = Vec::with_capacity(outline_tags.len());
    for tag in outline_tags {
        let mut name = tag.name.clone();
        if name.contains('<') && name.contains('>') {
            name = substitute(&name, params);
        }
        if name.contains('<') || name.contains('>') {
            warn!(tag = %tag.name, "dropping tag with unresolved placeholders");
            continue;
        }
        tags.push(Tag { name: sanitize_tag(&unescape(&name)), line: tag.line });
    }
    tags
}

fn unescape(text: &str) -> String {
    text.replace("\\t", "\t").replace("\\n", "\n")
}

/// Keeps alphanumerics and `.`/`_`/`-`, collapses whitespace runs to a
/// single `_`, drops everything else.
fn sanitize_tag(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
            in_whitespace = false;
        } else if ch.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        }
    }
    out
}

/// Deep-copies an outline step with row values substituted into its name,
/// docstring and table cells.
fn make_row_step(
    step: &Step,
    row_pairs: &[(String, String)],
    params: &[(String, String)],
) -> Step {
    let mut copy = step.fresh_copy();
    copy.name = substitute(&copy.name, params);
    if let Some(text) = &copy.text {
        copy.text = Some(substitute(text, row_pairs));
    }
    if let Some(table) = &mut copy.table {
        for table_row in &mut table.rows {
            for cell in &mut table_row.cells {
                *cell = substitute(cell, row_pairs);
            }
        }
    }
    copy
}
