// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Line-oriented state-machine parser for feature documents.
//!
//! The grammar is not recursive, so no grammar generator is involved: the
//! parser walks the document one line at a time, holding an explicit
//! [`State`] and transitioning on keyword matches against the active
//! language's [`Keywords`]. Blank lines are skipped everywhere except
//! inside a multi-line text block, where every line counts.

use std::{fmt, mem};

use derive_more::{Display, Error};
use lazy_regex::regex_captures;
use tracing::debug;

use crate::{
    keyword::{self, Category, KeywordTable, Keywords, DEFAULT_LANGUAGE},
    model::{
        Background, Examples, Feature, FileLocation, Row, Scenario,
        ScenarioKind, ScenarioOutline, Step, StepType, Table, Tag,
    },
};

/// Error of parsing a feature document.
///
/// Carries the offending position and a best-effort diagnostic; when no
/// structural rule explains the failure, the reason falls back to naming
/// the parser state that rejected the line.
#[derive(Clone, Debug, Error)]
pub struct ParserError {
    /// What went wrong.
    pub reason: String,
    /// 1-based number of the offending line, when attributable to one.
    pub line: Option<usize>,
    /// Trimmed text of the offending line.
    pub line_text: Option<String>,
    /// Name of the document being parsed.
    pub filename: Option<String>,
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to parse ")?;
        match &self.filename {
            Some(filename) => write!(f, "\"{filename}\"")?,
            None => f.write_str("<string>")?,
        }
        write!(f, ": {}", self.reason)?;
        if let Some(line) = self.line {
            write!(f, ", at line {line}")?;
        }
        if let Some(text) = &self.line_text {
            write!(f, ": \"{text}\"")?;
        }
        Ok(())
    }
}

/// Parses a feature document with the built-in [`KeywordTable`].
///
/// `language` overrides the initial keyword language; a `# language: xx`
/// directive in the document still takes precedence.
///
/// # Errors
///
/// See [`Parser::parse_feature()`].
pub fn parse_feature(
    text: &str,
    filename: &str,
    language: Option<&str>,
) -> Result<Feature, ParserError> {
    Parser::new(keyword::default_table()).parse_feature(text, filename, language)
}

/// Parses a bare sequence of steps with the built-in [`KeywordTable`].
///
/// # Errors
///
/// See [`Parser::parse_steps()`].
pub fn parse_steps(text: &str, filename: &str) -> Result<Vec<Step>, ParserError> {
    Parser::new(keyword::default_table()).parse_steps(text, filename)
}

/// Feature document parser over a caller-chosen [`KeywordTable`].
#[derive(Clone, Copy, Debug)]
pub struct Parser<'k> {
    table: &'k KeywordTable,
}

impl<'k> Parser<'k> {
    /// Creates a parser resolving keywords against the given table.
    #[must_use]
    pub fn new(table: &'k KeywordTable) -> Self {
        Self { table }
    }

    /// Parses one feature document into its [`Feature`] tree.
    ///
    /// `filename` is used only for [`FileLocation`] stamping. `language`
    /// picks the initial keyword language (default `"en"`); a
    /// `# language: xx` directive before any content switches it.
    ///
    /// # Errors
    ///
    /// [`ParserError`] on the first line the state machine cannot accept,
    /// on structural violations (tagged `Background`, `Examples` outside
    /// an outline, mismatched table row width, under-indented multi-line
    /// text, premature `And`/`But`), or when the document contains no
    /// `Feature:` at all.
    pub fn parse_feature(
        &self,
        text: &str,
        filename: &str,
        language: Option<&str>,
    ) -> Result<Feature, ParserError> {
        let language = language.unwrap_or(DEFAULT_LANGUAGE);
        let mut machine = Machine::new(self.table, filename, language)?;
        machine.run(text)?;
        debug!(filename, language = machine.language.as_str(), "parsed");
        machine.feature.take().ok_or(ParserError {
            reason: "no feature found in document".into(),
            line: None,
            line_text: None,
            filename: Some(filename.to_string()),
        })
    }

    /// Parses a bare sequence of steps, with no `Feature:` or `Scenario:`
    /// wrapper, reusing the step/multi-line/table machinery.
    ///
    /// Supports executing ad-hoc steps as if they were written inline.
    ///
    /// # Errors
    ///
    /// [`ParserError`] on any line that is not a step, a step argument, or
    /// blank.
    pub fn parse_steps(
        &self,
        text: &str,
        filename: &str,
    ) -> Result<Vec<Step>, ParserError> {
        let mut machine = Machine::new(self.table, filename, DEFAULT_LANGUAGE)?;
        machine.state = State::Steps;
        machine.block = Some(Block::Bare);
        machine.run(text)?;
        Ok(mem::take(&mut machine.bare_steps))
    }
}

/// Mode the line loop is in.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
enum State {
    /// Nothing seen yet but tags and comments.
    #[display(fmt = "init")]
    Init,
    /// Inside a feature, before its first scenario or background.
    #[display(fmt = "feature")]
    Feature,
    /// After a tag line, awaiting the scenario it annotates.
    #[display(fmt = "next_scenario")]
    NextScenario,
    /// After a scenario keyword line, before its first step.
    #[display(fmt = "scenario")]
    Scenario,
    /// Accumulating steps of the current block.
    #[display(fmt = "steps")]
    Steps,
    /// Inside a triple-quoted text block.
    #[display(fmt = "multiline")]
    Multiline,
    /// Accumulating `|`-rows of a step or examples table.
    #[display(fmt = "table")]
    Table,
}

/// Which node the parsed steps currently flow into.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Block {
    /// The feature's background.
    Background,
    /// The latest plain scenario.
    Scenario,
    /// The latest scenario outline.
    Outline,
    /// A wrapperless step list (see [`Parser::parse_steps()`]).
    Bare,
}

/// One in-flight parse: the state machine plus everything built so far.
struct Machine<'k> {
    table: &'k KeywordTable,
    keywords: Keywords,
    language: String,
    filename: String,

    state: State,
    line_no: usize,
    line_text: String,
    feature: Option<Feature>,
    block: Option<Block>,
    pending_tags: Vec<Tag>,
    last_step_type: Option<StepType>,
    bare_steps: Vec<Step>,

    // Multi-line text block bookkeeping.
    text_lines: Vec<String>,
    text_terminator: &'static str,
    text_indent: usize,

    // Table bookkeeping.
    current_table: Option<Table>,
    examples_open: bool,
}

impl<'k> Machine<'k> {
    fn new(
        table: &'k KeywordTable,
        filename: &str,
        language: &str,
    ) -> Result<Self, ParserError> {
        let keywords = table
            .keywords(language)
            .map_err(|e| ParserError {
                reason: e.to_string(),
                line: None,
                line_text: None,
                filename: Some(filename.to_string()),
            })?
            .clone();
        Ok(Self {
            table,
            keywords,
            language: language.to_string(),
            filename: filename.to_string(),
            state: State::Init,
            line_no: 0,
            line_text: String::new(),
            feature: None,
            block: None,
            pending_tags: Vec::new(),
            last_step_type: None,
            bare_steps: Vec::new(),
            text_lines: Vec::new(),
            text_terminator: "\"\"\"",
            text_indent: 0,
            current_table: None,
            examples_open: false,
        })
    }

    fn run(&mut self, text: &str) -> Result<(), ParserError> {
        for (index, line) in text.lines().enumerate() {
            self.line_no = index + 1;
            self.parse_line(line)?;
        }
        self.finish()
    }

    fn parse_line(&mut self, raw: &str) -> Result<(), ParserError> {
        self.line_text = raw.to_string();
        // Inside a text block every line is verbatim content, comments and
        // blanks included.
        if self.state == State::Multiline {
            return self.action_multiline(raw);
        }
        let line = raw.trim();
        if line.is_empty() {
            return Ok(());
        }
        if line.starts_with('#')
            && (self.state == State::Init || self.pending_tags.is_empty())
        {
            if self.state == State::Init && self.pending_tags.is_empty() {
                if let Some((_, code)) =
                    regex_captures!(r"^#\s*language:\s*([\w-]+)", line)
                {
                    self.set_language(code)?;
                }
            }
            return Ok(());
        }
        match self.state {
            State::Init => self.action_init(line),
            State::Feature => self.action_feature(line),
            State::NextScenario => self.action_next_scenario(line),
            State::Scenario => self.action_scenario(line),
            State::Steps => self.action_steps(line),
            State::Table => self.action_table(line),
            State::Multiline => Ok(()),
        }
    }

    fn finish(&mut self) -> Result<(), ParserError> {
        match self.state {
            State::Multiline => Err(self.error(format!(
                "multi-line text is missing its closing {}",
                self.text_terminator,
            ))),
            State::Table => {
                self.finalize_table()?;
                self.state = State::Steps;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn action_init(&mut self, line: &str) -> Result<(), ParserError> {
        if line.starts_with('@') {
            return self.parse_tags(line);
        }
        let matched = keyword::strip_block_keyword(
            line,
            self.keywords.get(Category::Feature),
        )
        .map(|(kw, name)| (kw.to_string(), name.to_string()));
        if let Some((kw, name)) = matched {
            let mut feature =
                Feature::new(self.location(), kw, name, self.language.clone());
            feature.tags = mem::take(&mut self.pending_tags);
            self.feature = Some(feature);
            self.state = State::Feature;
            return Ok(());
        }
        if self.matches_block(line, Category::Scenario)
            || self.matches_block(line, Category::ScenarioOutline)
        {
            return Err(self.error("Scenario may not occur before Feature"));
        }
        if self.matches_block(line, Category::Background) {
            return Err(self.error("Background may not occur before Feature"));
        }
        Err(self.failure())
    }

    fn action_feature(&mut self, line: &str) -> Result<(), ParserError> {
        if self.detect_next_scenario(line)? {
            return Ok(());
        }
        let matched = keyword::strip_block_keyword(
            line,
            self.keywords.get(Category::Background),
        )
        .map(|(kw, name)| (kw.to_string(), name.to_string()));
        if let Some((kw, name)) = matched {
            let location = self.location();
            let feature = self.open_feature()?;
            feature.background = Some(Background::new(location, kw, name));
            self.block = Some(Block::Background);
            self.last_step_type = None;
            self.state = State::Steps;
            return Ok(());
        }
        self.open_feature()?.description.push(line.to_string());
        Ok(())
    }

    fn action_next_scenario(&mut self, line: &str) -> Result<(), ParserError> {
        if self.detect_next_scenario(line)? {
            return Ok(());
        }
        if self.matches_block(line, Category::Background) {
            return Err(self.error("Background does not support tags"));
        }
        Err(self.error(
            "tag lines must be followed by a Scenario or Scenario Outline",
        ))
    }

    fn action_scenario(&mut self, line: &str) -> Result<(), ParserError> {
        if let Some(step) = self.parse_step(line)? {
            self.current_steps()?.push(step);
            self.state = State::Steps;
            return Ok(());
        }
        if self.detect_next_scenario(line)? {
            return Ok(());
        }
        self.current_description()?.push(line.to_string());
        Ok(())
    }

    fn action_steps(&mut self, line: &str) -> Result<(), ParserError> {
        if line.starts_with("\"\"\"") || line.starts_with("'''") {
            if self.current_steps()?.last().is_none() {
                return Err(self.error("multi-line text must follow a step"));
            }
            self.text_terminator =
                if line.starts_with("\"\"\"") { "\"\"\"" } else { "'''" };
            self.text_indent = self
                .line_text
                .chars()
                .take_while(|c| c.is_whitespace())
                .count();
            self.text_lines.clear();
            self.state = State::Multiline;
            return Ok(());
        }
        if line.starts_with('|') {
            if self.current_steps()?.last().is_none() {
                return Err(self.error("table must follow a step"));
            }
            self.current_table = None;
            self.state = State::Table;
            return self.action_table(line);
        }
        if let Some(step) = self.parse_step(line)? {
            self.current_steps()?.push(step);
            return Ok(());
        }
        let matched = keyword::strip_block_keyword(
            line,
            self.keywords.get(Category::Examples),
        )
        .map(|(kw, name)| (kw.to_string(), name.to_string()));
        if let Some((kw, name)) = matched {
            if self.block != Some(Block::Outline) {
                return Err(self.error(
                    "Examples must only appear inside a Scenario Outline",
                ));
            }
            let examples = Examples::new(self.location(), kw, name);
            let err = self.failure();
            match self.feature.as_mut().and_then(|f| f.scenarios.last_mut()) {
                Some(ScenarioKind::Outline(outline)) => {
                    outline.examples.push(examples);
                }
                _ => return Err(err),
            }
            self.examples_open = true;
            self.current_table = None;
            self.state = State::Table;
            return Ok(());
        }
        if self.detect_next_scenario(line)? {
            return Ok(());
        }
        Err(self.failure())
    }

    fn action_multiline(&mut self, raw: &str) -> Result<(), ParserError> {
        if raw.trim().starts_with(self.text_terminator) {
            let text = self.text_lines.join("\n");
            self.text_lines.clear();
            let step = self.last_step()?;
            step.text = Some(text);
            strip_trailing_colon(step);
            self.state = State::Steps;
            return Ok(());
        }
        // Dedent by the opening quote's column. Anything but whitespace in
        // that span means real content would be clipped.
        let cut = raw
            .char_indices()
            .nth(self.text_indent)
            .map_or(raw.len(), |(i, _)| i);
        let (indent, body) = raw.split_at(cut);
        if indent.chars().any(|c| !c.is_whitespace()) {
            return Err(self.error(format!(
                "multi-line text is indented less than its opening quote \
                 (column {})",
                self.text_indent + 1,
            )));
        }
        self.text_lines.push(body.to_string());
        Ok(())
    }

    fn action_table(&mut self, line: &str) -> Result<(), ParserError> {
        if !line.starts_with('|') {
            self.finalize_table()?;
            self.state = State::Steps;
            return self.action_steps(line);
        }
        let mut cells: Vec<String> =
            line.split('|').map(|cell| cell.trim().to_string()).collect();
        // Drop the fragments outside the outer pipes.
        if cells.len() >= 2 {
            let _ = cells.remove(0);
            let _ = cells.pop();
        }
        match self.current_table.as_ref().map(|t| t.headings.len()) {
            None => {
                let mut table = Table::new(cells);
                table.line = Some(self.line_no);
                self.current_table = Some(table);
            }
            Some(expected) => {
                if cells.len() != expected {
                    return Err(self.error(format!(
                        "malformed table row: expected {expected} cells, \
                         found {}",
                        cells.len(),
                    )));
                }
                let row = Row::new(cells, self.line_no);
                if let Some(table) = &mut self.current_table {
                    table.push_row(row);
                }
            }
        }
        Ok(())
    }

    /// Shared sub-action: a tag line or a scenario/outline keyword line
    /// starting the next scenario. Returns whether `line` was consumed.
    fn detect_next_scenario(&mut self, line: &str) -> Result<bool, ParserError> {
        if line.starts_with('@') {
            self.parse_tags(line)?;
            self.state = State::NextScenario;
            return Ok(true);
        }
        let outline = keyword::strip_block_keyword(
            line,
            self.keywords.get(Category::ScenarioOutline),
        )
        .map(|(kw, name)| (kw.to_string(), name.to_string()));
        if let Some((kw, name)) = outline {
            let mut outline = ScenarioOutline::new(self.location(), kw, name);
            outline.tags = mem::take(&mut self.pending_tags);
            self.open_feature()?.scenarios.push(ScenarioKind::Outline(outline));
            self.begin_scenario(Block::Outline);
            return Ok(true);
        }
        let scenario = keyword::strip_block_keyword(
            line,
            self.keywords.get(Category::Scenario),
        )
        .map(|(kw, name)| (kw.to_string(), name.to_string()));
        if let Some((kw, name)) = scenario {
            let mut scenario = Scenario::new(self.location(), kw, name);
            scenario.tags = mem::take(&mut self.pending_tags);
            self.open_feature()?
                .scenarios
                .push(ScenarioKind::Scenario(scenario));
            self.begin_scenario(Block::Scenario);
            return Ok(true);
        }
        Ok(false)
    }

    fn begin_scenario(&mut self, block: Block) {
        self.block = Some(block);
        self.last_step_type = None;
        self.examples_open = false;
        self.state = State::Scenario;
    }

    /// Matches `line` against the step keywords of the active language:
    /// case-sensitively first, then a case-folded fallback pass, category
    /// order `given, when, then, and, but` within each pass.
    fn parse_step(&mut self, line: &str) -> Result<Option<Step>, ParserError> {
        const CATEGORIES: [(Category, Option<StepType>); 5] = [
            (Category::Given, Some(StepType::Given)),
            (Category::When, Some(StepType::When)),
            (Category::Then, Some(StepType::Then)),
            (Category::And, None),
            (Category::But, None),
        ];
        let mut matched: Option<(String, Option<StepType>, String)> = None;
        'search: for case_insensitive in [false, true] {
            for (category, step_type) in CATEGORIES {
                for alias in self.keywords.get(category) {
                    if let Some(rest) =
                        keyword::strip_keyword(line, alias, case_insensitive)
                    {
                        matched = Some((
                            alias.trim_end_matches('<').to_string(),
                            step_type,
                            rest.trim().to_string(),
                        ));
                        break 'search;
                    }
                }
            }
        }
        let Some((kw, step_type, name)) = matched else {
            return Ok(None);
        };
        // And/But inherit the type of the last primary step.
        let step_type = match step_type {
            Some(ty) => {
                self.last_step_type = Some(ty);
                ty
            }
            None => self.last_step_type.ok_or_else(|| {
                self.error("And/But must follow a Given, When or Then step")
            })?,
        };
        Ok(Some(Step::new(self.location(), kw, step_type, name)))
    }

    fn parse_tags(&mut self, line: &str) -> Result<(), ParserError> {
        for token in line.split_whitespace() {
            if let Some(name) = token.strip_prefix('@') {
                self.pending_tags
                    .push(Tag { name: name.to_string(), line: self.line_no });
            } else if token.starts_with('#') {
                // Trailing comment ends the tag line.
                break;
            } else {
                return Err(
                    self.error(format!("invalid token in tag line: {token}"))
                );
            }
        }
        Ok(())
    }

    fn set_language(&mut self, code: &str) -> Result<(), ParserError> {
        match self.table.keywords(code) {
            Ok(keywords) => {
                self.keywords = keywords.clone();
                self.language = code.to_string();
                Ok(())
            }
            Err(e) => Err(self.error(e.to_string())),
        }
    }

    fn finalize_table(&mut self) -> Result<(), ParserError> {
        let Some(table) = self.current_table.take() else {
            return Ok(());
        };
        if self.examples_open {
            self.examples_open = false;
            let err = self.failure();
            match self.feature.as_mut().and_then(|f| f.scenarios.last_mut()) {
                Some(ScenarioKind::Outline(outline)) => {
                    match outline.examples.last_mut() {
                        Some(examples) => {
                            examples.table = Some(table);
                            Ok(())
                        }
                        None => Err(err),
                    }
                }
                _ => Err(err),
            }
        } else {
            let step = self.last_step()?;
            step.table = Some(table);
            strip_trailing_colon(step);
            Ok(())
        }
    }

    fn matches_block(&self, line: &str, category: Category) -> bool {
        keyword::strip_block_keyword(line, self.keywords.get(category))
            .is_some()
    }

    fn open_feature(&mut self) -> Result<&mut Feature, ParserError> {
        let err = self.failure();
        self.feature.as_mut().ok_or(err)
    }

    fn current_steps(&mut self) -> Result<&mut Vec<Step>, ParserError> {
        let err = self.failure();
        match self.block {
            Some(Block::Bare) => Ok(&mut self.bare_steps),
            Some(Block::Background) => self
                .feature
                .as_mut()
                .and_then(|f| f.background.as_mut())
                .map(|bg| &mut bg.steps)
                .ok_or(err),
            Some(Block::Scenario | Block::Outline) => {
                match self.feature.as_mut().and_then(|f| f.scenarios.last_mut())
                {
                    Some(ScenarioKind::Scenario(s)) => Ok(&mut s.steps),
                    Some(ScenarioKind::Outline(o)) => Ok(&mut o.steps),
                    None => Err(err),
                }
            }
            None => Err(err),
        }
    }

    fn current_description(&mut self) -> Result<&mut Vec<String>, ParserError> {
        let err = self.failure();
        match self.feature.as_mut().and_then(|f| f.scenarios.last_mut()) {
            Some(ScenarioKind::Scenario(s)) => Ok(&mut s.description),
            Some(ScenarioKind::Outline(o)) => Ok(&mut o.description),
            None => Err(err),
        }
    }

    fn last_step(&mut self) -> Result<&mut Step, ParserError> {
        let err = self.failure();
        self.current_steps()?.last_mut().ok_or(err)
    }

    fn location(&self) -> FileLocation {
        FileLocation::new(self.filename.as_str(), self.line_no)
    }

    fn error(&self, reason: impl Into<String>) -> ParserError {
        ParserError {
            reason: reason.into(),
            line: Some(self.line_no),
            line_text: Some(self.line_text.trim().to_string()),
            filename: Some(self.filename.clone()),
        }
    }

    fn failure(&self) -> ParserError {
        self.error(format!("parser failure in state {}", self.state))
    }
}

/// Drops the conventional trailing colon from a step name once an argument
/// (text or table) attaches to it.
fn strip_trailing_colon(step: &mut Step) {
    if let Some(stripped) = step.name.strip_suffix(':') {
        step.name = stripped.to_string();
    }
}
