// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Localized [Gherkin] keyword table.
//!
//! Two conventions are encoded in the alias lists themselves:
//! - a leading `"*"` alias accepts the universal bullet step marker;
//! - a trailing `<` on an alias means no whitespace is required between the
//!   keyword and the step text (used by CJK languages). Without it, exactly
//!   one space must separate them.
//!
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

use derive_more::{Display, Error};
use linked_hash_map::LinkedHashMap;
use once_cell::sync::Lazy;

/// Language assumed when neither the caller nor a `# language:` directive
/// says otherwise.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Kind of keyword being looked up in a [`KeywordTable`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Category {
    /// `Feature:` block keyword.
    Feature,
    /// `Background:` block keyword.
    Background,
    /// `Scenario:` block keyword.
    Scenario,
    /// `Scenario Outline:` block keyword.
    ScenarioOutline,
    /// `Examples:` block keyword.
    Examples,
    /// `Given` step keyword.
    Given,
    /// `When` step keyword.
    When,
    /// `Then` step keyword.
    Then,
    /// `And` step keyword.
    And,
    /// `But` step keyword.
    But,
    /// English name of the language.
    Name,
    /// Native name of the language.
    Native,
}

/// Ordered keyword alias lists for a single language.
#[derive(Clone, Debug)]
pub struct Keywords {
    /// `Feature:` aliases.
    pub feature: Vec<String>,
    /// `Background:` aliases.
    pub background: Vec<String>,
    /// `Scenario:` aliases.
    pub scenario: Vec<String>,
    /// `Scenario Outline:` aliases.
    pub scenario_outline: Vec<String>,
    /// `Examples:` aliases.
    pub examples: Vec<String>,
    /// `Given` aliases.
    pub given: Vec<String>,
    /// `When` aliases.
    pub when: Vec<String>,
    /// `Then` aliases.
    pub then: Vec<String>,
    /// `And` aliases.
    pub and: Vec<String>,
    /// `But` aliases.
    pub but: Vec<String>,
    /// English name of the language.
    pub name: Vec<String>,
    /// Native name of the language.
    pub native: Vec<String>,
}

impl Keywords {
    #[allow(clippy::too_many_arguments)] // data-table constructor
    fn of(
        feature: &[&str],
        background: &[&str],
        scenario: &[&str],
        scenario_outline: &[&str],
        examples: &[&str],
        given: &[&str],
        when: &[&str],
        then: &[&str],
        and: &[&str],
        but: &[&str],
        name: &str,
        native: &str,
    ) -> Self {
        let owned =
            |kws: &[&str]| kws.iter().map(ToString::to_string).collect();
        Self {
            feature: owned(feature),
            background: owned(background),
            scenario: owned(scenario),
            scenario_outline: owned(scenario_outline),
            examples: owned(examples),
            given: owned(given),
            when: owned(when),
            then: owned(then),
            and: owned(and),
            but: owned(but),
            name: vec![name.to_string()],
            native: vec![native.to_string()],
        }
    }

    /// Returns the alias list for the given [`Category`].
    #[must_use]
    pub fn get(&self, category: Category) -> &[String] {
        match category {
            Category::Feature => &self.feature,
            Category::Background => &self.background,
            Category::Scenario => &self.scenario,
            Category::ScenarioOutline => &self.scenario_outline,
            Category::Examples => &self.examples,
            Category::Given => &self.given,
            Category::When => &self.when,
            Category::Then => &self.then,
            Category::And => &self.and,
            Category::But => &self.but,
            Category::Name => &self.name,
            Category::Native => &self.native,
        }
    }
}

/// Error of looking up a language code absent from a [`KeywordTable`].
#[derive(Clone, Debug, Display, Error)]
#[display(fmt = "Unknown language: {}", language)]
pub struct UnknownLanguageError {
    /// The language code that was requested.
    pub language: String,
}

/// Mapping from language codes to their [`Keywords`].
///
/// This is a plain value: parsers receive the table they should use instead
/// of consulting process-wide state, so parses with different tables can
/// coexist. [`KeywordTable::default()`] carries the built-in languages, and
/// [`default_table()`] provides a shared copy for one-off use.
#[derive(Clone, Debug)]
pub struct KeywordTable {
    languages: LinkedHashMap<String, Keywords>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        let mut languages = LinkedHashMap::new();
        for (code, keywords) in builtin_languages() {
            let _ = languages.insert(code.to_string(), keywords);
        }
        Self { languages }
    }
}

impl KeywordTable {
    /// Creates a table with no languages at all.
    #[must_use]
    pub fn empty() -> Self {
        Self { languages: LinkedHashMap::new() }
    }

    /// Adds (or replaces) a language.
    pub fn insert(&mut self, code: impl Into<String>, keywords: Keywords) {
        let _ = self.languages.insert(code.into(), keywords);
    }

    /// Returns all [`Keywords`] of the given language.
    ///
    /// # Errors
    ///
    /// If the language code is absent from this table.
    pub fn keywords(
        &self,
        language: &str,
    ) -> Result<&Keywords, UnknownLanguageError> {
        self.languages.get(language).ok_or_else(|| UnknownLanguageError {
            language: language.to_string(),
        })
    }

    /// Returns the alias list of the given language and [`Category`].
    ///
    /// # Errors
    ///
    /// If the language code is absent from this table.
    pub fn lookup(
        &self,
        language: &str,
        category: Category,
    ) -> Result<&[String], UnknownLanguageError> {
        self.keywords(language).map(|kws| kws.get(category))
    }

    /// Language codes known to this table, in insertion order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}

/// Shared [`KeywordTable`] with the built-in languages, for callers that
/// don't need a customized one.
#[must_use]
pub fn default_table() -> &'static KeywordTable {
    static TABLE: Lazy<KeywordTable> = Lazy::new(KeywordTable::default);
    &TABLE
}

/// Strips a localized step `keyword` off the front of `line`, honoring the
/// trailing-`<` no-space convention, and returns the untrimmed remainder.
///
/// `case_insensitive` enables the ASCII-case-folded fallback pass.
pub(crate) fn strip_keyword<'a>(
    line: &'a str,
    keyword: &str,
    case_insensitive: bool,
) -> Option<&'a str> {
    let (bare, joined) = match keyword.strip_suffix('<') {
        Some(bare) => (bare, true),
        None => (keyword, false),
    };

    let matches_prefix = |prefix: &str| {
        line.get(..prefix.len()).map_or(false, |head| {
            if case_insensitive {
                head.eq_ignore_ascii_case(prefix)
            } else {
                head == prefix
            }
        })
    };

    if joined {
        matches_prefix(bare).then(|| &line[bare.len()..])
    } else {
        let with_space = format!("{bare} ");
        if matches_prefix(&with_space) {
            Some(&line[with_space.len()..])
        } else {
            None
        }
    }
}

/// Strips a localized block keyword (`Feature:`-class) off the front of
/// `line` and returns the matched alias plus the trimmed remainder (the
/// block's name).
pub(crate) fn strip_block_keyword<'a, 'k>(
    line: &'a str,
    aliases: &'k [String],
) -> Option<(&'k str, &'a str)> {
    aliases.iter().find_map(|alias| {
        line.strip_prefix(alias.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .map(|rest| (alias.as_str(), rest.trim()))
    })
}

#[rustfmt::skip]
fn builtin_languages() -> Vec<(&'static str, Keywords)> {
    vec![
        ("en", Keywords::of(
            &["Feature", "Business Need", "Ability"],
            &["Background"],
            &["Scenario", "Example"],
            &["Scenario Outline", "Scenario Template"],
            &["Examples", "Scenarios"],
            &["*", "Given"],
            &["*", "When"],
            &["*", "Then"],
            &["*", "And"],
            &["*", "But"],
            "English", "English",
        )),
        ("de", Keywords::of(
            &["Funktionalität"],
            &["Grundlage"],
            &["Szenario"],
            &["Szenariogrundriss"],
            &["Beispiele"],
            &["*", "Angenommen", "Gegeben sei"],
            &["*", "Wenn"],
            &["*", "Dann"],
            &["*", "Und"],
            &["*", "Aber"],
            "German", "Deutsch",
        )),
        ("es", Keywords::of(
            &["Característica"],
            &["Antecedentes"],
            &["Escenario"],
            &["Esquema del escenario"],
            &["Ejemplos"],
            &["*", "Dado", "Dada", "Dados", "Dadas"],
            &["*", "Cuando"],
            &["*", "Entonces"],
            &["*", "Y"],
            &["*", "Pero"],
            "Spanish", "español",
        )),
        ("fr", Keywords::of(
            &["Fonctionnalité"],
            &["Contexte"],
            &["Scénario"],
            &["Plan du scénario", "Plan du Scénario"],
            &["Exemples"],
            &["*", "Soit", "Etant donné", "Étant donné"],
            &["*", "Quand", "Lorsque", "Lorsqu'<"],
            &["*", "Alors"],
            &["*", "Et"],
            &["*", "Mais"],
            "French", "français",
        )),
        ("it", Keywords::of(
            &["Funzionalità"],
            &["Contesto"],
            &["Scenario"],
            &["Schema dello scenario"],
            &["Esempi"],
            &["*", "Dato", "Data", "Dati", "Date"],
            &["*", "Quando"],
            &["*", "Allora"],
            &["*", "E"],
            &["*", "Ma"],
            "Italian", "italiano",
        )),
        ("nl", Keywords::of(
            &["Functionaliteit"],
            &["Achtergrond"],
            &["Scenario"],
            &["Abstract Scenario"],
            &["Voorbeelden"],
            &["*", "Gegeven", "Stel"],
            &["*", "Als"],
            &["*", "Dan"],
            &["*", "En"],
            &["*", "Maar"],
            "Dutch", "Nederlands",
        )),
        ("pt", Keywords::of(
            &["Funcionalidade"],
            &["Contexto"],
            &["Cenário", "Cenario"],
            &["Esquema do Cenário", "Esquema do Cenario"],
            &["Exemplos"],
            &["*", "Dado", "Dada", "Dados", "Dadas"],
            &["*", "Quando"],
            &["*", "Então", "Entao"],
            &["*", "E"],
            &["*", "Mas"],
            "Portuguese", "português",
        )),
        ("ru", Keywords::of(
            &["Функция", "Функционал", "Свойство"],
            &["Предыстория", "Контекст"],
            &["Сценарий"],
            &["Структура сценария"],
            &["Примеры"],
            &["*", "Допустим", "Дано", "Пусть"],
            &["*", "Если", "Когда"],
            &["*", "То", "Тогда"],
            &["*", "И", "К тому же"],
            &["*", "Но", "А"],
            "Russian", "русский",
        )),
        ("ja", Keywords::of(
            &["フィーチャ", "機能"],
            &["背景"],
            &["シナリオ"],
            &["シナリオアウトライン", "シナリオテンプレート"],
            &["例", "サンプル"],
            &["*", "前提<"],
            &["*", "もし<"],
            &["*", "ならば<"],
            &["*", "かつ<"],
            &["*", "しかし<", "但し<", "ただし<"],
            "Japanese", "日本語",
        )),
        ("zh-CN", Keywords::of(
            &["功能"],
            &["背景"],
            &["场景"],
            &["场景大纲"],
            &["例子"],
            &["*", "假如<"],
            &["*", "当<"],
            &["*", "那么<"],
            &["*", "而且<"],
            &["*", "但是<"],
            "Chinese simplified", "简体中文",
        )),
    ]
}
