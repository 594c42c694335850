// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Definitions for [`Collection`] which is used to store [`StepFn`]s and
//! corresponding [`Regex`] patterns.

use std::{
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    ops::Deref,
};

use linked_hash_map::LinkedHashMap;
use regex::Regex;

use super::{Argument, Match, Registry, StepFn};
use crate::model::StepType;

/// Collection of [`StepFn`]s keyed by the [`Regex`] matching their steps.
///
/// Patterns are tried in registration order and the first capturing one
/// wins, so lookups are deterministic even when patterns overlap.
pub struct Collection<World> {
    given: LinkedHashMap<HashableRegex, StepFn<World>>,
    when: LinkedHashMap<HashableRegex, StepFn<World>>,
    then: LinkedHashMap<HashableRegex, StepFn<World>>,
}

impl<World> Debug for Collection<World> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let patterns = |map: &LinkedHashMap<HashableRegex, StepFn<World>>| {
            map.keys().map(|re| re.as_str().to_owned()).collect::<Vec<_>>()
        };
        f.debug_struct("Collection")
            .field("given", &patterns(&self.given))
            .field("when", &patterns(&self.when))
            .field("then", &patterns(&self.then))
            .finish()
    }
}

impl<World> Default for Collection<World> {
    fn default() -> Self {
        Self {
            given: LinkedHashMap::new(),
            when: LinkedHashMap::new(),
            then: LinkedHashMap::new(),
        }
    }
}

impl<World> Collection<World> {
    /// Creates an empty [`Collection`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an implementation for `Given` steps whose name matches `regex`.
    #[must_use]
    pub fn given(mut self, regex: Regex, step: StepFn<World>) -> Self {
        let _ = self.given.insert(regex.into(), step);
        self
    }

    /// Adds an implementation for `When` steps whose name matches `regex`.
    #[must_use]
    pub fn when(mut self, regex: Regex, step: StepFn<World>) -> Self {
        let _ = self.when.insert(regex.into(), step);
        self
    }

    /// Adds an implementation for `Then` steps whose name matches `regex`.
    #[must_use]
    pub fn then(mut self, regex: Regex, step: StepFn<World>) -> Self {
        let _ = self.then.insert(regex.into(), step);
        self
    }
}

impl<World> Registry<World> for Collection<World> {
    fn find(&self, ty: StepType, name: &str) -> Option<Match<World>> {
        let collection = match ty {
            StepType::Given => &self.given,
            StepType::When => &self.when,
            StepType::Then => &self.then,
        };

        let (regex, captures, func) =
            collection.iter().find_map(|(re, func)| {
                re.captures(name).map(|c| (re, c, func))
            })?;

        // Group 0 is the whole match; only real capture groups become
        // arguments. Offsets are in characters, not bytes.
        let group_names: Vec<Option<&str>> = regex.capture_names().collect();
        let arguments = captures
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, group)| {
                let group_name = group_names
                    .get(i)
                    .copied()
                    .flatten()
                    .map(ToOwned::to_owned);
                group.map_or_else(
                    || Argument {
                        start: 0,
                        end: 0,
                        original: String::new(),
                        value: String::new(),
                        name: group_name.clone(),
                    },
                    |m| Argument {
                        start: name[..m.start()].chars().count(),
                        end: name[..m.end()].chars().count(),
                        original: m.as_str().to_owned(),
                        value: m.as_str().to_owned(),
                        name: group_name.clone(),
                    },
                )
            })
            .collect();

        Some(Match {
            func: *func,
            arguments,
            pattern: regex.as_str().to_owned(),
        })
    }
}

/// [`Regex`] wrapper to store inside a [`LinkedHashMap`].
#[derive(Clone, Debug)]
struct HashableRegex(Regex);

impl From<Regex> for HashableRegex {
    fn from(re: Regex) -> Self {
        HashableRegex(re)
    }
}

impl Hash for HashableRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_str().hash(state);
    }
}

impl PartialEq for HashableRegex {
    fn eq(&self, other: &HashableRegex) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Eq for HashableRegex {}

impl Deref for HashableRegex {
    type Target = Regex;

    fn deref(&self) -> &Regex {
        &self.0
    }
}
