// Copyright (c) 2018-2023  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Boolean tag expressions selecting which parsed elements execute.
//!
//! An expression is built from a list of raw strings, each one AND-term
//! holding comma-separated OR-terms: `["@wip,@slow", "-@broken"]` reads as
//! `(wip OR slow) AND (NOT broken)`.

use std::{collections::HashMap, fmt};

use derive_more::{Display, Error};
use itertools::Itertools as _;
use sealed::sealed;

use crate::model::Tag;

/// Error of constructing a [`TagExpression`].
#[derive(Clone, Debug, Display, Error)]
pub enum TagExprError {
    /// The same bare tag was given two different usage limits.
    #[display(
        fmt = "Inconsistent tag limits for @{}: {} != {}",
        tag,
        existing,
        conflicting
    )]
    InconsistentTagLimit {
        /// Bare tag name carrying the limits.
        tag: String,
        /// Limit recorded first.
        existing: u32,
        /// Limit seen later.
        conflicting: u32,
    },

    /// A `:<n>` suffix did not hold an integer.
    #[display(fmt = "Invalid tag limit for @{}: {:?}", tag, value)]
    InvalidLimit {
        /// Bare tag name carrying the suffix.
        tag: String,
        /// The non-numeric suffix text.
        value: String,
    },
}

/// One OR-term of a [`TagExpression`]: a normalized tag name, optionally
/// negated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Term {
    /// Bare tag name, without `@`, negation marker or limit suffix.
    pub name: String,
    /// Whether this term matches on the tag being *absent*.
    pub negated: bool,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "-{}", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// AND-of-ORs boolean filter over tag names, with per-tag usage limits kept
/// as metadata.
///
/// [`TagExpression::check()`] implements only the boolean part; a caller
/// wanting to enforce "run at most N items tagged `@foo`" consults
/// [`TagExpression::limits()`] itself.
#[derive(Clone, Debug, Default)]
pub struct TagExpression {
    ands: Vec<Vec<Term>>,
    limits: HashMap<String, u32>,
}

impl TagExpression {
    /// Builds an expression from raw AND-term strings.
    ///
    /// Each string is split on commas into OR-terms. A term is normalized by
    /// trimming whitespace, converting a leading `~` into `-`, and stripping
    /// the `@` sigil; a trailing `:<n>` records a usage limit for the bare
    /// tag name.
    ///
    /// # Errors
    ///
    /// - [`TagExprError::InconsistentTagLimit`] if the same bare tag carries
    ///   two different limits across the input strings.
    /// - [`TagExprError::InvalidLimit`] if a limit suffix is not an integer.
    pub fn new<S: AsRef<str>>(raw: &[S]) -> Result<Self, TagExprError> {
        let mut expr = Self::default();
        for and_term in raw {
            let mut ors = Vec::new();
            for piece in and_term.as_ref().split(',') {
                let piece = piece.trim();
                if piece.is_empty() {
                    continue;
                }
                ors.push(expr.normalize(piece)?);
            }
            if !ors.is_empty() {
                expr.ands.push(ors);
            }
        }
        Ok(expr)
    }

    fn normalize(&mut self, piece: &str) -> Result<Term, TagExprError> {
        let (negated, rest) = match piece.strip_prefix(&['~', '-'][..]) {
            Some(rest) => (true, rest),
            None => (false, piece),
        };
        let rest = rest.strip_prefix('@').unwrap_or(rest);

        let name = match rest.split_once(':') {
            Some((name, limit)) => {
                let parsed: u32 = limit.trim().parse().map_err(|_| {
                    TagExprError::InvalidLimit {
                        tag: name.to_string(),
                        value: limit.to_string(),
                    }
                })?;
                if let Some(&existing) = self.limits.get(name) {
                    if existing != parsed {
                        return Err(TagExprError::InconsistentTagLimit {
                            tag: name.to_string(),
                            existing,
                            conflicting: parsed,
                        });
                    }
                } else {
                    let _ = self.limits.insert(name.to_string(), parsed);
                }
                name
            }
            None => rest,
        };

        Ok(Term { name: name.to_string(), negated })
    }

    /// Evaluates this expression against a concrete set of tag names.
    ///
    /// An empty expression matches everything.
    #[must_use]
    pub fn check<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone,
    {
        self.ands.iter().all(|ors| {
            ors.iter().any(|term| {
                let present = tags
                    .clone()
                    .into_iter()
                    .any(|tag| tag.as_ref() == term.name);
                present != term.negated
            })
        })
    }

    /// Whether no filtering is expressed at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ands.is_empty()
    }

    /// Per-tag usage limits gathered from `:<n>` suffixes.
    #[must_use]
    pub fn limits(&self) -> &HashMap<String, u32> {
        &self.limits
    }

    /// The normalized AND-of-ORs structure.
    #[must_use]
    pub fn ands(&self) -> &[Vec<Term>] {
        &self.ands
    }
}

// Renders back to the `"a,b c,d"` input form. Limit suffixes are not
// round-tripped.
impl fmt::Display for TagExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .ands
            .iter()
            .map(|ors| ors.iter().map(ToString::to_string).join(","))
            .join(" ");
        f.write_str(&rendered)
    }
}

/// Helper methods on lists of parsed [`Tag`]s.
#[sealed]
pub trait TagListExt {
    /// Tag names, in declaration order.
    fn names(&self) -> Vec<&str>;

    /// Whether a tag with the given name is present.
    #[must_use]
    fn contains_name(&self, name: &str) -> bool;
}

#[sealed]
impl TagListExt for [Tag] {
    fn names(&self) -> Vec<&str> {
        self.iter().map(|tag| tag.name.as_str()).collect()
    }

    fn contains_name(&self, name: &str) -> bool {
        self.iter().any(|tag| tag.name == name)
    }
}
