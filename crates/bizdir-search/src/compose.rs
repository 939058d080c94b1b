//! Turn a [`SearchRequest`] plus resolved references into a [`Predicate`].

use std::sync::LazyLock;

use bizdir_core::{BusinessStatus, SearchRequest};
use regex::Regex;

use crate::neighborhood::Neighborhood;
use crate::predicate::{Clause, Field, Predicate, Value};

/// Characters that carry meaning in filter/query syntax (LIKE wildcards,
/// list and group delimiters, double quotes, operators) plus control
/// characters. Apostrophes and dots stay: they occur in real names and
/// domains, and every backend binds the term as a parameter.
static STRUCTURAL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[%_,()*\\":;\[\]{}<>|!=?\p{Cc}]"#).expect("valid structural chars regex")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Strip query-structure punctuation from a free-text term.
///
/// Letters in any script, digits, spaces, hyphens, apostrophes, dots and
/// `&`/`#`/`+` survive; whitespace runs collapse to one space.
#[must_use]
pub fn sanitize_term(term: &str) -> String {
    let spaced = WHITESPACE_RUN.replace_all(term, " ");
    let stripped = STRUCTURAL_CHARS.replace_all(&spaced, "");
    WHITESPACE_RUN
        .replace_all(stripped.trim(), " ")
        .into_owned()
}

/// Result of resolving a human-readable reference to an identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The request did not ask for this filter.
    Absent,
    Found(T),
    /// The request named something that does not exist.
    Missing,
}

impl<T> Lookup<T> {
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Lookup::Missing, Lookup::Found)
    }
}

/// References resolved ahead of composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub category_id: Lookup<i64>,
    pub region_id: Lookup<i64>,
    pub neighborhood: Option<Neighborhood>,
}

impl Default for Resolved {
    fn default() -> Self {
        Self {
            category_id: Lookup::Absent,
            region_id: Lookup::Absent,
            neighborhood: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterComposer;

impl FilterComposer {
    /// Build the conjunction of every clause the request asks for.
    ///
    /// A reference that failed to resolve contributes [`Clause::Never`], so
    /// the predicate matches nothing instead of silently widening.
    #[must_use]
    pub fn compose(&self, request: &SearchRequest, resolved: &Resolved) -> Predicate {
        let mut predicate = Predicate::all().and(Clause::In(
            Field::Status,
            BusinessStatus::LISTABLE
                .iter()
                .map(|s| Value::Text(s.as_str().to_string()))
                .collect(),
        ));

        if let Some(clause) = id_clause(Field::CategoryId, &resolved.category_id) {
            predicate.push(clause);
        }
        if let Some(clause) = id_clause(Field::RegionId, &resolved.region_id) {
            predicate.push(clause);
        }
        if let Some(clause) = location_clause(request, resolved.neighborhood.as_ref()) {
            predicate.push(clause);
        }
        if let Some(clause) = term_clause(request.term.as_deref()) {
            predicate.push(clause);
        }
        for attribute in request.attributes.required() {
            predicate.push(Clause::Eq(Field::Attribute(attribute), Value::Bool(true)));
        }

        predicate
    }
}

fn id_clause(field: Field, lookup: &Lookup<i64>) -> Option<Clause> {
    match lookup {
        Lookup::Absent => None,
        Lookup::Found(id) => Some(Clause::Eq(field, Value::Int(*id))),
        Lookup::Missing => Some(Clause::Never),
    }
}

fn location_clause(request: &SearchRequest, neighborhood: Option<&Neighborhood>) -> Option<Clause> {
    let Some(hood) = neighborhood else {
        return request
            .location_name()
            .map(|name| Clause::Eq(Field::LocationName, Value::Text(name.to_string())));
    };

    if !hood.is_known() {
        return Some(Clause::Never);
    }

    // IN vs = is only a query-shape choice; both match the same rows.
    match hood.members.as_slice() {
        [] => Some(Clause::Eq(
            Field::LocationName,
            Value::Text(hood.center.clone()),
        )),
        [only] => Some(Clause::Eq(Field::LocationName, Value::Text(only.clone()))),
        many => Some(Clause::In(
            Field::LocationName,
            many.iter().cloned().map(Value::Text).collect(),
        )),
    }
}

fn term_clause(term: Option<&str>) -> Option<Clause> {
    let sanitized = sanitize_term(term?);
    if sanitized.is_empty() {
        return None;
    }
    Some(Clause::AnyOf(
        Field::TEXT_SEARCHABLE
            .iter()
            .map(|field| Clause::Contains(*field, sanitized.clone()))
            .collect(),
    ))
}
