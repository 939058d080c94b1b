//! Backend-agnostic filter model.
//!
//! A [`Predicate`] is a conjunction of [`Clause`]s. Stores translate it into
//! their own query language; [`Predicate::matches`] is the reference
//! evaluation every translation must agree with.

use std::fmt;

use bizdir_core::{Attribute, BusinessRecord};

/// Filterable business columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Status,
    CategoryId,
    RegionId,
    /// Name of the embedded location record.
    LocationName,
    Name,
    Description,
    Address,
    Website,
    Attribute(Attribute),
}

impl Field {
    /// Fields searched by a free-text term.
    pub const TEXT_SEARCHABLE: [Field; 4] =
        [Field::Name, Field::Description, Field::Address, Field::Website];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Field::Status => "status",
            Field::CategoryId => "category_id",
            Field::RegionId => "region_id",
            Field::LocationName => "location.name",
            Field::Name => "name",
            Field::Description => "description",
            Field::Address => "address",
            Field::Website => "website",
            Field::Attribute(attr) => attr.as_str(),
        }
    }

    fn value_of(self, record: &BusinessRecord) -> Option<Value> {
        let text = |v: &Option<String>| v.clone().map(Value::Text);
        match self {
            Field::Status => Some(Value::Text(record.status.as_str().to_string())),
            Field::CategoryId => record.category_id.map(Value::Int),
            Field::RegionId => record.region_id.map(Value::Int),
            Field::LocationName => record
                .location
                .as_ref()
                .map(|loc| Value::Text(loc.name.clone())),
            Field::Name => Some(Value::Text(record.name.clone())),
            Field::Description => text(&record.description),
            Field::Address => text(&record.address),
            Field::Website => text(&record.website),
            Field::Attribute(attr) => Some(Value::Bool(record.has(attr))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Eq(Field, Value),
    In(Field, Vec<Value>),
    /// Case-insensitive substring match. A null field never matches.
    Contains(Field, String),
    /// OR-group. An empty group matches nothing.
    AnyOf(Vec<Clause>),
    /// Matches no record.
    Never,
}

impl Clause {
    #[must_use]
    pub fn matches(&self, record: &BusinessRecord) -> bool {
        match self {
            Clause::Eq(field, expected) => field.value_of(record).as_ref() == Some(expected),
            Clause::In(field, allowed) => field
                .value_of(record)
                .is_some_and(|actual| allowed.contains(&actual)),
            Clause::Contains(field, needle) => match field.value_of(record) {
                Some(Value::Text(haystack)) => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => false,
            },
            Clause::AnyOf(clauses) => clauses.iter().any(|c| c.matches(record)),
            Clause::Never => false,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Eq(field, value) => write!(f, "{} = {value}", field.name()),
            Clause::In(field, values) => {
                let list: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} IN ({})", field.name(), list.join(", "))
            }
            Clause::Contains(field, needle) => write!(f, "{} ~ '{needle}'", field.name()),
            Clause::AnyOf(clauses) => {
                let parts: Vec<String> = clauses.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(" OR "))
            }
            Clause::Never => f.write_str("FALSE"),
        }
    }
}

/// Conjunction of clauses. The empty predicate matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// True when some clause can never match, so no store call is needed.
    #[must_use]
    pub fn is_unsatisfiable(&self) -> bool {
        self.clauses.iter().any(|c| match c {
            Clause::Never => true,
            Clause::AnyOf(group) => group.is_empty(),
            Clause::In(_, values) => values.is_empty(),
            _ => false,
        })
    }

    #[must_use]
    pub fn matches(&self, record: &BusinessRecord) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str("TRUE");
        }
        let parts: Vec<String> = self.clauses.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use bizdir_core::{BusinessStatus, Location};
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn record() -> BusinessRecord {
        BusinessRecord {
            id: 1,
            public_id: Uuid::new_v4(),
            name: "Bourbon Coffee".to_string(),
            description: None,
            category_id: Some(3),
            location_id: Some(7),
            region_id: Some(1),
            category: None,
            location: Some(Location {
                id: 7,
                name: "Kigali".to_string(),
                latitude: Some(-1.9441),
                longitude: Some(30.0619),
                population: None,
                region_id: Some(1),
            }),
            region: None,
            address: Some("KN 4 Ave".to_string()),
            phone: None,
            email: None,
            website: None,
            verified: true,
            premium: false,
            sponsored: false,
            accepts_online_orders: false,
            kid_friendly: false,
            has_coupons: false,
            view_count: 0,
            click_count: 0,
            status: BusinessStatus::Active,
            ratings: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_predicate_matches_everything() {
        assert!(Predicate::all().matches(&record()));
    }

    #[test]
    fn never_matches_nothing() {
        assert!(!Predicate::all().and(Clause::Never).matches(&record()));
        assert!(Predicate::all().and(Clause::Never).is_unsatisfiable());
    }

    #[test]
    fn contains_is_case_insensitive() {
        let clause = Clause::Contains(Field::Name, "COFFEE".to_string());
        assert!(clause.matches(&record()));
    }

    #[test]
    fn contains_on_null_field_is_false() {
        let clause = Clause::Contains(Field::Description, "coffee".to_string());
        assert!(!clause.matches(&record()));
    }

    #[test]
    fn any_of_needs_one_branch() {
        let clause = Clause::AnyOf(vec![
            Clause::Contains(Field::Description, "kn 4".to_string()),
            Clause::Contains(Field::Address, "kn 4".to_string()),
        ]);
        assert!(clause.matches(&record()));
        assert!(!Clause::AnyOf(vec![]).matches(&record()));
    }

    #[test]
    fn in_clause_on_location_name() {
        let clause = Clause::In(
            Field::LocationName,
            vec![
                Value::Text("Nyamata".to_string()),
                Value::Text("Kigali".to_string()),
            ],
        );
        assert!(clause.matches(&record()));
    }

    #[test]
    fn attribute_equality() {
        let verified = Clause::Eq(Field::Attribute(Attribute::Verified), Value::Bool(true));
        let coupons = Clause::Eq(Field::Attribute(Attribute::HasCoupons), Value::Bool(true));
        assert!(verified.matches(&record()));
        assert!(!coupons.matches(&record()));
    }

    #[test]
    fn display_renders_conjunction() {
        let predicate = Predicate::all()
            .and(Clause::Eq(Field::CategoryId, Value::Int(3)))
            .and(Clause::Never);
        assert_eq!(predicate.to_string(), "category_id = 3 AND FALSE");
    }
}
