//! Render a search [`Predicate`] and sort keys as Postgres SQL.
//!
//! Every value is bound as a parameter. Column names come from a fixed
//! table keyed by [`Field`], so nothing from the request is spliced into the
//! statement text. The rendering must agree with [`Predicate::matches`]:
//! a NULL column fails `=`, `IN` and `ILIKE`, just as a missing value does
//! in memory.
//!
//! Queries using these helpers alias `businesses` as `b` and the joined
//! `locations` as `l`.

use bizdir_core::Attribute;
use bizdir_search::{Clause, Field, Predicate, SortDirection, SortKey, Value};
use sqlx::{Postgres, QueryBuilder};

fn column(field: Field) -> &'static str {
    match field {
        Field::Status => "b.status",
        Field::CategoryId => "b.category_id",
        Field::RegionId => "b.region_id",
        Field::LocationName => "l.name",
        Field::Name => "b.name",
        Field::Description => "b.description",
        Field::Address => "b.address",
        Field::Website => "b.website",
        Field::Attribute(attribute) => match attribute {
            Attribute::Verified => "b.verified",
            Attribute::Premium => "b.premium",
            Attribute::HasCoupons => "b.has_coupons",
            Attribute::AcceptsOnlineOrders => "b.accepts_online_orders",
            Attribute::KidFriendly => "b.kid_friendly",
            Attribute::Sponsored => "b.sponsored",
        },
    }
}

/// Escape `LIKE` metacharacters so `needle` matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Text(text) => qb.push_bind(text.clone()),
        Value::Int(n) => qb.push_bind(*n),
        Value::Bool(b) => qb.push_bind(*b),
    };
}

fn push_clause(qb: &mut QueryBuilder<'_, Postgres>, clause: &Clause) {
    match clause {
        Clause::Eq(field, value) => {
            qb.push(column(*field)).push(" = ");
            push_value(qb, value);
        }
        Clause::In(_, values) if values.is_empty() => {
            qb.push("FALSE");
        }
        Clause::In(field, values) => {
            qb.push(column(*field)).push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, value);
            }
            qb.push(")");
        }
        Clause::Contains(field, needle) => {
            qb.push(column(*field))
                .push(" ILIKE '%' || ")
                .push_bind(escape_like(needle))
                .push(" || '%'");
        }
        Clause::AnyOf(group) if group.is_empty() => {
            qb.push("FALSE");
        }
        Clause::AnyOf(group) => {
            qb.push("(");
            for (i, inner) in group.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_clause(qb, inner);
            }
            qb.push(")");
        }
        Clause::Never => {
            qb.push("FALSE");
        }
    }
}

/// Append ` WHERE ...` for `predicate`. The empty predicate renders `TRUE`.
pub fn push_where(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    qb.push(" WHERE ");
    if predicate.clauses().is_empty() {
        qb.push("TRUE");
        return;
    }
    for (i, clause) in predicate.clauses().iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        push_clause(qb, clause);
    }
}

/// Append ` ORDER BY ...`; nothing when `keys` is empty.
pub fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    qb.push(" ORDER BY ");
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        let (expr, direction) = match *key {
            SortKey::Promoted(dir) => ("(b.premium OR b.sponsored)", dir),
            SortKey::CreatedAt(dir) => ("b.created_at", dir),
            SortKey::Id(dir) => ("b.id", dir),
        };
        qb.push(expr).push(match direction {
            SortDirection::Asc => " ASC",
            SortDirection::Desc => " DESC",
        });
    }
}
