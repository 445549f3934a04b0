//! SQL statement builders for the Postgres store
//!
//! Every builder returns a `QueryBuilder` whose values are bound as
//! parameters; only column and table names, which come from the entity's
//! field enum, are spliced into the text.

use sqlx::{Postgres, QueryBuilder};

use crate::repository::{
    Entity, Field, FieldValue, Filter, FilterOperator, QuerySpec, Record, UpdateSet,
};

type Builder = QueryBuilder<'static, Postgres>;

/// `SELECT * FROM t [WHERE ..] [ORDER BY ..] [LIMIT $n OFFSET $m]`
pub(crate) fn select<E: Entity>(spec: &QuerySpec<E::Field>) -> Builder {
    let mut builder = Builder::new(format!("SELECT * FROM {}", E::TABLE));
    push_where(&mut builder, &spec.filters);

    if !spec.order.is_empty() {
        builder.push(" ORDER BY ");
        for (i, (field, direction)) in spec.order.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(field.column()).push(" ").push(direction.as_sql());
        }
    }

    if let Some(window) = spec.window {
        builder
            .push(" LIMIT ")
            .push_bind(clamp_i64(window.limit))
            .push(" OFFSET ")
            .push_bind(clamp_i64(window.offset));
    }
    builder
}

/// `SELECT COUNT(*) FROM t [WHERE ..]`
pub(crate) fn count<E: Entity>(filters: &[Filter<E::Field>]) -> Builder {
    let mut builder = Builder::new(format!("SELECT COUNT(*) FROM {}", E::TABLE));
    push_where(&mut builder, filters);
    builder
}

/// `INSERT INTO t (..) VALUES (..) RETURNING *`
pub(crate) fn insert<E: Entity>(record: &Record) -> Builder {
    let mut builder = Builder::new(format!("INSERT INTO {}", E::TABLE));
    if record.is_empty() {
        builder.push(" DEFAULT VALUES RETURNING *");
        return builder;
    }

    builder.push(" (");
    for (i, (column, _)) in record.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(column);
    }
    builder.push(") VALUES (");
    for (i, (_, value)) in record.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        push_value(&mut builder, value);
    }
    builder.push(") RETURNING *");
    builder
}

/// `UPDATE t SET a = $1, .. [WHERE ..]`
pub(crate) fn update<E: Entity>(
    filters: &[Filter<E::Field>],
    setters: &UpdateSet<E::Field>,
) -> Builder {
    let mut builder = Builder::new(format!("UPDATE {} SET ", E::TABLE));
    for (i, (field, value)) in setters.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(field.column()).push(" = ");
        push_value(&mut builder, value);
    }
    push_where(&mut builder, filters);
    builder
}

/// `DELETE FROM t [WHERE ..]`
pub(crate) fn delete<E: Entity>(filters: &[Filter<E::Field>]) -> Builder {
    let mut builder = Builder::new(format!("DELETE FROM {}", E::TABLE));
    push_where(&mut builder, filters);
    builder
}

fn push_where<F: Field>(builder: &mut Builder, filters: &[Filter<F>]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        push_condition(builder, filter);
    }
}

fn push_condition<F: Field>(builder: &mut Builder, filter: &Filter<F>) {
    let column = filter.field.column();
    let comparison = match filter.operator {
        FilterOperator::IsNull => {
            builder.push(column).push(" IS NULL");
            return;
        }
        FilterOperator::IsNotNull => {
            builder.push(column).push(" IS NOT NULL");
            return;
        }
        FilterOperator::In => {
            match &filter.value {
                FieldValue::IntegerList(_) | FieldValue::TextList(_) => {
                    builder.push(column).push(" = ANY(");
                    push_value(builder, &filter.value);
                    builder.push(")");
                }
                // IN over a scalar never matches
                _ => {
                    builder.push("FALSE");
                }
            }
            return;
        }
        FilterOperator::Equal => " = ",
        FilterOperator::NotEqual => " <> ",
        FilterOperator::GreaterThan => " > ",
        FilterOperator::GreaterThanOrEqual => " >= ",
        FilterOperator::LessThan => " < ",
        FilterOperator::LessThanOrEqual => " <= ",
        FilterOperator::Like => " LIKE ",
    };
    builder.push(column).push(comparison);
    push_value(builder, &filter.value);
}

fn push_value(builder: &mut Builder, value: &FieldValue) {
    match value {
        FieldValue::Integer(n) => {
            builder.push_bind(*n);
        }
        FieldValue::Text(s) => {
            builder.push_bind(s.clone());
        }
        FieldValue::Boolean(b) => {
            builder.push_bind(*b);
        }
        FieldValue::Date(d) => {
            builder.push_bind(*d);
        }
        FieldValue::Timestamp(ts) => {
            builder.push_bind(*ts);
        }
        FieldValue::IntegerList(list) => {
            builder.push_bind(list.clone());
        }
        FieldValue::TextList(list) => {
            builder.push_bind(list.clone());
        }
        FieldValue::Null => {
            builder.push("NULL");
        }
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::entities::{Course, CourseField, Student, StudentField};
    use crate::repository::{OrderDirection, Window};

    #[test]
    fn test_select_all() {
        let spec = QuerySpec::<CourseField>::default();
        assert_eq!(select::<Course>(&spec).sql(), "SELECT * FROM courses");
    }

    #[test]
    fn test_select_with_filters_order_and_window() {
        let spec = QuerySpec {
            filters: vec![
                Filter::gte(CourseField::Credits, 3),
                Filter::like(CourseField::Title, "Intro%"),
            ],
            order: vec![
                (CourseField::Credits, OrderDirection::Descending),
                (CourseField::Id, OrderDirection::Ascending),
            ],
            window: Some(Window::new(20, 10)),
        };

        assert_eq!(
            select::<Course>(&spec).sql(),
            "SELECT * FROM courses WHERE credits >= $1 AND title LIKE $2 \
             ORDER BY credits DESC, id ASC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn test_null_checks_bind_nothing() {
        let spec = QuerySpec {
            filters: vec![
                Filter::is_null(StudentField::Picture),
                Filter::is_not_null(StudentField::IdNumber),
            ],
            ..QuerySpec::default()
        };
        assert_eq!(
            select::<Student>(&spec).sql(),
            "SELECT * FROM students WHERE picture IS NULL AND id_number IS NOT NULL"
        );
    }

    #[test]
    fn test_in_renders_any() {
        let filters = [Filter::in_list(CourseField::Id, vec![1, 2, 3])];
        assert_eq!(
            count::<Course>(&filters).sql(),
            "SELECT COUNT(*) FROM courses WHERE id = ANY($1)"
        );
    }

    #[test]
    fn test_in_over_scalar_is_false() {
        let filters = [Filter::in_list(CourseField::Id, 4)];
        assert_eq!(
            count::<Course>(&filters).sql(),
            "SELECT COUNT(*) FROM courses WHERE FALSE"
        );
    }

    #[test]
    fn test_insert_returns_row() {
        let record = Record::new()
            .with(CourseField::Title, "Algebra")
            .with(CourseField::Credits, 3);
        assert_eq!(
            insert::<Course>(&record).sql(),
            "INSERT INTO courses (credits, title) VALUES ($1, $2) RETURNING *"
        );
    }

    #[test]
    fn test_insert_null_is_literal() {
        let record = Record::new()
            .with(StudentField::FirstName, "Ada")
            .with(StudentField::Picture, None::<String>);
        assert_eq!(
            insert::<Student>(&record).sql(),
            "INSERT INTO students (first_name, picture) VALUES ($1, NULL) RETURNING *"
        );
    }

    #[test]
    fn test_update_sets_only_named_fields() {
        let setters = UpdateSet::new()
            .set(CourseField::Title, "X")
            .touch::<Course>(Utc::now(), "sys");
        let filters = [Filter::eq(CourseField::Id, 7)];

        assert_eq!(
            update::<Course>(&filters, &setters).sql(),
            "UPDATE courses SET title = $1, updated_at = $2, updated_by = $3 WHERE id = $4"
        );
    }

    #[test]
    fn test_delete_by_predicate() {
        let filters = [Filter::eq(CourseField::Id, 7)];
        assert_eq!(
            delete::<Course>(&filters).sql(),
            "DELETE FROM courses WHERE id = $1"
        );
    }
}
