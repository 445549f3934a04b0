//! In-process store used by tests and by `database.url = "memory://"`
//!
//! Rows live as [`Record`]s keyed by id. Each call takes the store-wide lock
//! once, so every statement is atomic and concurrent deletes of the same id
//! remove the row exactly once. Unique and foreign-key constraints declared
//! by the entity are enforced the way Postgres enforces them: NULLs never
//! collide, and deleting a referenced row fails with `StillReferenced`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::repository::{
    Constraint, Entity, Field, FieldValue, Filter, OrderDirection, QuerySpec, Record,
    RepositoryError, RepositoryOperation, RepositoryResult, Store, UpdateSet,
};

#[derive(Debug, Default)]
struct MemoryTable {
    next_id: i64,
    rows: BTreeMap<i64, Record>,
    // declared by the entity on first write; consulted by deletes elsewhere
    constraints: &'static [Constraint],
}

impl MemoryTable {
    fn matching<'a, F: Field>(
        &'a self,
        filters: &'a [Filter<F>],
    ) -> impl Iterator<Item = (&'a i64, &'a Record)> + 'a {
        self.rows
            .iter()
            .filter(move |(_, row)| row_matches(row, filters))
    }
}

type Tables = HashMap<&'static str, MemoryTable>;

/// Shared in-memory store; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn row_matches<F: Field>(row: &Record, filters: &[Filter<F>]) -> bool {
    filters
        .iter()
        .all(|filter| filter.matches(row.get(filter.field.column())))
}

fn compare_rows<F: Field>(a: &Record, b: &Record, order: &[(F, OrderDirection)]) -> Ordering {
    for (field, direction) in order {
        let column = field.column();
        let ordering = a.get(column).sort_cmp(b.get(column));
        let ordering = match direction {
            OrderDirection::Ascending => ordering,
            OrderDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn unique_key(row: &Record, columns: &[&str]) -> Option<Vec<FieldValue>> {
    let key: Vec<FieldValue> = columns.iter().map(|c| row.get(c).clone()).collect();
    // a key containing NULL never collides
    if key.iter().any(FieldValue::is_null) {
        None
    } else {
        Some(key)
    }
}

/// Check the entity's constraints for `candidates` against the table state
/// they would produce. `rows` is every row of the table after the change.
fn check_constraints<E: Entity>(
    tables: &Tables,
    rows: &BTreeMap<i64, Record>,
    candidates: &[i64],
    operation: RepositoryOperation,
) -> RepositoryResult<()> {
    for constraint in E::constraints() {
        match constraint {
            Constraint::Unique { name, columns } => {
                for id in candidates {
                    let Some(key) = rows.get(id).and_then(|row| unique_key(row, columns)) else {
                        continue;
                    };
                    let collides = rows.iter().any(|(other_id, other)| {
                        other_id != id && unique_key(other, columns).as_ref() == Some(&key)
                    });
                    if collides {
                        return Err(RepositoryError::constraint_violation(
                            operation,
                            format!("duplicate key value violates unique constraint \"{}\"", name),
                        ));
                    }
                }
            }
            Constraint::ForeignKey {
                name,
                column,
                references,
            } => {
                for id in candidates {
                    let value = rows.get(id).map_or(&FieldValue::Null, |row| row.get(column));
                    let target = match value {
                        FieldValue::Null => continue,
                        FieldValue::Integer(n) => *n,
                        other => {
                            return Err(RepositoryError::constraint_violation(
                                operation,
                                format!(
                                    "foreign key \"{}\" expects an integer, got {}",
                                    name,
                                    other.type_name()
                                ),
                            ))
                        }
                    };
                    let exists = if *references == E::TABLE {
                        rows.contains_key(&target)
                    } else {
                        tables
                            .get(references)
                            .is_some_and(|t| t.rows.contains_key(&target))
                    };
                    if !exists {
                        return Err(RepositoryError::constraint_violation(
                            operation,
                            format!(
                                "insert or update on table \"{}\" violates foreign key constraint \"{}\"",
                                E::TABLE, name
                            ),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

impl Store for MemoryStore {
    async fn fetch<E: Entity>(&self, spec: &QuerySpec<E::Field>) -> RepositoryResult<Vec<E>> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(E::TABLE) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&Record> = table.matching(&spec.filters).map(|(_, row)| row).collect();
        if !spec.order.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &spec.order));
        }

        let (skip, take) = match spec.window {
            Some(window) => (
                usize::try_from(window.offset).unwrap_or(usize::MAX),
                usize::try_from(window.limit).unwrap_or(usize::MAX),
            ),
            None => (0, usize::MAX),
        };

        rows.into_iter()
            .skip(skip)
            .take(take)
            .map(E::from_record)
            .collect()
    }

    async fn count<E: Entity>(&self, filters: &[Filter<E::Field>]) -> RepositoryResult<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .get(E::TABLE)
            .map_or(0, |table| table.matching(filters).count());
        Ok(count as u64)
    }

    async fn insert<E: Entity>(&self, mut record: Record) -> RepositoryResult<E> {
        let mut tables = self.tables.write().await;
        let table = tables.remove(E::TABLE).unwrap_or_default();
        let MemoryTable {
            next_id, mut rows, ..
        } = table;

        let id = next_id + 1;
        record.set(E::ID.column(), FieldValue::Integer(id));
        let result = E::from_record(&record).map_err(|e| e.with_operation(RepositoryOperation::Add));

        let result = match result {
            Ok(entity) => {
                rows.insert(id, record);
                match check_constraints::<E>(&tables, &rows, &[id], RepositoryOperation::Add) {
                    Ok(()) => Ok(entity),
                    Err(e) => {
                        rows.remove(&id);
                        Err(e)
                    }
                }
            }
            Err(e) => Err(e),
        };

        // the id is consumed even on failure, like a Postgres sequence
        tables.insert(
            E::TABLE,
            MemoryTable {
                next_id: id,
                rows,
                constraints: E::constraints(),
            },
        );
        result
    }

    async fn update_where<E: Entity>(
        &self,
        filters: &[Filter<E::Field>],
        setters: &UpdateSet<E::Field>,
    ) -> RepositoryResult<u64> {
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(E::TABLE) else {
            return Ok(0);
        };

        // pre-update copies of the matched rows, restored if the statement fails
        let mut originals: Vec<(i64, Record)> = Vec::new();
        let mut applied: RepositoryResult<()> = Ok(());
        for (id, row) in table.rows.iter_mut() {
            if !row_matches(row, filters) {
                continue;
            }
            originals.push((*id, row.clone()));
            for (field, value) in setters.iter() {
                row.set(field.column(), value.clone());
            }
            if let Err(e) = E::from_record(row) {
                applied = Err(e.with_operation(RepositoryOperation::UpdateWhere));
                break;
            }
        }

        if originals.is_empty() {
            return Ok(0);
        }
        let touched: Vec<i64> = originals.iter().map(|(id, _)| *id).collect();
        let result = applied.and_then(|()| match tables.get(E::TABLE) {
            Some(table) => check_constraints::<E>(
                &tables,
                &table.rows,
                &touched,
                RepositoryOperation::UpdateWhere,
            ),
            None => Ok(()),
        });

        if let Err(e) = result {
            if let Some(table) = tables.get_mut(E::TABLE) {
                table.rows.extend(originals);
            }
            return Err(e);
        }
        Ok(touched.len() as u64)
    }

    async fn delete_where<E: Entity>(&self, filters: &[Filter<E::Field>]) -> RepositoryResult<u64> {
        let mut tables = self.tables.write().await;
        let doomed: Vec<i64> = match tables.get(E::TABLE) {
            Some(table) => table.matching(filters).map(|(id, _)| *id).collect(),
            None => return Ok(0),
        };
        if doomed.is_empty() {
            return Ok(0);
        }

        if let Some(name) = referencing_constraint::<E>(&tables, &doomed) {
            return Err(RepositoryError::still_referenced(format!(
                "update or delete on table \"{}\" violates foreign key constraint \"{}\"",
                E::TABLE, name
            )));
        }

        let Some(table) = tables.get_mut(E::TABLE) else {
            return Ok(0);
        };
        for id in &doomed {
            table.rows.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

/// Name of a foreign key, in any table, that still points at one of `ids`
/// in `E`'s table.
fn referencing_constraint<E: Entity>(tables: &Tables, ids: &[i64]) -> Option<&'static str> {
    tables.values().find_map(|table| {
        table.constraints.iter().find_map(|constraint| match constraint {
            Constraint::ForeignKey {
                name,
                column,
                references,
            } if *references == E::TABLE => table
                .rows
                .values()
                .any(|row| matches!(row.get(column), FieldValue::Integer(n) if ids.contains(n)))
                .then_some(*name),
            _ => None,
        })
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::entities::{Course, CourseField, Student, StudentField};
    use crate::repository::{RepositoryErrorKind, Window};

    fn student_record(id_number: &str, picture: Option<&str>) -> Record {
        let mut student = Student::new(
            "Grace",
            "Hopper",
            NaiveDate::from_ymd_opt(1906, 12, 9).unwrap(),
            id_number,
            picture.map(str::to_string),
            Utc::now(),
        )
        .to_record();
        student.remove("id");
        student
    }

    #[tokio::test]
    async fn test_empty_table_reads() {
        let store = MemoryStore::new();
        let rows: Vec<Course> = store.fetch::<Course>(&QuerySpec::default()).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(store.count::<Course>(&[]).await.unwrap(), 0);
        assert_eq!(store.delete_where::<Course>(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nulls_sort_last_ascending() {
        let store = MemoryStore::new();
        store
            .insert::<Student>(student_record("A", None))
            .await
            .unwrap();
        store
            .insert::<Student>(student_record("B", Some("b.png")))
            .await
            .unwrap();
        store
            .insert::<Student>(student_record("C", Some("a.png")))
            .await
            .unwrap();

        let spec = QuerySpec {
            order: vec![(StudentField::Picture, OrderDirection::Ascending)],
            ..QuerySpec::default()
        };
        let pictures: Vec<Option<String>> = store
            .fetch::<Student>(&spec)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.picture)
            .collect();
        assert_eq!(
            pictures,
            vec![Some("a.png".to_string()), Some("b.png".to_string()), None]
        );
    }

    #[tokio::test]
    async fn test_window_past_end_is_empty() {
        let store = MemoryStore::new();
        for i in 0..3 {
            let record = Course::new(format!("C{i}"), 1, Utc::now()).to_record();
            store.insert::<Course>(record).await.unwrap();
        }
        let spec = QuerySpec {
            window: Some(Window::new(10, 5)),
            ..QuerySpec::default()
        };
        assert!(store.fetch::<Course>(&spec).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_null_in_required_column_is_rejected() {
        let store = MemoryStore::new();
        let mut record = student_record("X", None);
        record.set("id_number", FieldValue::Null);

        let err = store.insert::<Student>(record).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::SerializationError);
        assert_eq!(store.count::<Student>(&[]).await.unwrap(), 0);
    }

    #[test]
    fn test_null_unique_keys_never_collide() {
        let mut row = Record::new();
        row.set("id_number", FieldValue::Null);
        assert!(unique_key(&row, &["id_number"]).is_none());

        row.set("id_number", FieldValue::Text("A".to_string()));
        assert_eq!(
            unique_key(&row, &["id_number"]),
            Some(vec![FieldValue::Text("A".to_string())])
        );
    }

    #[tokio::test]
    async fn test_update_with_no_match_leaves_rows() {
        let store = MemoryStore::new();
        store
            .insert::<Course>(Course::new("Logic", 2, Utc::now()).to_record())
            .await
            .unwrap();

        let affected = store
            .update_where::<Course>(
                &[Filter::eq(CourseField::Title, "Nope")],
                &UpdateSet::new().set(CourseField::Credits, 9),
            )
            .await
            .unwrap();
        assert_eq!(affected, 0);

        let credits = store
            .count::<Course>(&[Filter::eq(CourseField::Credits, 2)])
            .await
            .unwrap();
        assert_eq!(credits, 1);
    }

    #[tokio::test]
    async fn test_update_rejects_wrong_type() {
        let store = MemoryStore::new();
        store
            .insert::<Course>(Course::new("Logic", 2, Utc::now()).to_record())
            .await
            .unwrap();

        let err = store
            .update_where::<Course>(&[], &UpdateSet::new().set(CourseField::Credits, "many"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::SerializationError);
        assert_eq!(err.operation, RepositoryOperation::UpdateWhere);
        assert_eq!(
            store
                .count::<Course>(&[Filter::eq(CourseField::Credits, 2)])
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_update_restores_every_matched_row() {
        let store = MemoryStore::new();
        for id_number in ["A", "B", "C"] {
            store
                .insert::<Student>(student_record(id_number, None))
                .await
                .unwrap();
        }

        // the second matched row collides with the first
        let err = store
            .update_where::<Student>(
                &[],
                &UpdateSet::new()
                    .set(StudentField::IdNumber, "SAME")
                    .set(StudentField::Picture, "p.png"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);

        let students: Vec<Student> = store.fetch::<Student>(&QuerySpec::default()).await.unwrap();
        let id_numbers: Vec<&str> = students.iter().map(|s| s.id_number.as_str()).collect();
        assert_eq!(id_numbers, vec!["A", "B", "C"]);
        assert!(students.iter().all(|s| s.picture.is_none()));
    }
}
