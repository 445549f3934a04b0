//! Field setters for set-based updates

use chrono::{DateTime, Utc};

use super::entity::{Audited, Field};
use super::filter::FieldValue;

/// Ordered list of `(field, new value)` pairs for
/// [`Repository::update_where`](super::Repository::update_where).
///
/// Only the named fields are written; every other column keeps its stored
/// value. Setting a field twice keeps the last value in the position of the
/// first.
///
/// ```rust,ignore
/// let setters = UpdateSet::new()
///     .set(CourseField::Title, "Linear Algebra")
///     .set(CourseField::Credits, 4)
///     .touch::<Course>(Utc::now(), SYSTEM_ACTOR);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSet<F> {
    assignments: Vec<(F, FieldValue)>,
}

impl<F> Default for UpdateSet<F> {
    fn default() -> Self {
        Self {
            assignments: Vec::new(),
        }
    }
}

impl<F: Field> UpdateSet<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `field`
    #[must_use]
    pub fn set(mut self, field: F, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        match self.assignments.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.assignments.push((field, value)),
        }
        self
    }

    /// Stamp the audit columns of an audited entity
    #[must_use]
    pub fn touch<E>(self, now: DateTime<Utc>, actor: &str) -> Self
    where
        E: Audited<Field = F>,
    {
        self.set(E::UPDATED_AT, now).set(E::UPDATED_BY, actor)
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn contains(&self, field: F) -> bool {
        self.assignments.iter().any(|(f, _)| *f == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(F, FieldValue)> {
        self.assignments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Col {
        Title,
        Credits,
    }

    impl Field for Col {
        const ALL: &'static [Self] = &[Self::Title, Self::Credits];

        fn column(self) -> &'static str {
            match self {
                Self::Title => "title",
                Self::Credits => "credits",
            }
        }
    }

    #[test]
    fn test_set_preserves_order() {
        let set = UpdateSet::new().set(Col::Credits, 3).set(Col::Title, "X");
        let fields: Vec<Col> = set.iter().map(|(f, _)| *f).collect();
        assert_eq!(fields, vec![Col::Credits, Col::Title]);
    }

    #[test]
    fn test_last_assignment_wins() {
        let set = UpdateSet::new()
            .set(Col::Title, "first")
            .set(Col::Credits, 2)
            .set(Col::Title, "second");

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.iter().next(),
            Some(&(Col::Title, FieldValue::Text("second".to_string())))
        );
    }

    #[test]
    fn test_empty() {
        let set: UpdateSet<Col> = UpdateSet::new();
        assert!(set.is_empty());
        assert!(!set.contains(Col::Title));
    }
}
