use std::marker::PhantomData;

use serde_json::Map;

use crate::domain::query::{Filter, Predicate};
use crate::domain::schema::{Entity, ModelDescriptor, ModelField, Relation, RelationDescriptor, Row};
use crate::domain::stores::{StoreError, StoreResult};

/// A relation to load next to each row, optionally filtered.
#[derive(Debug, Clone)]
pub struct Include {
    pub relation: RelationDescriptor,
    pub filter: Option<Predicate>,
}

/// Shapes `find_many_projected` output. `select` and `include` are mutually
/// exclusive.
#[derive(Debug, Clone)]
pub struct Projection<E: Entity> {
    select: Vec<E::Field>,
    include: Vec<Include>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for Projection<E> {
    fn default() -> Self {
        Self {
            select: Vec::new(),
            include: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> Projection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, fields: impl IntoIterator<Item = E::Field>) -> Self {
        self.select.extend(fields);
        self
    }

    pub fn include<T: Entity>(mut self, relation: Relation<E, T>) -> Self {
        self.include.push(Include {
            relation: *relation.descriptor(),
            filter: None,
        });
        self
    }

    /// Includes only the related rows matching `filter`. Parents that do not
    /// match are rendered as null.
    pub fn include_where<T: Entity>(mut self, relation: Relation<E, T>, filter: Filter<T>) -> Self {
        self.include.push(Include {
            relation: *relation.descriptor(),
            filter: Some(filter.into_predicate()),
        });
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        if !self.select.is_empty() && !self.include.is_empty() {
            return Err(StoreError::validation(
                "select and include cannot be used in the same projection",
            ));
        }
        for include in &self.include {
            if let Some(filter) = &include.filter {
                filter.validate(include.relation.target.descriptor())?;
            }
        }
        Ok(())
    }

    pub fn selected_fields(&self) -> Vec<usize> {
        self.select.iter().map(|f| f.index()).collect()
    }

    pub fn includes(&self) -> &[Include] {
        &self.include
    }
}

/// Renders a row as a JSON object keyed by schema field names. An empty
/// `fields` renders every field.
pub fn row_to_json(model: &ModelDescriptor, row: &Row, fields: &[usize]) -> Map<String, serde_json::Value> {
    let mut out = Map::new();
    for (index, field) in model.fields.iter().enumerate() {
        if fields.is_empty() || fields.contains(&index) {
            out.insert(field.name.to_string(), row[index].to_json());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Repository, RepositoryField};
    use crate::domain::schema::Value;

    #[test]
    fn test_select_and_include_conflict() {
        let projection = Projection::<Repository>::new()
            .select([RepositoryField::Name])
            .include(Repository::FILES);
        assert!(matches!(projection.validate(), Err(StoreError::Validation(_))));

        assert!(Projection::<Repository>::new()
            .include(Repository::LOGS)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_row_to_json_keeps_selected_fields() {
        let model = Repository::model();
        let mut row = vec![Value::Null; model.fields.len()];
        row[RepositoryField::Name.index()] = Value::from("tokio");
        row[RepositoryField::GithubId.index()] = Value::Int(7);

        let json = row_to_json(
            model,
            &row,
            &[RepositoryField::Name.index(), RepositoryField::GithubId.index()],
        );
        assert_eq!(json.len(), 2);
        assert_eq!(json["name"], "tokio");
        assert_eq!(json["githubId"], 7);
    }
}
