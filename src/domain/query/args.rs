use serde::{Deserialize, Serialize};

use crate::domain::query::Filter;
use crate::domain::schema::{Entity, ModelField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
    First,
    Last,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    /// Postgres' placement of nulls when none is requested.
    pub fn default_nulls(self) -> NullsOrder {
        match self {
            SortOrder::Asc => NullsOrder::Last,
            SortOrder::Desc => NullsOrder::First,
        }
    }
}

impl NullsOrder {
    pub fn reversed(self) -> Self {
        match self {
            NullsOrder::First => NullsOrder::Last,
            NullsOrder::Last => NullsOrder::First,
        }
    }
}

/// Fully resolved sort key handed to the backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub field: usize,
    pub direction: SortOrder,
    pub nulls: NullsOrder,
}

impl OrderKey {
    pub fn ascending(field: usize) -> Self {
        Self {
            field,
            direction: SortOrder::Asc,
            nulls: NullsOrder::Last,
        }
    }

    pub fn reversed(self) -> Self {
        Self {
            field: self.field,
            direction: self.direction.reversed(),
            nulls: self.nulls.reversed(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderBy<E: Entity> {
    pub field: E::Field,
    pub direction: SortOrder,
    pub nulls: Option<NullsOrder>,
}

impl<E: Entity> OrderBy<E> {
    pub fn asc(field: E::Field) -> Self {
        Self {
            field,
            direction: SortOrder::Asc,
            nulls: None,
        }
    }

    pub fn desc(field: E::Field) -> Self {
        Self {
            field,
            direction: SortOrder::Desc,
            nulls: None,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    pub fn key(&self) -> OrderKey {
        OrderKey {
            field: self.field.index(),
            direction: self.direction,
            nulls: self.nulls.unwrap_or_else(|| self.direction.default_nulls()),
        }
    }
}

/// Options of `find_many` and the relation collection accessors.
///
/// `take` is signed: a negative value pages backwards from the cursor (or
/// from the end of the ordering when no cursor is set).
#[derive(Debug, Clone)]
pub struct FindManyArgs<E: Entity> {
    pub filter: Option<Filter<E>>,
    pub order_by: Vec<OrderBy<E>>,
    pub cursor: Option<E::Unique>,
    pub take: Option<i64>,
    pub skip: Option<i64>,
    pub distinct: Vec<E::Field>,
}

impl<E: Entity> Default for FindManyArgs<E> {
    fn default() -> Self {
        Self {
            filter: None,
            order_by: Vec::new(),
            cursor: None,
            take: None,
            skip: None,
            distinct: Vec::new(),
        }
    }
}

impl<E: Entity> FindManyArgs<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter<E>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    pub fn order_by(mut self, order: OrderBy<E>) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn cursor(mut self, cursor: E::Unique) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn distinct(mut self, fields: impl IntoIterator<Item = E::Field>) -> Self {
        self.distinct.extend(fields);
        self
    }
}
