//! In-process storage backend.
//!
//! Keeps every table in one `RwLock`, so each trait call is atomic. Enforces
//! the same unique, reference and delete rules the SQL schema declares.

use crate::domain::model::{ColumnKind, OnDelete, Resource, ResourceModel};
use crate::domain::query::{FilterValue, Predicate, QueryDescriptor, SortDirection};
use crate::domain::update::TypedUpdateSet;
use crate::storage::{ConstraintKind, ReviewStats, Storage, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

type Record = Map<String, JsonValue>;

#[derive(Default)]
struct Table {
    /// Rows by key. The key is the `id` column for every resource that has one.
    rows: BTreeMap<i64, Record>,
    last_key: i64,
}

impl Table {
    fn next_key(&mut self) -> i64 {
        self.last_key += 1;
        self.last_key
    }
}

#[derive(Default)]
struct Tables {
    tables: HashMap<Resource, Table>,
}

fn id_of(record: &Record, field: &str) -> Option<i64> {
    record.get(field).and_then(JsonValue::as_i64)
}

fn unique_violation(column: &str, value: &JsonValue) -> StoreError {
    StoreError::Constraint {
        kind: ConstraintKind::Unique,
        detail: format!("Key ({})=({}) already exists.", column, display(value)),
    }
}

fn missing_reference(column: &str, id: i64, target: Resource) -> StoreError {
    StoreError::Constraint {
        kind: ConstraintKind::ForeignKey,
        detail: format!(
            "Key ({})=({}) is not present in table \"{}\".",
            column,
            id,
            target.model().table_name()
        ),
    }
}

fn check_violation(table: &str, column: &str, value: &JsonValue) -> StoreError {
    StoreError::Constraint {
        kind: ConstraintKind::Check,
        detail: format!(
            "Failing row violates check constraint \"{}_{}_check\" with ({}).",
            table,
            column,
            display(value)
        ),
    }
}

fn display(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Tables {
    fn rows(&self, resource: Resource) -> impl Iterator<Item = (&i64, &Record)> {
        self.tables
            .get(&resource)
            .into_iter()
            .flat_map(|table| table.rows.iter())
    }

    fn get(&self, resource: Resource, key: i64) -> Option<&Record> {
        self.tables.get(&resource)?.rows.get(&key)
    }

    fn table_mut(&mut self, resource: Resource) -> &mut Table {
        self.tables.entry(resource).or_default()
    }

    /// Field values of `update`, checked against the model's columns.
    fn typed_fields(
        model: &dyn ResourceModel,
        update: &TypedUpdateSet,
    ) -> Result<Record, StoreError> {
        let mut out = Record::new();
        for (field, value) in update.iter() {
            let column = model.column(field).ok_or_else(|| StoreError::UnknownField {
                resource: model.resource(),
                field: field.to_string(),
            })?;
            let json = value
                .to_json()
                .ok_or_else(|| StoreError::InvalidValue(field.to_string()))?;
            out.insert(column.field.to_string(), json);
        }
        Ok(out)
    }

    fn check_references(&self, model: &dyn ResourceModel, record: &Record) -> Result<(), StoreError> {
        for column in model.columns() {
            if let ColumnKind::Reference { target, .. } = column.kind {
                if let Some(id) = id_of(record, column.field) {
                    if self.get(target, id).is_none() {
                        return Err(missing_reference(column.column, id, target));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_ranges(model: &dyn ResourceModel, record: &Record) -> Result<(), StoreError> {
        for column in model.columns() {
            let (Some(range), Some(value)) = (column.range, record.get(column.field)) else {
                continue;
            };
            if value.as_f64().is_some_and(|v| !range.contains(v)) {
                return Err(check_violation(model.table_name(), column.column, value));
            }
        }
        Ok(())
    }

    fn check_unique(
        &self,
        model: &dyn ResourceModel,
        record: &Record,
        except: Option<i64>,
    ) -> Result<(), StoreError> {
        for column in model.columns().iter().filter(|c| c.unique) {
            let Some(value) = record.get(column.field).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = self
                .rows(model.resource())
                .any(|(key, row)| Some(*key) != except && row.get(column.field) == Some(value));
            if taken {
                return Err(unique_violation(column.column, value));
            }
        }
        Ok(())
    }

    fn insert(&mut self, resource: Resource, fields: &TypedUpdateSet) -> Result<Record, StoreError> {
        let model = resource.model();
        let mut fields = fields.clone();
        for (field, value) in model.create_defaults() {
            fields.insert_default(field, value);
        }
        let mut record = Self::typed_fields(model, &fields)?;

        for field in model.required_on_create() {
            if !record.contains_key(*field) {
                return Err(StoreError::Constraint {
                    kind: ConstraintKind::NotNull,
                    detail: format!("Failing row is missing {}.", field),
                });
            }
        }
        Self::check_ranges(model, &record)?;
        self.check_references(model, &record)?;
        self.check_unique(model, &record, None)?;

        let table = self.table_mut(resource);
        let key = table.next_key();
        for column in model.columns() {
            match column.kind {
                ColumnKind::Id => {
                    record.insert(column.field.to_string(), JsonValue::from(key));
                }
                ColumnKind::Timestamp => {
                    record.insert(column.field.to_string(), now());
                }
                _ => {
                    record
                        .entry(column.field.to_string())
                        .or_insert(JsonValue::Null);
                }
            }
        }
        table.rows.insert(key, record.clone());
        Ok(record)
    }

    fn update(
        &mut self,
        resource: Resource,
        key: i64,
        update: &TypedUpdateSet,
    ) -> Result<Option<Record>, StoreError> {
        let model = resource.model();
        let Some(mut merged) = self.get(resource, key).cloned() else {
            return Ok(None);
        };
        let changes = Self::typed_fields(model, update)?;
        Self::check_ranges(model, &changes)?;
        self.check_references(model, &changes)?;
        merged.extend(changes);
        self.check_unique(model, &merged, Some(key))?;

        self.table_mut(resource).rows.insert(key, merged.clone());
        Ok(Some(merged))
    }

    /// Every row that goes away with `(resource, key)`, the row itself first.
    /// Fails if a restricting reference points at any of them.
    fn cascade_set(
        &self,
        resource: Resource,
        key: i64,
        out: &mut Vec<(Resource, i64)>,
    ) -> Result<(), StoreError> {
        out.push((resource, key));
        for child in Resource::ALL {
            let model = child.model();
            for column in model.columns() {
                let ColumnKind::Reference { target, on_delete } = column.kind else {
                    continue;
                };
                if target != resource {
                    continue;
                }
                let referencing: Vec<i64> = self
                    .rows(child)
                    .filter(|(_, row)| id_of(row, column.field) == Some(key))
                    .map(|(k, _)| *k)
                    .collect();
                for child_key in referencing {
                    match on_delete {
                        OnDelete::Restrict => {
                            return Err(StoreError::Constraint {
                                kind: ConstraintKind::ForeignKey,
                                detail: format!(
                                    "Key (id)=({}) is still referenced from table \"{}\".",
                                    key,
                                    model.table_name()
                                ),
                            });
                        }
                        OnDelete::Cascade => {
                            if !out.contains(&(child, child_key)) {
                                self.cascade_set(child, child_key, out)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn delete(&mut self, resource: Resource, key: i64) -> Result<Option<Record>, StoreError> {
        if self.get(resource, key).is_none() {
            return Ok(None);
        }
        let mut doomed = Vec::new();
        self.cascade_set(resource, key, &mut doomed)?;

        let mut removed = None;
        for (r, k) in doomed {
            let row = self.table_mut(r).rows.remove(&k);
            if (r, k) == (resource, key) {
                removed = row;
            }
        }
        Ok(removed)
    }

    fn cart_key(&self, user_id: i64) -> Option<i64> {
        self.rows(Resource::Cart)
            .find(|(_, row)| id_of(row, "userId") == Some(user_id))
            .map(|(key, _)| *key)
    }

    fn cart_line_key(&self, user_id: i64, product_id: i64) -> Option<i64> {
        let cart = self.cart_key(user_id)?;
        self.rows(Resource::CartLine)
            .find(|(_, row)| {
                id_of(row, "cartId") == Some(cart) && id_of(row, "productId") == Some(product_id)
            })
            .map(|(key, _)| *key)
    }

    fn with_user(&self, review: &Record) -> JsonValue {
        let mut out = review.clone();
        let user = id_of(review, "userId").and_then(|id| self.get(Resource::User, id));
        out.insert("user".into(), to_value(user));
        JsonValue::Object(out)
    }

    fn related(&self, resource: Resource, field: &str, id: i64) -> Vec<&Record> {
        self.rows(resource)
            .filter(|(_, row)| id_of(row, field) == Some(id))
            .map(|(_, row)| row)
            .collect()
    }

    fn details(&self, resource: Resource, id: i64) -> Option<JsonValue> {
        let mut out = self.get(resource, id)?.clone();
        match resource {
            Resource::Product => {
                let category = id_of(&out, "categoryId").and_then(|c| self.get(Resource::Category, c));
                let reviews: Vec<JsonValue> = self
                    .related(Resource::Review, "productId", id)
                    .into_iter()
                    .map(|r| self.with_user(r))
                    .collect();
                out.insert("category".into(), to_value(category));
                out.insert("reviews".into(), JsonValue::Array(reviews));
            }
            Resource::Category => {
                let products = self.related(Resource::Product, "categoryId", id);
                out.insert("products".into(), to_array(products));
            }
            Resource::User => {
                let reviews = self.related(Resource::Review, "userId", id);
                out.insert("reviews".into(), to_array(reviews));
            }
            Resource::Review => {
                let product = id_of(&out, "productId").and_then(|p| self.get(Resource::Product, p));
                let user = id_of(&out, "userId").and_then(|u| self.get(Resource::User, u));
                out.insert("product".into(), to_value(product));
                out.insert("user".into(), to_value(user));
            }
            Resource::Cart | Resource::CartLine => {}
        }
        Some(JsonValue::Object(out))
    }

    fn cart(&self, user_id: i64) -> Option<JsonValue> {
        let cart_key = self.cart_key(user_id)?;
        let mut out = self.get(Resource::Cart, cart_key)?.clone();

        let mut lines: Vec<&Record> = self.related(Resource::CartLine, "cartId", cart_key);
        lines.sort_by_key(|line| id_of(line, "productId"));
        let products: Vec<JsonValue> = lines
            .into_iter()
            .map(|line| {
                let mut entry = line.clone();
                let product = id_of(line, "productId").and_then(|p| self.get(Resource::Product, p));
                entry.insert("product".into(), to_value(product));
                JsonValue::Object(entry)
            })
            .collect();
        out.insert("products".into(), JsonValue::Array(products));
        Some(JsonValue::Object(out))
    }
}

fn now() -> JsonValue {
    JsonValue::String(chrono::Utc::now().to_rfc3339())
}

fn to_value(record: Option<&Record>) -> JsonValue {
    record.map_or(JsonValue::Null, |r| JsonValue::Object(r.clone()))
}

fn to_array(records: Vec<&Record>) -> JsonValue {
    JsonValue::Array(records.into_iter().map(|r| JsonValue::Object(r.clone())).collect())
}

fn matches(record: &Record, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Equals { field, value } => match (record.get(*field), value) {
            (Some(JsonValue::Bool(actual)), FilterValue::Bool(expected)) => actual == expected,
            (Some(JsonValue::Number(actual)), FilterValue::Int(expected)) => {
                actual.as_i64() == Some(*expected)
            }
            _ => false,
        },
        Predicate::TextMatch { fields, needle } => {
            let needle = needle.to_lowercase();
            fields.iter().any(|field| {
                record
                    .get(*field)
                    .and_then(JsonValue::as_str)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        }
    }
}

/// Ascending order with nulls last, like PostgreSQL.
fn compare_values(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => match (x.as_str(), y.as_str()) {
                (Some(x), Some(y)) => x.cmp(y),
                _ => x.as_bool().cmp(&y.as_bool()),
            },
        },
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn query_all(&self, resource: Resource) -> Result<Vec<JsonValue>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rows(resource)
            .map(|(_, row)| JsonValue::Object(row.clone()))
            .collect())
    }

    async fn query(
        &self,
        resource: Resource,
        query: &QueryDescriptor,
    ) -> Result<Vec<JsonValue>, StoreError> {
        let model = resource.model();
        for predicate in query.filter.predicates() {
            let fields: &[&str] = match predicate {
                Predicate::Equals { field, .. } => std::slice::from_ref(field),
                Predicate::TextMatch { fields, .. } => fields,
            };
            if let Some(unknown) = fields.iter().find(|f| model.column(f).is_none()) {
                return Err(StoreError::UnknownField {
                    resource,
                    field: unknown.to_string(),
                });
            }
        }

        let tables = self.tables.read().await;
        let mut rows: Vec<(i64, &Record)> = tables
            .rows(resource)
            .filter(|(_, row)| query.filter.predicates().iter().all(|p| matches(row, p)))
            .map(|(key, row)| (*key, row))
            .collect();

        // Rows come out in key order, so a stable sort keeps `id` as the tiebreak.
        if let Some(sort) = &query.sort {
            if model.column(sort.field).is_none() {
                return Err(StoreError::UnknownField {
                    resource,
                    field: sort.field.to_string(),
                });
            }
            rows.sort_by(|(_, a), (_, b)| {
                let ordering = compare_values(a.get(sort.field), b.get(sort.field));
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let skip = usize::try_from(query.page.skip()).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(query.page.limit() as usize)
            .map(|(_, row)| JsonValue::Object(row.clone()))
            .collect())
    }

    async fn find_by_id(
        &self,
        resource: Resource,
        id: i64,
    ) -> Result<Option<JsonValue>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(resource, id)
            .map(|row| JsonValue::Object(row.clone())))
    }

    async fn find_details(
        &self,
        resource: Resource,
        id: i64,
    ) -> Result<Option<JsonValue>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.details(resource, id))
    }

    async fn insert(
        &self,
        resource: Resource,
        fields: &TypedUpdateSet,
    ) -> Result<JsonValue, StoreError> {
        let mut tables = self.tables.write().await;
        tables.insert(resource, fields).map(JsonValue::Object)
    }

    async fn apply_partial_update(
        &self,
        resource: Resource,
        id: i64,
        update: &TypedUpdateSet,
    ) -> Result<Option<JsonValue>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.update(resource, id, update)?.map(JsonValue::Object))
    }

    async fn delete(&self, resource: Resource, id: i64) -> Result<Option<JsonValue>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.delete(resource, id)?.map(JsonValue::Object))
    }

    async fn like_review(&self, id: i64) -> Result<Option<JsonValue>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(review) = tables.table_mut(Resource::Review).rows.get_mut(&id) else {
            return Ok(None);
        };
        let likes = id_of(review, "likes")
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| StoreError::OutOfRange("likes".into()))?;
        review.insert("likes".into(), JsonValue::from(likes));
        Ok(Some(JsonValue::Object(review.clone())))
    }

    async fn review_stats(&self, product_id: i64) -> Result<ReviewStats, StoreError> {
        let tables = self.tables.read().await;
        let mut groups: BTreeMap<i64, i64> = BTreeMap::new();
        for review in tables.related(Resource::Review, "productId", product_id) {
            if let Some(rating) = id_of(review, "rating") {
                *groups.entry(rating).or_insert(0) += 1;
            }
        }
        Ok(ReviewStats::from_groups(groups))
    }

    async fn add_to_cart(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> Result<JsonValue, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.get(Resource::User, user_id).is_none() {
            return Err(missing_reference("user_id", user_id, Resource::User));
        }
        if tables.get(Resource::Product, product_id).is_none() {
            return Err(missing_reference("product_id", product_id, Resource::Product));
        }


        // A rejected add must leave no cart behind.
        let existing = tables.cart_line_key(user_id, product_id);
        let total = match existing {
            Some(key) => tables
                .get(Resource::CartLine, key)
                .and_then(|l| id_of(l, "quantity"))
                .unwrap_or(0)
                .checked_add(quantity)
                .ok_or_else(|| StoreError::OutOfRange("quantity".into()))?,
            None => quantity,
        };
        if total < 1 {
            return Err(StoreError::InvalidValue("quantity".into()));
        }

        let cart_key = match tables.cart_key(user_id) {
            Some(key) => key,
            None => {
                let carts = tables.table_mut(Resource::Cart);
                let key = carts.next_key();
                let mut cart = Record::new();
                cart.insert("id".into(), JsonValue::from(key));
                cart.insert("userId".into(), JsonValue::from(user_id));
                cart.insert("createdAt".into(), now());
                carts.rows.insert(key, cart);
                key
            }
        };

        let lines = tables.table_mut(Resource::CartLine);
        let key = existing.unwrap_or_else(|| lines.next_key());
        let mut line = Record::new();
        line.insert("cartId".into(), JsonValue::from(cart_key));
        line.insert("productId".into(), JsonValue::from(product_id));
        line.insert("quantity".into(), JsonValue::from(total));
        lines.rows.insert(key, line.clone());
        Ok(JsonValue::Object(line))
    }

    async fn get_cart(&self, user_id: i64) -> Result<Option<JsonValue>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.cart(user_id))
    }

    async fn update_cart_quantity(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> Result<Option<JsonValue>, StoreError> {
        if quantity < 1 {
            return Err(StoreError::InvalidValue("quantity".into()));
        }
        let mut tables = self.tables.write().await;
        let Some(key) = tables.cart_line_key(user_id, product_id) else {
            return Ok(None);
        };
        let Some(line) = tables.table_mut(Resource::CartLine).rows.get_mut(&key) else {
            return Ok(None);
        };
        line.insert("quantity".into(), JsonValue::from(quantity));
        Ok(Some(JsonValue::Object(line.clone())))
    }

    async fn remove_from_cart(
        &self,
        user_id: i64,
        product_id: i64,
    ) -> Result<Option<JsonValue>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(key) = tables.cart_line_key(user_id, product_id) else {
            return Ok(None);
        };
        Ok(tables
            .table_mut(Resource::CartLine)
            .rows
            .remove(&key)
            .map(JsonValue::Object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::{FilterCriteria, PageSpec, SortSpec};
    use crate::domain::update::normalize;
    use serde_json::json;

    fn fields(resource: Resource, body: JsonValue) -> TypedUpdateSet {
        normalize(body.as_object().unwrap(), resource.model().mutable_fields()).unwrap()
    }

    async fn seed(storage: &MemoryStorage) -> (i64, i64, i64) {
        let category = storage
            .insert(Resource::Category, &fields(Resource::Category, json!({"name": "Audio"})))
            .await
            .unwrap();
        let category_id = category["id"].as_i64().unwrap();
        let product = storage
            .insert(
                Resource::Product,
                &fields(
                    Resource::Product,
                    json!({"name": "Headphones", "categoryId": category_id, "price": 99.5}),
                ),
            )
            .await
            .unwrap();
        let user = storage
            .insert(
                Resource::User,
                &fields(
                    Resource::User,
                    json!({"username": "ada", "email": "ada@example.com", "passwordHash": "x"}),
                ),
            )
            .await
            .unwrap();
        (
            category_id,
            product["id"].as_i64().unwrap(),
            user["id"].as_i64().unwrap(),
        )
    }

    #[tokio::test]
    async fn insert_fills_identity_defaults_and_nulls() {
        let storage = MemoryStorage::new();
        let (_, product_id, _) = seed(&storage).await;
        let product = storage
            .find_by_id(Resource::Product, product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product["stockCount"], json!(0));
        assert_eq!(product["isAvailable"], json!(false));
        assert_eq!(product["brand"], JsonValue::Null);
        assert!(product["createdAt"].is_string());
    }

    #[tokio::test]
    async fn unique_columns_are_enforced() {
        let storage = MemoryStorage::new();
        seed(&storage).await;
        let err = storage
            .insert(Resource::Category, &fields(Resource::Category, json!({"name": "Audio"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint { kind: ConstraintKind::Unique, .. }));
    }

    #[tokio::test]
    async fn dangling_reference_is_rejected() {
        let storage = MemoryStorage::new();
        let err = storage
            .insert(
                Resource::Product,
                &fields(Resource::Product, json!({"name": "X", "categoryId": 99, "price": 1})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint { kind: ConstraintKind::ForeignKey, .. }));
    }

    #[tokio::test]
    async fn delete_restricts_and_cascades() {
        let storage = MemoryStorage::new();
        let (category_id, product_id, user_id) = seed(&storage).await;
        storage
            .insert(
                Resource::Review,
                &fields(
                    Resource::Review,
                    json!({"productId": product_id, "userId": user_id, "rating": 4}),
                ),
            )
            .await
            .unwrap();
        storage.add_to_cart(user_id, product_id, 1).await.unwrap();

        let err = storage.delete(Resource::Category, category_id).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint { kind: ConstraintKind::ForeignKey, .. }));

        storage.delete(Resource::Product, product_id).await.unwrap().unwrap();
        assert!(storage.query_all(Resource::Review).await.unwrap().is_empty());
        assert!(storage.query_all(Resource::CartLine).await.unwrap().is_empty());
        assert!(storage.delete(Resource::Product, product_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sentinel_values_never_reach_a_row() {
        let storage = MemoryStorage::new();
        let (_, product_id, _) = seed(&storage).await;
        let update = fields(Resource::Product, json!({"price": "free"}));
        let err = storage
            .apply_partial_update(Resource::Product, product_id, &update)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue(ref f) if f == "price"));
    }

    #[tokio::test]
    async fn sort_descending_with_id_tiebreak() {
        let storage = MemoryStorage::new();
        let (category_id, _, _) = seed(&storage).await;
        for price in [10, 30, 30] {
            storage
                .insert(
                    Resource::Product,
                    &fields(
                        Resource::Product,
                        json!({"name": "P", "categoryId": category_id, "price": price}),
                    ),
                )
                .await
                .unwrap();
        }
        let query = QueryDescriptor {
            filter: FilterCriteria::default(),
            sort: Some(SortSpec {
                field: "price",
                direction: SortDirection::Desc,
            }),
            page: PageSpec::from_raw(None, Some("3")),
        };
        let rows = storage.query(Resource::Product, &query).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn cart_add_accumulates_quantity() {
        let storage = MemoryStorage::new();
        let (_, product_id, user_id) = seed(&storage).await;
        storage.add_to_cart(user_id, product_id, 2).await.unwrap();
        let line = storage.add_to_cart(user_id, product_id, 3).await.unwrap();
        assert_eq!(line["quantity"], json!(5));

        let cart = storage.get_cart(user_id).await.unwrap().unwrap();
        assert_eq!(cart["products"].as_array().map(Vec::len), Some(1));
        assert_eq!(cart["products"][0]["product"]["name"], json!("Headphones"));
    }

    #[tokio::test]
    async fn out_of_range_values_are_rejected() {
        let storage = MemoryStorage::new();
        let (category_id, product_id, user_id) = seed(&storage).await;

        let review = fields(
            Resource::Review,
            json!({"productId": product_id, "userId": user_id, "rating": 42}),
        );
        let err = storage.insert(Resource::Review, &review).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint { kind: ConstraintKind::Check, .. }));

        let product = fields(
            Resource::Product,
            json!({"name": "Free", "categoryId": category_id, "price": 0}),
        );
        let err = storage.insert(Resource::Product, &product).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint { kind: ConstraintKind::Check, .. }));

        let update = fields(Resource::Product, json!({"stockCount": -3}));
        let err = storage
            .apply_partial_update(Resource::Product, product_id, &update)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint { kind: ConstraintKind::Check, .. }));
        assert!(storage.query_all(Resource::Review).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cart_overflow_leaves_no_cart_behind() {
        let storage = MemoryStorage::new();
        let (_, product_id, user_id) = seed(&storage).await;
        let other = storage
            .insert(
                Resource::User,
                &fields(
                    Resource::User,
                    json!({"username": "bob", "email": "bob@example.com", "passwordHash": "x"}),
                ),
            )
            .await
            .unwrap();
        let other_id = other["id"].as_i64().unwrap();

        storage.add_to_cart(user_id, product_id, i64::MAX).await.unwrap();
        let err = storage.add_to_cart(user_id, product_id, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange(_)));
        let cart = storage.get_cart(user_id).await.unwrap().unwrap();
        assert_eq!(cart["products"][0]["quantity"], json!(i64::MAX));

        let err = storage.add_to_cart(other_id, product_id, 0).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue(_)));
        assert!(storage.get_cart(other_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn like_counter_overflow_is_reported() {
        let storage = MemoryStorage::new();
        let (_, product_id, user_id) = seed(&storage).await;
        let review = storage
            .insert(
                Resource::Review,
                &fields(
                    Resource::Review,
                    json!({"productId": product_id, "userId": user_id, "rating": 5, "likes": i64::MAX}),
                ),
            )
            .await
            .unwrap();
        let id = review["id"].as_i64().unwrap();
        let err = storage.like_review(id).await.unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange(_)));
    }
}
