use anyhow::Context;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, Condition, QueryOrder, QuerySelect, Set, TransactionTrait};
use uuid::Uuid;

use super::{Fields, RecordFilter, RecordId, RecordStore, StoredRecord};

/// Запись любой коллекции: поля хранятся JSON-объектом в `data_json`
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "import_record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub collection: String,
    pub data_json: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for StoredRecord {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> anyhow::Result<Self> {
        let fields: Fields = serde_json::from_str(&m.data_json)
            .with_context(|| format!("corrupt data_json in record {}", m.id))?;
        Ok(StoredRecord {
            id: RecordId(m.id),
            fields,
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn new_active(collection: &str, record: &Fields) -> anyhow::Result<(String, ActiveModel)> {
    let id = Uuid::new_v4().to_string();
    let ts = now();
    let active = ActiveModel {
        id: Set(id.clone()),
        collection: Set(collection.to_string()),
        data_json: Set(serde_json::to_string(record)?),
        created_at: Set(ts.clone()),
        updated_at: Set(ts),
    };
    Ok((id, active))
}

/// Условие `data_json.<field> IN (values)` для SQLite.
///
/// Сравнение учитывает JSON-тип, поэтому строка "7" и число 7 различаются.
/// Флаг `true`: условие отбирает ровно то же, что `RecordFilter::matches`,
/// и лимит можно применять в SQL. `None`, если имя поля нельзя записать
/// в JSON path.
fn key_condition(filter: &RecordFilter) -> Option<(Condition, bool)> {
    if filter.field.contains('"') {
        return None;
    }
    let path = format!("$.\"{}\"", filter.field);
    let mut condition = Condition::any();
    let mut exact = true;

    for value in &filter.values {
        let p = || sea_orm::Value::from(path.clone());
        let (sql, binds): (&str, Vec<sea_orm::Value>) = match value {
            serde_json::Value::String(s) => (
                "json_type(data_json, ?) = 'text' AND json_extract(data_json, ?) = ?",
                vec![p(), p(), s.clone().into()],
            ),
            serde_json::Value::Bool(b) => (
                "json_type(data_json, ?) = ?",
                vec![p(), sea_orm::Value::from(if *b { "true" } else { "false" })],
            ),
            serde_json::Value::Null => ("json_type(data_json, ?) = 'null'", vec![p()]),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => (
                    "json_type(data_json, ?) = 'integer' AND json_extract(data_json, ?) = ?",
                    vec![p(), p(), i.into()],
                ),
                None => {
                    exact = false;
                    ("json_type(data_json, ?) IN ('integer', 'real')", vec![p()])
                }
            },
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                exact = false;
                ("json_type(data_json, ?) IN ('array', 'object')", vec![p()])
            }
        };
        // Повреждённый data_json не должен ломать запрос
        condition = condition.add(Expr::cust_with_values(
            format!("CASE WHEN json_valid(data_json) THEN ({}) ELSE 0 END", sql),
            binds,
        ));
    }
    Some((condition, exact))
}

/// Хранилище записей в SQLite через sea-orm.
///
/// Записи читаются в порядке вставки (`rowid`), так что среди нескольких
/// записей с одинаковым ключом первой оказывается самая ранняя.
#[derive(Clone)]
pub struct SeaOrmRecordStore {
    conn: DatabaseConnection,
}

impl SeaOrmRecordStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RecordStore for SeaOrmRecordStore {
    async fn read_matching(
        &self,
        collection: &str,
        filter: &RecordFilter,
        limit: usize,
    ) -> anyhow::Result<Vec<StoredRecord>> {
        if limit == 0 || filter.values.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = Entity::find()
            .filter(Column::Collection.eq(collection))
            .order_by_asc(Expr::cust("rowid"));

        if let Some((condition, exact)) = key_condition(filter) {
            query = query.filter(condition);
            if exact {
                query = query.limit(limit as u64);
            }
        }
        let models = query.all(&self.conn).await?;

        // SQL-условие может быть шире точного сравнения (большие целые, дроби)
        let mut found = Vec::new();
        for model in models {
            if found.len() >= limit {
                break;
            }
            let record = StoredRecord::try_from(model)?;
            if filter.matches(&record.fields) {
                found.push(record);
            }
        }
        Ok(found)
    }

    async fn create_one(&self, collection: &str, record: &Fields) -> anyhow::Result<RecordId> {
        let (id, active) = new_active(collection, record)?;
        active.insert(&self.conn).await?;
        tracing::debug!("Created record {} in '{}'", id, collection);
        Ok(RecordId(id))
    }

    async fn create_many(
        &self,
        collection: &str,
        records: &[Fields],
    ) -> anyhow::Result<Vec<RecordId>> {
        let txn = self.conn.begin().await?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let (id, active) = new_active(collection, record)?;
            active.insert(&txn).await?;
            ids.push(RecordId(id));
        }
        txn.commit().await?;
        tracing::debug!("Created {} records in '{}'", ids.len(), collection);
        Ok(ids)
    }

    async fn update_one(
        &self,
        collection: &str,
        id: &RecordId,
        record: &Fields,
    ) -> anyhow::Result<()> {
        let model = Entity::find_by_id(id.0.clone())
            .filter(Column::Collection.eq(collection))
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("record {} not found in '{}'", id, collection))?;

        let mut fields: Fields = serde_json::from_str(&model.data_json)
            .with_context(|| format!("corrupt data_json in record {}", model.id))?;
        for (field, value) in record {
            fields.insert(field.clone(), value.clone());
        }

        let mut active: ActiveModel = model.into();
        active.data_json = Set(serde_json::to_string(&fields)?);
        active.updated_at = Set(now());
        active.update(&self.conn).await?;
        tracing::debug!("Updated record {} in '{}'", id, collection);
        Ok(())
    }
}
