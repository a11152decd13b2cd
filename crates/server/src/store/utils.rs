use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::store::error::StoreError;
use crate::store::schema::Table;
use crate::store::Row;

pub fn map_conflict_as_none<T>(result: Result<T, StoreError>) -> Result<Option<T>, StoreError> {
    match result {
        Ok(ok) => Ok(Some(ok)),
        Err(StoreError::Conflict { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::decode(table, e)))
        .collect()
}

pub fn decode_first<T: DeserializeOwned>(
    table: Table,
    rows: Vec<Row>,
) -> Result<Option<T>, StoreError> {
    Ok(decode_rows(table, rows)?.into_iter().next())
}

pub fn encode_row<T: Serialize>(table: Table, value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(StoreError::decode(
            table,
            format!("expected an object, got {other}"),
        )),
        Err(e) => Err(StoreError::decode(table, e)),
    }
}
