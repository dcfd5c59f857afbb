//! MemoryTable - 開発・テスト用の key-value table

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::Item;
use crate::ports::key_value::item_key;
use crate::ports::{KeyValueTable, TableError};

#[derive(Default)]
pub struct MemoryTable {
    tables: RwLock<HashMap<String, BTreeMap<String, Item>>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    pub async fn is_empty(&self, table: &str) -> bool {
        self.len(table).await == 0
    }
}

#[async_trait]
impl KeyValueTable for MemoryTable {
    async fn put_item(&self, table: &str, item: Item) -> Result<(), TableError> {
        let key = item_key(&item)?.to_string();
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().insert(key, item);
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: &str) -> Result<(), TableError> {
        let mut tables = self.tables.write().await;
        if let Some(items) = tables.get_mut(table) {
            items.remove(key);
        }
        Ok(())
    }

    async fn get_item(&self, table: &str, key: &str) -> Result<Option<Item>, TableError> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|items| items.get(key)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AttributeValue;

    fn item(id: &str, label: &str) -> Item {
        let mut item = Item::new();
        item.insert("id".into(), AttributeValue::S(id.into()));
        item.insert("label".into(), AttributeValue::S(label.into()));
        item
    }

    #[tokio::test]
    async fn put_is_an_upsert() {
        let table = MemoryTable::new();
        table.put_item("widgets", item("a", "one")).await.unwrap();
        table.put_item("widgets", item("a", "two")).await.unwrap();
        assert_eq!(table.len("widgets").await, 1);
        let stored = table.get_item("widgets", "a").await.unwrap().unwrap();
        assert_eq!(stored["label"], AttributeValue::S("two".into()));
    }

    #[tokio::test]
    async fn item_without_key_is_rejected() {
        let table = MemoryTable::new();
        let mut keyless = Item::new();
        keyless.insert("label".into(), AttributeValue::S("x".into()));
        assert!(matches!(
            table.put_item("widgets", keyless).await,
            Err(TableError::MissingKey)
        ));
    }

    #[tokio::test]
    async fn delete_missing_item_is_ok() {
        let table = MemoryTable::new();
        table.delete_item("widgets", "ghost").await.unwrap();
        assert!(table.is_empty("widgets").await);
    }
}
