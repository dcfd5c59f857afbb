//! AttributeStore - widget を tagged attribute の item として table に置く

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Widget, WidgetKey, widget_item};
use crate::ports::{KeyValueTable, StorageError, TableError, WidgetStore};

pub struct AttributeStore {
    client: Arc<dyn KeyValueTable>,
    table: String,
}

impl AttributeStore {
    pub fn new(client: Arc<dyn KeyValueTable>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl WidgetStore for AttributeStore {
    fn describe(&self) -> String {
        format!("key-value table `{}`", self.table)
    }

    async fn put(&self, widget: &Widget) -> Result<(), StorageError> {
        let item = widget_item(widget)
            .map_err(|(field, source)| StorageError::UnsupportedAttribute { field, source })?;
        self.client.put_item(&self.table, item).await?;
        tracing::debug!(table = %self.table, widget_id = %widget.id(), "item written");
        Ok(())
    }

    /// Items are keyed by widget id alone; the owner plays no part.
    async fn delete(&self, key: &WidgetKey) -> Result<(), StorageError> {
        match self.client.delete_item(&self.table, key.id().as_str()).await {
            Ok(()) => {
                tracing::debug!(table = %self.table, widget_id = %key.id(), "item deleted");
                Ok(())
            }
            Err(TableError::NotFound { .. }) => {
                tracing::debug!(table = %self.table, widget_id = %key.id(), "item already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
