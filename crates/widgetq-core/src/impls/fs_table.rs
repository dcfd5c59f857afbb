//! FsTable - ローカルディレクトリを key-value table として使う
//!
//! `{root}/{table}/{key}.json` に tagged attribute 形式の item を 1 ファイルずつ保存します。
//! 書き込みは一時ファイル + rename です。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ulid::Ulid;

use crate::domain::Item;
use crate::ports::key_value::item_key;
use crate::ports::{KeyValueTable, TableError};

#[derive(Debug, Clone)]
pub struct FsTable {
    root: PathBuf,
}

impl FsTable {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_dir(&self, table: &str) -> Result<PathBuf, TableError> {
        check_name(table)?;
        Ok(self.root.join(table))
    }

    fn item_path(&self, table: &str, key: &str) -> Result<PathBuf, TableError> {
        check_name(key)?;
        Ok(self.table_dir(table)?.join(format!("{key}.json")))
    }
}

fn check_name(name: &str) -> Result<(), TableError> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !ok {
        return Err(TableError::InvalidKey(name.to_string()));
    }
    Ok(())
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> TableError + '_ {
    move |source| TableError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl KeyValueTable for FsTable {
    async fn put_item(&self, table: &str, item: Item) -> Result<(), TableError> {
        let path = self.item_path(table, item_key(&item)?)?;
        let dir = self.table_dir(table)?;
        let encoded = serde_json::to_vec_pretty(&item)?;

        tokio::fs::create_dir_all(&dir).await.map_err(io_error(&dir))?;
        let tmp = dir.join(format!(".{}.tmp", Ulid::new()));
        tokio::fs::write(&tmp, encoded).await.map_err(io_error(&tmp))?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_error(&path))
    }

    async fn delete_item(&self, table: &str, key: &str) -> Result<(), TableError> {
        let path = self.item_path(table, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    async fn get_item(&self, table: &str, key: &str) -> Result<Option<Item>, TableError> {
        let path = self.item_path(table, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path)(e)),
        }
    }
}
