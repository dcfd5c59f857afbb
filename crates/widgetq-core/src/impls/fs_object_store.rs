//! FsObjectStore - ローカルディレクトリをオブジェクトストアとして使う
//!
//! # レイアウト
//! - `{root}/{bucket}/{key}`（key の `/` はディレクトリ区切り）
//! - 書き込みは `{root}/.staging/` に書いてから rename（途中状態を見せない）
//!
//! # 学習ポイント
//! - ディレクトリ走査は同期 API なので spawn_blocking で逃がす
//! - key のセグメントはファイル名に encode する（先頭 `.` は `%2E`、空セグメントは `%`）。
//!   どの key も root の外や dot エントリには届かない
//! - bucket 名は encode せず、危険な名前は拒否する

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use ulid::Ulid;

use crate::ports::{ObjectBody, ObjectStore, ObjectStoreError};

const STAGING_DIR: &str = ".staging";

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf, ObjectStoreError> {
        check_bucket(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, ObjectStoreError> {
        let mut path = self.bucket_path(bucket)?;
        for segment in key.split('/') {
            path.push(encode_segment(segment));
        }
        Ok(path)
    }
}

/// File name for one key segment. An empty segment becomes a lone `%`, which
/// no other segment can encode to since `%` itself is always escaped.
fn encode_segment(segment: &str) -> String {
    if segment.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(segment.len());
    for (i, c) in segment.char_indices() {
        match c {
            '.' if i == 0 => out.push_str("%2E"),
            '%' => out.push_str("%25"),
            '\\' => out.push_str("%5C"),
            '\0' => out.push_str("%00"),
            c => out.push(c),
        }
    }
    out
}

/// Inverse of [`encode_segment`]; `None` for names this store never writes.
fn decode_segment(name: &str) -> Option<String> {
    if name == "%" {
        return Some(String::new());
    }
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escaped = rest.get(pos + 1..pos + 3)?;
        out.push(match escaped {
            "2E" => '.',
            "25" => '%',
            "5C" => '\\',
            "00" => '\0',
            _ => return None,
        });
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Some(out)
}

fn check_bucket(bucket: &str) -> Result<(), ObjectStoreError> {
    let bad = bucket.is_empty()
        || bucket.starts_with('.')
        || bucket.contains(['/', '\\', '\0']);
    if bad {
        return Err(ObjectStoreError::InvalidKey(bucket.to_string()));
    }
    Ok(())
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ObjectStoreError + '_ {
    move |source| ObjectStoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ObjectStoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ObjectStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ObjectStoreError::OperationFailed(format!("blocking task failed: {e}")))?
}

/// Collects file keys under `dir`, relative to the bucket, skipping dot entries.
fn collect_keys(dir: &Path, prefix: &str, keys: &mut Vec<String>) -> Result<(), ObjectStoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_error(dir)(e)),
    };
    for entry in entries {
        let entry = entry.map_err(io_error(dir))?;
        let file_name = entry.file_name();
        let raw = file_name.to_string_lossy();
        if raw.starts_with('.') {
            continue;
        }
        let Some(name) = decode_segment(&raw) else {
            tracing::debug!(path = %entry.path().display(), "skipping foreign file");
            continue;
        };
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let file_type = entry.file_type().map_err(io_error(dir))?;
        if file_type.is_dir() {
            collect_keys(&entry.path(), &key, keys)?;
        } else if file_type.is_file() {
            keys.push(key);
        }
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list_keys(
        &self,
        bucket: &str,
        max_keys: usize,
    ) -> Result<Vec<String>, ObjectStoreError> {
        let dir = self.bucket_path(bucket)?;
        blocking(move || {
            let mut keys = Vec::new();
            collect_keys(&dir, "", &mut keys)?;
            keys.sort();
            keys.truncate(max_keys);
            Ok(keys)
        })
        .await
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectBody, ObjectStoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(ObjectBody {
                data: Bytes::from(data),
                content_type: None,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    /// Content type is not persisted on disk.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(bucket, key)?;
        let staging = self.root.join(STAGING_DIR);
        blocking(move || {
            fs::create_dir_all(&staging).map_err(io_error(&staging))?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            let tmp = staging.join(Ulid::new().to_string());
            fs::write(&tmp, &data).map_err(io_error(&tmp))?;
            fs::rename(&tmp, &path).map_err(io_error(&path))
        })
        .await
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn put_then_get_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store
            .put("web", "widgets/mary-matthews/abc", Bytes::from_static(b"{\"a\":1}"), "application/json")
            .await
            .unwrap();

        assert!(dir.path().join("web/widgets/mary-matthews/abc").is_file());
        let body = store.get("web", "widgets/mary-matthews/abc").await.unwrap();
        assert_eq!(body.data, Bytes::from_static(b"{\"a\":1}"));
    }

    #[tokio::test]
    async fn list_keys_walks_nested_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        for key in ["b/2", "a", "b/1", "c"] {
            store.put("bucket", key, Bytes::new(), "").await.unwrap();
        }
        assert_eq!(
            store.list_keys("bucket", 10).await.unwrap(),
            vec!["a", "b/1", "b/2", "c"]
        );
        assert_eq!(store.list_keys("bucket", 1).await.unwrap(), vec!["a"]);
        assert!(store.list_keys("empty", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsafe_segments_are_encoded_and_listed_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let keys = [
            "../etc/passwd",
            "a//b",
            ".hidden",
            "",
            "widgets/.net-team/1",
            "widgets/sales//1",
            "100%/x\\y",
        ];
        for key in keys {
            store
                .put("bucket", key, Bytes::from(key.to_string()), "")
                .await
                .unwrap();
        }

        assert!(!dir.path().join("etc").exists());
        assert!(dir.path().join("bucket/%2E%2E/etc/passwd").is_file());
        assert!(dir.path().join("bucket/widgets/%2Enet-team/1").is_file());
        assert!(dir.path().join("bucket/widgets/sales/%/1").is_file());

        let mut expected: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        expected.sort();
        assert_eq!(store.list_keys("bucket", 100).await.unwrap(), expected);
        for key in keys {
            let body = store.get("bucket", key).await.unwrap();
            assert_eq!(body.data, Bytes::from(key.to_string()), "{key}");
        }
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case(".staging")]
    #[case("a/b")]
    #[tokio::test]
    async fn unsafe_bucket_names_are_rejected(#[case] bucket: &str) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(matches!(
            store.list_keys(bucket, 1).await,
            Err(ObjectStoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn segment_codec_keeps_plain_names_readable() {
        assert_eq!(encode_segment("mary-matthews"), "mary-matthews");
        assert_eq!(encode_segment("a.b"), "a.b");
        assert_eq!(encode_segment("."), "%2E");
        assert_eq!(decode_segment("%2E%2E").as_deref(), Some(".."));
        assert_eq!(decode_segment("%"), Some(String::new()));
        assert_eq!(decode_segment("%zz"), None);
        assert_eq!(decode_segment("trailing%2"), None);
    }

    #[tokio::test]
    async fn put_twice_leaves_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let body = Bytes::from_static(b"{\"widgetId\":\"1\"}");

        store.put("web", "widgets/o/1", body.clone(), "").await.unwrap();
        let first = store.get("web", "widgets/o/1").await.unwrap();
        store.put("web", "widgets/o/1", body, "").await.unwrap();
        let second = store.get("web", "widgets/o/1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list_keys("web", 10).await.unwrap(), vec!["widgets/o/1"]);
        assert!(store.list_keys(STAGING_DIR, 10).await.is_err());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store.put("b", "k", Bytes::new(), "").await.unwrap();
        store.delete("b", "k").await.unwrap();
        store.delete("b", "k").await.unwrap();
        assert!(matches!(
            store.get("b", "k").await,
            Err(ObjectStoreError::NotFound { .. })
        ));
    }
}
