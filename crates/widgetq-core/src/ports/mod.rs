//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 外部システム（object store, key-value table, message queue）の client と、
//! router が直接使う capability（Source, WidgetStore, DeadLetterSink）を
//! trait として分け、起動時に選んだ実装を注入します。

pub mod clock;
pub mod dead_letter;
pub mod id_generator;
pub mod key_value;
pub mod message_queue;
pub mod object_store;
pub mod source;
pub mod storage;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::dead_letter::DeadLetterSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::key_value::{KEY_ATTRIBUTE, KeyValueTable, TableError};
pub use self::message_queue::{MessageQueue, QueueError, ReceivedMessage};
pub use self::object_store::{ObjectBody, ObjectStore, ObjectStoreError};
pub use self::source::{AckToken, Delivery, Source, SourceError};
pub use self::storage::{StorageError, WidgetStore};
