//! Impls - ports の実装
//!
//! # クライアント（外部サービスの代わり）
//! - **MemoryObjectStore / FsObjectStore**: オブジェクトストア
//! - **MemoryTable / FsTable**: key-value table
//! - **InMemoryMessageQueue / SpoolQueue**: 配送キュー
//!
//! # アダプタ（クライアントの上に載る）
//! - **BucketSource / QueueSource**: Source
//! - **DocumentStore / AttributeStore**: WidgetStore
//! - **BucketDeadLetter**: DeadLetterSink
//!
//! Fs / Spool 系はプロセスをまたいで状態を共有できるので CLI が使います。
//! Memory 系はテストと組み込み用です。

pub mod attribute_store;
pub mod bucket_source;
pub mod dead_letter;
pub mod document_store;
pub mod fs_object_store;
pub mod fs_table;
pub mod inmem_queue;
pub mod memory_object_store;
pub mod memory_table;
pub mod queue_source;
pub mod spool_queue;

pub use self::attribute_store::AttributeStore;
pub use self::bucket_source::BucketSource;
pub use self::dead_letter::BucketDeadLetter;
pub use self::document_store::{DocumentStore, document_key};
pub use self::fs_object_store::FsObjectStore;
pub use self::fs_table::FsTable;
pub use self::inmem_queue::InMemoryMessageQueue;
pub use self::memory_object_store::MemoryObjectStore;
pub use self::memory_table::MemoryTable;
pub use self::queue_source::QueueSource;
pub use self::spool_queue::SpoolQueue;
