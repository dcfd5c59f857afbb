//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 設定から実装を選び、配線する
//! - **Router**: 1 件の request を検証・正規化・保存・ack する
//! - **DispatchLoop**: source を polling して Router に渡す
//! - **Ingress**: 外部から受けた request を検証して配送キューへ載せる

pub mod builder;
pub mod dispatch_loop;
pub mod ingress;
pub mod router;

pub use self::builder::{AppBuilder, BuildError, LocalBackends};
pub use self::dispatch_loop::{DispatchHandle, DispatchLoop, Tick};
pub use self::ingress::{Ingress, IngressResponse};
pub use self::router::{RejectPolicy, Router};
