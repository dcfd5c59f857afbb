//! widgetq-core
//!
//! Core building blocks for the widget request pipeline.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, request, validation, widget, attribute, outcome, errors）
//! - **ports**: 抽象化レイヤー（Source, WidgetStore, ObjectStore, KeyValueTable, MessageQueue, Clock など）
//! - **impls**: ports の実装（in-memory / filesystem の client と、その上のアダプタ）
//! - **app**: アプリケーションロジック（builder, router, dispatch_loop, ingress）
//! - **config**: 起動設定と起動時検証
//! - **observability**: ログ初期化と router の集計

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
