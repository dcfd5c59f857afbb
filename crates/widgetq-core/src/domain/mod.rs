//! Domain model (ids, requests, widgets, attributes, outcomes).
//!
//! I/O を持たない純粋な型と関数だけを置きます。

pub mod attribute;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod request;
pub mod validation;
pub mod widget;

#[cfg(test)]
pub(crate) mod fixtures;

pub use attribute::{AttributeValue, Item, widget_item};
pub use errors::{AttributeError, ValidationError};
pub use ids::{RequestId, WidgetId, is_canonical};
pub use outcome::{Operation, RouteOutcome};
pub use request::{Request, RequestKind};
pub use validation::{ValidationMode, is_valid, validate};
pub use widget::{Widget, WidgetKey, normalize_owner};
