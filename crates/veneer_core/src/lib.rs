//! Veneer Core
//!
//! Foundational types shared by every Veneer crate:
//!
//! - **Identity**: [`FacadeId`], the stable per-instance handle used as the
//!   key everywhere identity matters
//! - **Values**: the dynamic [`Value`] model carried by descriptors and
//!   written into facades, plus [`Props`] merge helpers
//! - **Events**: pointer [`EventType`]s and the [`EventRegistry`] mapping
//!   `(event type, facade)` pairs to one or more handlers
//!
//! # Example
//!
//! ```rust
//! use veneer_core::{Color, Value};
//!
//! let a = Value::from(0.0);
//! let b = Value::from(Color::from_hex(0xff0000));
//! assert!(a.as_number().is_some());
//! assert!(b.as_color().is_some());
//! ```

pub mod error;
pub mod events;
pub mod id;
pub mod value;

pub use error::{CoreError, Result};
pub use events::{EventRegistry, EventType, HandlerIdentity, POINTER_EVENT_TYPES};
pub use id::FacadeId;
pub use value::{merge_deep, merge_shallow, Color, Props, Value};
