//! # docsync document
//!
//! Document values shared by the store contracts and the engine.
//!
//! This crate provides:
//! - [`Value`], the dynamic attribute value
//! - [`Document`], an insertion-ordered attribute map, and the [`doc!`] macro
//! - [`ObjectId`], the store-native identity type
//!
//! All three serialize with `serde`, which is how tests and logs render them.
//!
//! ## Usage
//!
//! ```
//! use docsync_document::{doc, ObjectId, Value};
//!
//! let id = ObjectId::new();
//! let d = doc! { "_id" => id, "username" => "me" };
//! assert_eq!(d.get("_id"), Some(&Value::ObjectId(id)));
//! assert_eq!(d.keys().collect::<Vec<_>>(), vec!["_id", "username"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod object_id;
mod value;

pub use document::Document;
pub use error::{DocumentError, DocumentResult};
pub use object_id::{ObjectId, OBJECT_ID_LEN};
pub use value::Value;
