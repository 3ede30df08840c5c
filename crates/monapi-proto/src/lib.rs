//! Monitoring API request and response vocabulary.
//!
//! This crate defines the types exchanged with the API core, independent of
//! any storage or transport.
//!
//! # Modules
//!
//! - [`value`] - Runtime values and rows
//! - [`options`] - Typed `get` options and their builder
//! - [`result`] - `get` and mutation results
//! - [`error`] - Protocol errors, error kinds and stable codes
//!
//! ```
//! use monapi_proto::{GetOptions, Output, SortSpec};
//!
//! let options = GetOptions::new()
//!     .with_output(Output::fields(["proxyid", "name"]))
//!     .with_ids("proxyids", [10, 11])
//!     .select("selectHosts", Output::Count)
//!     .sort_by(SortSpec::asc("name"))
//!     .with_limit(50);
//!
//! assert_eq!(options.ids("proxyids"), Some(&[10, 11][..]));
//! ```

pub mod error;
pub mod options;
pub mod result;
pub mod value;

pub use error::{error_codes, Error, ErrorKind};
pub use options::{
    EvalType, GetOptions, OptionValue, Output, SortOrder, SortSpec, TagFilter, TagOperator,
};
pub use result::{GetResult, MutationResult};
pub use value::{Id, Row, Value};
