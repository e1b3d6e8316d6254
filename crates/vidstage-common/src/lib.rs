//! Vidstage-Common: Shared error types and value types.
//!
//! This crate provides functionality used across vidstage:
//!
//! - **Error Handling**: The error taxonomy shared by compositing and job
//!   orchestration, plus a result alias
//! - **Sizes**: The `"<width>x<height>"` size value used both for canvases
//!   and for generation requests
//!
//! # Examples
//!
//! ```
//! use vidstage_common::{Error, ErrorKind, Size};
//!
//! let size: Size = "720x1280".parse().unwrap();
//! assert_eq!((size.width, size.height), (720, 1280));
//!
//! let err = "720".parse::<Size>().unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Config);
//! # let _ = Error::config("unused");
//! ```

pub mod error;
pub mod size;

pub use error::{Error, ErrorKind, Result};
pub use size::Size;
