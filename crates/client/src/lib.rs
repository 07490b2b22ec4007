//! Resumable upload client driver for the TUS engine in the `tus` crate
//! (component G).
//!
//! Given one or more local files and a server base URL, [`Uploader`] carries
//! out the resume-or-create-then-chunked-append algorithm per file, and
//! [`batch::run_batch`] fans that out across files under a bounded-concurrency
//! executor. [`location::LocationStore`] is the durable fingerprint → URL
//! cache that lets a restarted client recognize an upload already in flight.
//!
//! The fingerprint is path+size, not a content hash: a content-hash
//! fingerprint would also catch same-path renames, but it forces a full
//! extra read of the file before an upload can start. Not implemented here,
//! noted as a possible future addition.

pub mod batch;
pub mod checksum;
pub mod error;
pub mod fingerprint;
pub mod location;
pub mod uploader;

pub use error::{ClientError, ClientResult};
pub use location::{InMemoryLocationStore, LocationStore};
pub use uploader::{UploadOutcome, Uploader, UploaderConfig};
