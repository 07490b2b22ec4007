//! Test utils for unit tests.

mod client;
mod request;
mod response;
pub use client::TestClient;
pub use request::{RequestBuilder, SendTarget};
pub use response::ResponseExt;
