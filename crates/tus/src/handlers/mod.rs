//! HTTP adapters over [`crate::engine::TusEngine`]. Handlers stay thin:
//! parse headers, call the engine, translate the result back to status
//! codes and headers. All protocol logic lives in `engine`.

mod append;
mod create;
mod discover;
mod inspect;
mod progress;
mod terminate;

pub(crate) use append::append_handler;
pub(crate) use create::create_handler;
pub(crate) use discover::discover_handler;
pub(crate) use inspect::inspect_handler;
pub(crate) use progress::progress_handler;
pub(crate) use terminate::terminate_handler;

use salvo_core::http::{HeaderMap, HeaderValue};

use crate::{H_TUS_RESUMABLE, TUS_VERSION};

/// Stamps the one header every TUS response carries, per §4.D.
pub(crate) fn apply_common_headers(headers: &mut HeaderMap) -> &mut HeaderMap {
    headers.insert(H_TUS_RESUMABLE, HeaderValue::from_static(TUS_VERSION));
    headers
}
