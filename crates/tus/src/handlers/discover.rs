use std::sync::Arc;

use salvo_core::http::{HeaderValue, StatusCode};
use salvo_core::{Depot, Request, Response, Router, handler};

use crate::engine::TusEngine;
use crate::handlers::apply_common_headers;
use crate::{H_TUS_EXTENSION, H_TUS_MAX_SIZE, H_TUS_VERSION, TUS_EXTENSIONS, TUS_VERSION};

/// DISCOVER (OPTIONS on the collection root, §4.D).
#[handler]
async fn discover(_req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let engine = depot.obtain::<Arc<TusEngine>>().expect("missing tus engine");
    apply_common_headers(&mut res.headers);

    res.status_code = Some(StatusCode::NO_CONTENT);
    res.headers
        .insert(H_TUS_VERSION, HeaderValue::from_static(TUS_VERSION));
    res.headers
        .insert(H_TUS_EXTENSION, HeaderValue::from_static(TUS_EXTENSIONS));
    res.headers.insert(
        H_TUS_MAX_SIZE,
        HeaderValue::from_str(&engine.config().max_upload_size.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
}

pub(crate) fn discover_handler() -> Router {
    Router::new().options(discover)
}
