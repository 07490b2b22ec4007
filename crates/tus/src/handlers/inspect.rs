use std::sync::Arc;

use salvo_core::http::{HeaderValue, StatusCode};
use salvo_core::{Depot, Request, Response, Router, handler};

use crate::engine::TusEngine;
use crate::error::TusError;
use crate::handlers::apply_common_headers;
use crate::utils::check_tus_version;
use crate::{H_TUS_RESUMABLE, H_UPLOAD_LENGTH, H_UPLOAD_OFFSET};

/// INSPECT (HEAD on `/files/<id>`, §4.D).
#[handler]
async fn inspect(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let engine = depot.obtain::<Arc<TusEngine>>().expect("missing tus engine");
    apply_common_headers(&mut res.headers);
    res.headers
        .insert("cache-control", HeaderValue::from_static("no-store"));

    if let Err(e) = check_tus_version(
        req.headers()
            .get(H_TUS_RESUMABLE)
            .and_then(|v| v.to_str().ok()),
    ) {
        res.status_code = Some(TusError::Protocol(e).status());
        return;
    }

    let Some(id) = req.param::<String>("id") else {
        res.status_code = Some(StatusCode::BAD_REQUEST);
        return;
    };
    let uri = format!("/files/{id}");

    let info = match engine.inspect(&uri).await {
        Ok(info) => info,
        Err(e) => {
            res.status_code = Some(e.status());
            return;
        }
    };

    res.status_code = Some(StatusCode::OK);
    res.headers.insert(
        H_UPLOAD_OFFSET,
        HeaderValue::from_str(&info.offset.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    res.headers.insert(
        H_UPLOAD_LENGTH,
        HeaderValue::from_str(&info.total_size.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
}

pub(crate) fn inspect_handler() -> Router {
    Router::with_path("{id}").head(inspect)
}
