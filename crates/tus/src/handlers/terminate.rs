use std::sync::Arc;

use salvo_core::http::StatusCode;
use salvo_core::{Depot, Request, Response, Router, handler};

use crate::engine::TusEngine;
use crate::error::TusError;
use crate::handlers::apply_common_headers;
use crate::utils::check_tus_version;
use crate::H_TUS_RESUMABLE;

/// TERMINATE (DELETE on `/files/<id>`, §4.D).
#[handler]
async fn terminate(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let engine = depot.obtain::<Arc<TusEngine>>().expect("missing tus engine");
    apply_common_headers(&mut res.headers);

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

    match engine.terminate(&uri).await {
        Ok(()) => res.status_code = Some(StatusCode::NO_CONTENT),
        Err(e) => res.status_code = Some(e.status()),
    }
}

pub(crate) fn terminate_handler() -> Router {
    Router::with_path("{id}").delete(terminate)
}
