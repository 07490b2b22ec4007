use std::sync::Arc;

use futures_util::StreamExt;
use salvo_core::http::{HeaderValue, StatusCode};
use salvo_core::{Depot, Request, Response, Router, handler};
use tokio::io;

use crate::engine::TusEngine;
use crate::error::{ProtocolError, TusError};
use crate::handlers::apply_common_headers;
use crate::staging::ByteStream;
use crate::utils::{check_tus_version, parse_u64};
use crate::{CT_OFFSET_OCTET_STREAM, H_CONTENT_TYPE, H_TUS_RESUMABLE, H_UPLOAD_OFFSET};

/// APPEND (PATCH on `/files/<id>`, §4.D).
#[handler]
async fn append(req: &mut Request, depot: &mut Depot, res: &mut Response) {
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

    let content_type = req
        .headers()
        .get(H_CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if content_type != Some(CT_OFFSET_OCTET_STREAM) {
        res.status_code = Some(TusError::Protocol(ProtocolError::InvalidContentType).status());
        return;
    }

    let offset = match parse_u64(
        req.headers().get(H_UPLOAD_OFFSET).and_then(|v| v.to_str().ok()),
        H_UPLOAD_OFFSET,
    ) {
        Ok(offset) => offset,
        Err(e) => {
            res.status_code = Some(TusError::Protocol(e).status());
            return;
        }
    };

    let Some(id) = req.param::<String>("id") else {
        res.status_code = Some(StatusCode::BAD_REQUEST);
        return;
    };
    let uri = format!("/files/{id}");

    let body = req.take_body();
    let stream: ByteStream = Box::pin(body.map(|item| item.map_err(io::Error::other)));

    let info = match engine.append(&uri, offset, stream).await {
        Ok(info) => info,
        Err(TusError::OffsetMismatch { expected, .. }) => {
            res.status_code = Some(StatusCode::CONFLICT);
            res.render(format!("offset mismatch: server offset is {expected}"));
            return;
        }
        Err(e) => {
            res.status_code = Some(e.status());
            return;
        }
    };

    res.status_code = Some(StatusCode::NO_CONTENT);
    res.headers.insert(
        H_UPLOAD_OFFSET,
        HeaderValue::from_str(&info.offset.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
}

pub(crate) fn append_handler() -> Router {
    Router::with_path("{id}").patch(append)
}
