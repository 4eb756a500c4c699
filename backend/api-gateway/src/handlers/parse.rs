//! Standalone metadata parse endpoint.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use grpc_clients::vget::parser::v1::ParseUrlRequest;

use crate::error::GatewayError;
use crate::handlers::with_deadline;
use crate::middleware::auth::authenticated_user;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ParseBody {
    pub url: String,
    #[serde(default)]
    pub skip_cache: bool,
}

pub async fn parse_url(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ParseBody>,
) -> Result<HttpResponse, GatewayError> {
    authenticated_user(&req)?;

    let mut parser = state.clients.parser.clone();
    let resp = with_deadline(
        state.config.grpc.timeout_secs,
        "parser",
        parser.parse_url(ParseUrlRequest {
            url: body.url.clone(),
            skip_cache: body.skip_cache,
        }),
    )
    .await?;

    let formats: Vec<_> = resp
        .formats
        .iter()
        .map(|f| {
            json!({
                "format_id": f.format_id,
                "quality": f.quality,
                "extension": f.extension,
                "filesize": f.filesize,
                "height": f.height,
                "width": f.width,
                "fps": f.fps,
                "video_codec": f.video_codec,
                "audio_codec": f.audio_codec,
                "score": f.score,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "video_id": resp.video_id,
        "platform": resp.platform,
        "title": resp.title,
        "description": resp.description,
        "duration": resp.duration,
        "thumbnail": resp.thumbnail,
        "author": resp.author,
        "view_count": resp.view_count,
        "formats": formats,
    })))
}
