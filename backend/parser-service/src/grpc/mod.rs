//! gRPC surface of the parser.

use std::sync::Arc;
use tonic::{Request, Response, Status};

use grpc_clients::vget::parser::v1::parser_service_server::ParserService as ParserServiceTrait;
use grpc_clients::vget::parser::v1::*;

use crate::service::ParserService;

pub struct ParserServiceImpl {
    service: Arc<ParserService>,
}

impl ParserServiceImpl {
    pub fn new(service: Arc<ParserService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl ParserServiceTrait for ParserServiceImpl {
    async fn validate_url(
        &self,
        request: Request<ValidateUrlRequest>,
    ) -> Result<Response<ValidateUrlResponse>, Status> {
        let req = request.into_inner();
        let (valid, platform, message) = self.service.validate_url(&req.url);
        Ok(Response::new(ValidateUrlResponse {
            valid,
            platform,
            message,
        }))
    }

    async fn parse_url(
        &self,
        request: Request<ParseUrlRequest>,
    ) -> Result<Response<ParseUrlResponse>, Status> {
        let req = request.into_inner();
        let result = self
            .service
            .parse_url(&req.url, req.skip_cache)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(ParseUrlResponse {
            video_id: result.video_id,
            platform: result.platform,
            title: result.title,
            description: result.description,
            duration: result.duration,
            thumbnail: result.thumbnail,
            author: result.author,
            view_count: result.view_count,
            formats: result
                .formats
                .into_iter()
                .map(|f| MediaFormat {
                    format_id: f.format_id,
                    quality: f.quality,
                    extension: f.extension,
                    filesize: f.filesize,
                    height: f.height,
                    width: f.width,
                    fps: f.fps,
                    video_codec: f.video_codec,
                    audio_codec: f.audio_codec,
                    score: f.score,
                })
                .collect(),
            cookie_id: result.cookie_id,
            proxy_url: result.proxy_url,
        }))
    }
}
