//! gRPC codegen and typed clients for the vget service mesh.
//!
//! Centralizes proto compilation and provides a connected client bundle
//! for the gateway. Each service imports its server trait from here.

use tonic::transport::Channel;

/// Messages larger than this are rejected at the transport layer.
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

// Generated proto modules.
pub mod vget {
    pub mod auth {
        pub mod v1 {
            tonic::include_proto!("vget.auth.v1");
        }
        pub use v1::*;
    }
    pub mod parser {
        pub mod v1 {
            tonic::include_proto!("vget.parser.v1");
        }
        pub use v1::*;
    }
    pub mod asset {
        pub mod v1 {
            tonic::include_proto!("vget.asset.v1");
        }
        pub use v1::*;
    }
    pub mod downloader {
        pub mod v1 {
            tonic::include_proto!("vget.downloader.v1");
        }
        pub use v1::*;
    }
}

pub use vget::asset::v1::asset_service_client::AssetServiceClient;
pub use vget::auth::v1::auth_service_client::AuthServiceClient;
pub use vget::downloader::v1::downloader_service_client::DownloaderServiceClient;
pub use vget::parser::v1::parser_service_client::ParserServiceClient;

/// Connected clients for every downstream service the gateway talks to.
///
/// tonic clients are cheap to clone (they share the underlying channel),
/// so handlers clone out of this bundle per request.
#[derive(Clone)]
pub struct GrpcClients {
    pub auth: AuthServiceClient<Channel>,
    pub parser: ParserServiceClient<Channel>,
    pub asset: AssetServiceClient<Channel>,
}

impl GrpcClients {
    pub async fn connect(
        auth_addr: &str,
        parser_addr: &str,
        asset_addr: &str,
    ) -> Result<Self, tonic::transport::Error> {
        tracing::info!(%auth_addr, %parser_addr, %asset_addr, "connecting gRPC clients");

        let auth = AuthServiceClient::connect(auth_addr.to_string())
            .await?
            .max_decoding_message_size(MAX_MESSAGE_SIZE);
        let parser = ParserServiceClient::connect(parser_addr.to_string())
            .await?
            .max_decoding_message_size(MAX_MESSAGE_SIZE);
        let asset = AssetServiceClient::connect(asset_addr.to_string())
            .await?
            .max_decoding_message_size(MAX_MESSAGE_SIZE);

        Ok(Self {
            auth,
            parser,
            asset,
        })
    }
}
