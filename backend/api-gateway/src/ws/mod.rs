//! Progress fan-out sockets.
//!
//! One actor per subscriber. Auth rides a query parameter because the
//! socket protocol does not carry headers reliably; it is validated
//! against the same token cache as HTTP. Two modes: a single named
//! channel `progress:{task_id}`, or a pattern subscription over
//! `progress:*` for the user's whole feed.

use actix::{Actor, ActorContext, AsyncContext, Handler, Message, StreamHandler};
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use futures_util::StreamExt;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use vget_common::ProgressEvent;

use crate::error::GatewayError;
use crate::middleware::auth::resolve_token;
use crate::AppState;

/// Heartbeat ping cadence.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// A pong resets the read deadline to now + this.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub token: String,
    #[serde(default)]
    pub task_id: String,
}

/// Upgrade handler.
pub async fn progress_socket(
    state: web::Data<AppState>,
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<ProgressQuery>,
) -> Result<HttpResponse, GatewayError> {
    let user = resolve_token(&state.redis, &state.clients, &query.token).await?;

    let task_id = if query.task_id.is_empty() {
        None
    } else {
        Some(query.task_id.clone())
    };

    info!(user_id = %user.user_id, task_id = ?task_id, "progress socket opened");

    let session = WsProgressSession {
        user_id: user.user_id,
        task_id,
        redis_url: state.redis_url.clone(),
        hb: Instant::now(),
        subscriber: None,
    };

    ws::start(session, &req, stream)
        .map_err(|e| GatewayError::internal(format!("websocket upgrade failed: {e}")))
}

/// A frame forwarded from the pub/sub fabric to this socket.
#[derive(Message)]
#[rtype(result = "()")]
struct ProgressFrame {
    payload: String,
    terminal: bool,
}

struct WsProgressSession {
    user_id: String,
    /// `Some` pins the session to one task and closes it on a terminal
    /// event; `None` follows the whole `progress:*` feed.
    task_id: Option<String>,
    redis_url: String,
    hb: Instant,
    subscriber: Option<tokio::task::JoinHandle<()>>,
}

impl WsProgressSession {
    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!(user_id = %act.user_id, "progress socket heartbeat timed out");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Subscribe on a dedicated connection and forward every payload to
    /// the actor. The application side of the socket stays single-writer:
    /// all frames funnel through the actor mailbox.
    fn start_subscriber(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let addr = ctx.address();
        let redis_url = self.redis_url.clone();
        let task_id = self.task_id.clone();
        let user_id = self.user_id.clone();

        let handle = tokio::spawn(async move {
            let client = match redis::Client::open(redis_url) {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "failed to open pub/sub client");
                    return;
                }
            };
            let mut pubsub = match client.get_async_pubsub().await {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "failed to open pub/sub connection");
                    return;
                }
            };

            let result = match &task_id {
                Some(task_id) => pubsub.subscribe(ProgressEvent::channel(task_id)).await,
                None => pubsub.psubscribe("progress:*").await,
            };
            if let Err(e) = result {
                warn!(error = %e, "pub/sub subscribe failed");
                return;
            }

            let mut messages = pubsub.on_message();
            while let Some(msg) = messages.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, "unreadable pub/sub payload");
                        continue;
                    }
                };

                // Terminal only when the status says so; percent alone
                // never ends a subscription.
                let terminal = serde_json::from_str::<ProgressEvent>(&payload)
                    .map(|evt| evt.status.is_terminal())
                    .unwrap_or(false);

                if addr
                    .try_send(ProgressFrame { payload, terminal })
                    .is_err()
                {
                    break;
                }
            }

            info!(user_id = %user_id, "pub/sub forwarder ended");
        });

        self.subscriber = Some(handle);
    }
}

impl Actor for WsProgressSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.start_heartbeat(ctx);
        self.start_subscriber(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(handle) = self.subscriber.take() {
            handle.abort();
        }
        info!(user_id = %self.user_id, "progress socket closed");
    }
}

impl Handler<ProgressFrame> for WsProgressSession {
    type Result = ();

    fn handle(&mut self, frame: ProgressFrame, ctx: &mut Self::Context) {
        ctx.text(frame.payload);

        // Single-task subscriptions end once the task reaches a terminal
        // status.
        if frame.terminal && self.task_id.is_some() {
            ctx.close(None);
            ctx.stop();
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsProgressSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {
                // Subscribers have nothing to say; inbound data frames
                // are ignored.
            }
            Err(e) => {
                warn!(error = %e, "websocket protocol error");
                ctx.stop();
            }
        }
    }
}
