use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::error::AppError;
use crate::AppState;
use super::registry::{outbound_channel, Outbound};
use super::router::{Routed, Router};

/// Frame queued by the router for this session's socket.
pub struct OutboundFrame(String);

/// One connected peer. Registered under its username for as long as the actor lives.
pub struct SignalingSession {
    id: Uuid,
    username: String,
    router: Router,
    outbound: Option<Outbound>,
    buffer: usize,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    last_heartbeat: Instant,
}

impl SignalingSession {
    pub fn new(username: String, router: Router, relay: &RelayConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            router,
            outbound: None,
            buffer: relay.outbound_buffer,
            heartbeat_interval: relay.heartbeat_interval(),
            client_timeout: relay.client_timeout(),
            last_heartbeat: Instant::now(),
        }
    }

    fn relay(&self, text: &str) {
        match self.router.route(text) {
            Ok(Routed::Forwarded { to }) => debug!("Relayed message from {} to {}", self.username, to),
            Ok(Routed::Denied { .. }) => debug!("Offer from {} denied", self.username),
            Ok(Routed::Dropped) => debug!("Message from {} dropped", self.username),
            Err(e) => warn!("Discarding message from {}: {}", self.username, e),
        }
    }

    /// Pings the client every interval and stops the session once it has been silent
    /// for longer than the client timeout.
    fn start_heartbeat(&self, ctx: &mut <Self as Actor>::Context) {
        let timeout = self.client_timeout;
        ctx.run_interval(self.heartbeat_interval, move |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > timeout {
                warn!("Heartbeat timeout for {} (id: {})", act.username, act.id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for SignalingSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("WebSocket connection established for {} (id: {})", self.username, self.id);

        let (tx, rx) = outbound_channel(self.buffer);
        self.router.registry().register(&self.username, tx.clone());
        self.outbound = Some(tx);

        ctx.add_stream(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (OutboundFrame(frame), rx))
        }));

        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("Disconnecting {} (id: {})", self.username, self.id);
        if let Some(tx) = self.outbound.take() {
            self.router.registry().release(&self.username, &tx);
        }
    }
}

impl StreamHandler<OutboundFrame> for SignalingSession {
    fn handle(&mut self, frame: OutboundFrame, ctx: &mut Self::Context) {
        ctx.text(frame.0);
    }

    // The session keeps its own sender, so the queue only ends on teardown.
    fn finished(&mut self, _ctx: &mut Self::Context) {
        debug!("Outbound queue closed for {}", self.username);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SignalingSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.relay(&text);
            }
            Ok(ws::Message::Binary(bin)) => {
                warn!("Ignoring binary message from {} of {} bytes", self.username, bin.len());
            }
            Ok(ws::Message::Close(reason)) => {
                info!("WebSocket closed by {}: {:?}", self.username, reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(e) => {
                error!("Error reading from {}: {}", self.username, e);
                ctx.stop();
            }
        }
    }
}

/// `GET /ws/{username}`: upgrades the request and starts a session for `username`.
pub async fn ws_route(
    req: HttpRequest,
    stream: web::Payload,
    username: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let username = username.into_inner();
    let peer_addr = req.peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    info!("Received WS request from {} for peer {}", peer_addr, username);

    let session = SignalingSession::new(username, state.router.clone(), &state.config.relay);
    ws::start(session, &req, stream).map_err(|e| {
        warn!("Rejecting non-websocket request from {}: {}", peer_addr, e);
        AppError::Handshake(e.to_string())
    })
}
