use rand::seq::SliceRandom;
use tracing::{debug, info, warn};
use crate::error::RelayError;
use super::envelope::{Envelope, PayloadKind};
use super::registry::{deliver, Outbound, Registry};

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Queued for the named receiver.
    Forwarded { to: String },
    /// A denial was queued for the named sender.
    Denied { to: String },
    /// Nothing was delivered: unknown answer target, vanished sender, or a failed send.
    Dropped,
}

/// Decides where offers and answers go. Holds no state beyond the shared registry.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Registry,
}

impl Router {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Routes one inbound text frame.
    pub fn route(&self, text: &str) -> Result<Routed, RelayError> {
        let envelope: Envelope = serde_json::from_str(text)?;

        if !envelope.is_signaling() {
            return Err(RelayError::NotSignaling(envelope.kind));
        }

        match envelope.payload_kind() {
            None => Err(RelayError::MissingPayload),
            Some(PayloadKind::Offer) => self.handle_offer(envelope),
            Some(PayloadKind::Answer) => Ok(self.handle_answer(&envelope, text)),
            Some(PayloadKind::Denied) => Err(RelayError::UnsupportedPayload("denied".to_string())),
            Some(PayloadKind::Other(kind)) => Err(RelayError::UnsupportedPayload(kind)),
        }
    }

    /// Forwards an offer to its addressed receiver, or to a random peer other than the
    /// sender when none is addressed. Denies when no receiver is available.
    pub fn handle_offer(&self, mut envelope: Envelope) -> Result<Routed, RelayError> {
        if envelope.from.is_empty() {
            return Err(RelayError::MissingSender);
        }

        if self.registry.count() <= 1 {
            return self.deny(&envelope.from);
        }

        let (receiver, channel) = match envelope.target() {
            Some(to) => match self.registry.lookup(to) {
                Some(channel) => (to.to_string(), channel),
                None => {
                    debug!("Offer from {} addressed to unknown peer {}", envelope.from, to);
                    return self.deny(&envelope.from);
                }
            },
            None => match self.pick_receiver(&envelope.from) {
                Some(picked) => picked,
                None => return self.deny(&envelope.from),
            },
        };

        envelope.to = Some(receiver.clone());
        let frame = serde_json::to_string(&envelope).map_err(RelayError::Serialize)?;

        info!("Forwarding offer from {} to {}", envelope.from, receiver);
        Ok(self.send(&receiver, &channel, frame, Routed::Forwarded { to: receiver.clone() }))
    }

    /// Forwards an answer to its addressed receiver as the exact frame that arrived.
    pub fn handle_answer(&self, envelope: &Envelope, raw: &str) -> Routed {
        let Some(to) = envelope.target() else {
            warn!("Dropping answer from {} without a receiver", envelope.from);
            return Routed::Dropped;
        };

        match self.registry.lookup(to) {
            Some(channel) => {
                info!("Forwarding answer from {} to {}", envelope.from, to);
                self.send(to, &channel, raw.to_string(), Routed::Forwarded { to: to.to_string() })
            }
            None => {
                warn!("Dropping answer from {} to unknown peer {}", envelope.from, to);
                Routed::Dropped
            }
        }
    }

    fn pick_receiver(&self, sender: &str) -> Option<(String, Outbound)> {
        let eligible: Vec<(String, Outbound)> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|(id, _)| id != sender)
            .collect();

        eligible.choose(&mut rand::thread_rng()).cloned()
    }

    fn deny(&self, sender: &str) -> Result<Routed, RelayError> {
        info!("Denying offer from {}", sender);

        let Some(channel) = self.registry.lookup(sender) else {
            debug!("Sender {} is no longer connected, dropping denial", sender);
            return Ok(Routed::Dropped);
        };

        let frame = serde_json::to_string(&Envelope::denial(sender)).map_err(RelayError::Serialize)?;
        Ok(self.send(sender, &channel, frame, Routed::Denied { to: sender.to_string() }))
    }

    // Delivery is best effort: a failed send is logged and never retried or reported.
    fn send(&self, to: &str, channel: &Outbound, frame: String, outcome: Routed) -> Routed {
        match deliver(to, channel, frame) {
            Ok(()) => outcome,
            Err(e) => {
                warn!("{}", e);
                Routed::Dropped
            }
        }
    }
}
