//! Best-effort message channel.

use crate::codec;
use crate::message::Message;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Which way a message travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ContentToHost,
    HostToContent,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ContentToHost => "content_to_host",
            Direction::HostToContent => "host_to_content",
        }
    }
}

/// Fire-and-forget send. No acknowledgement, retry or backpressure.
pub trait MessageChannel {
    fn send(&mut self, direction: Direction, message: &Message);
}

/// In-process channel with the delivery properties of a real webview bridge:
/// messages are queued as text per direction and silently dropped while the
/// receiving side is reloading.
#[derive(Debug, Default)]
pub struct LossyChannel {
    to_host: VecDeque<String>,
    to_content: VecDeque<String>,
    content_reloading: bool,
    host_detached: bool,
    dropped: u64,
}

impl LossyChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, host -> content messages are dropped.
    pub fn set_content_reloading(&mut self, reloading: bool) {
        self.content_reloading = reloading;
    }

    /// While set, content -> host messages are dropped.
    pub fn set_host_detached(&mut self, detached: bool) {
        self.host_detached = detached;
    }

    /// Queue raw text as if the other side had posted it.
    pub fn inject_raw(&mut self, direction: Direction, raw: impl Into<String>) {
        match direction {
            Direction::ContentToHost => self.to_host.push_back(raw.into()),
            Direction::HostToContent => self.to_content.push_back(raw.into()),
        }
    }

    /// Take everything queued for the receiver of `direction`, oldest first.
    pub fn drain(&mut self, direction: Direction) -> Vec<String> {
        match direction {
            Direction::ContentToHost => self.to_host.drain(..).collect(),
            Direction::HostToContent => self.to_content.drain(..).collect(),
        }
    }

    /// Take and decode everything queued, discarding malformed entries.
    pub fn receive_all(&mut self, direction: Direction) -> Vec<Message> {
        self.drain(direction)
            .iter()
            .filter_map(|raw| codec::receive(raw))
            .collect()
    }

    pub fn pending(&self, direction: Direction) -> usize {
        match direction {
            Direction::ContentToHost => self.to_host.len(),
            Direction::HostToContent => self.to_content.len(),
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl MessageChannel for LossyChannel {
    fn send(&mut self, direction: Direction, message: &Message) {
        let receiver_gone = match direction {
            Direction::ContentToHost => self.host_detached,
            Direction::HostToContent => self.content_reloading,
        };
        if receiver_gone {
            self.dropped += 1;
            debug!(
                direction = direction.as_str(),
                message_type = message.type_name(),
                "Receiver unavailable, message dropped"
            );
            return;
        }

        match codec::encode(message) {
            Ok(raw) => self.inject_raw(direction, raw),
            Err(e) => {
                self.dropped += 1;
                warn!(error = %e, "Failed to encode bridge message");
            }
        }
    }
}
