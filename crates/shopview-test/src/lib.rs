//! # Shopview Test
//!
//! Scenario harness for the shopview bridge.
//!
//! A [`FakeDocument`] stands in for the embedded page and a [`Bridge`] wires
//! one content agent and one host handoff machine together over a
//! [`LossyChannel`], driven by a manual clock. Scenario tests live in the
//! `cart`, `navigation` and `handoff` modules.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopview_test::{Bridge, FakeDocument};
//!
//! let mut doc = FakeDocument::at("https://shop.example.com/");
//! doc.set_text(".cart-count", "2");
//! let mut bridge = Bridge::new(BridgeConfig::default(), doc);
//! bridge.load();
//! bridge.advance_to(200);
//! assert_eq!(bridge.cart_counts, vec![2]);
//! ```

use regex::Regex;
use shopview_auth::{AuthDocument, HandoffEffect, HandoffMachine, TokenSource};
use shopview_bridge::{Direction, LossyChannel, Message, MessageChannel};
use shopview_cart::{CartDocument, CommerceApi, LruSessionStore};
use shopview_content::{dispatch, ContentAction, ContentAgent};
use shopview_core::{
    BridgeConfig, Clock, HostTab, ManualClock, MemoryStore, Millis, Rect, SharedStore, SurfaceId,
};
use shopview_nav::ClickTarget;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use url::Url;

#[cfg(test)]
mod cart;
#[cfg(test)]
mod handoff;
#[cfg(test)]
mod navigation;

/// Commerce API double
#[derive(Debug, Clone, Copy)]
pub struct FakeApi {
    quantity: Option<u32>,
}

impl CommerceApi for FakeApi {
    fn cart_quantity(&self) -> Option<u32> {
        self.quantity
    }
}

/// Scriptable page. Selectors are matched literally.
#[derive(Debug, Clone)]
pub struct FakeDocument {
    location: Url,
    api: Option<FakeApi>,
    texts: HashMap<String, String>,
    attrs: HashMap<(String, String), String>,
    counts: HashMap<String, usize>,
    rects: HashMap<String, Rect>,
    /// Text elements with their geometry, in document order
    blocks: Vec<(String, Rect)>,
    body: String,
    storage_keys: HashSet<String>,
}

impl FakeDocument {
    /// Empty page at `url`.
    ///
    /// # Panics
    ///
    /// On an unparseable URL.
    pub fn at(url: &str) -> Self {
        Self {
            location: Url::parse(url).expect("test URL must parse"),
            api: None,
            texts: HashMap::new(),
            attrs: HashMap::new(),
            counts: HashMap::new(),
            rects: HashMap::new(),
            blocks: Vec::new(),
            body: String::new(),
            storage_keys: HashSet::new(),
        }
    }

    /// Change the location without touching the content (hash routing).
    pub fn navigate(&mut self, url: &str) -> &mut Self {
        self.location = Url::parse(url).expect("test URL must parse");
        self
    }

    pub fn url(&self) -> &Url {
        &self.location
    }

    /// Expose a commerce API answering with `quantity`
    pub fn set_api(&mut self, quantity: Option<u32>) -> &mut Self {
        self.api = Some(FakeApi { quantity });
        self
    }

    pub fn remove_api(&mut self) -> &mut Self {
        self.api = None;
        self
    }

    pub fn set_text(&mut self, selector: &str, text: &str) -> &mut Self {
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn set_attr(&mut self, selector: &str, name: &str, value: &str) -> &mut Self {
        self.attrs
            .insert((selector.to_string(), name.to_string()), value.to_string());
        self
    }

    pub fn set_count(&mut self, selector: &str, count: usize) -> &mut Self {
        self.counts.insert(selector.to_string(), count);
        self
    }

    pub fn set_rect(&mut self, selector: &str, rect: Rect) -> &mut Self {
        self.rects.insert(selector.to_string(), rect);
        self
    }

    /// Add a text element, e.g. a confirmation message
    pub fn add_text_block(&mut self, text: &str, rect: Rect) -> &mut Self {
        self.blocks.push((text.to_string(), rect));
        self
    }

    pub fn set_body(&mut self, text: &str) -> &mut Self {
        self.body = text.to_string();
        self
    }

    pub fn add_storage_key(&mut self, key: &str) -> &mut Self {
        self.storage_keys.insert(key.to_string());
        self
    }

    /// Remove every element matching `selector`
    pub fn remove(&mut self, selector: &str) -> &mut Self {
        self.texts.remove(selector);
        self.counts.remove(selector);
        self.rects.remove(selector);
        self.attrs.retain(|(s, _), _| s != selector);
        self
    }

    /// Drop all content but keep the location
    pub fn clear(&mut self) -> &mut Self {
        let location = self.location.clone();
        *self = Self {
            location,
            ..Self::at("about:blank")
        };
        self
    }
}

impl CartDocument for FakeDocument {
    fn location(&self) -> Url {
        self.location.clone()
    }

    fn commerce_api(&self) -> Option<&dyn CommerceApi> {
        self.api.as_ref().map(|api| api as &dyn CommerceApi)
    }

    fn text_of(&self, selector: &str) -> Option<String> {
        self.texts.get(selector).cloned()
    }

    fn attribute_of(&self, selector: &str, name: &str) -> Option<String> {
        self.attrs
            .get(&(selector.to_string(), name.to_string()))
            .cloned()
    }

    fn count(&self, selector: &str) -> usize {
        match self.counts.get(selector) {
            Some(n) => *n,
            None => usize::from(self.exists(selector)),
        }
    }
}

impl AuthDocument for FakeDocument {
    fn body_text(&self) -> String {
        let mut text = self.body.clone();
        for (block, _) in &self.blocks {
            text.push('\n');
            text.push_str(block);
        }
        text
    }

    fn exists(&self, selector: &str) -> bool {
        self.texts.contains_key(selector)
            || self.counts.get(selector).is_some_and(|n| *n > 0)
            || self.rects.contains_key(selector)
            || self.attrs.keys().any(|(s, _)| s == selector)
    }

    fn element_rect(&self, selector: &str) -> Option<Rect> {
        self.rects.get(selector).copied()
    }

    fn text_rect(&self, pattern: &Regex) -> Option<Rect> {
        self.blocks
            .iter()
            .find(|(text, _)| pattern.is_match(text))
            .map(|(_, rect)| *rect)
    }

    fn has_storage_key(&self, key: &str) -> bool {
        self.storage_keys.contains(key)
    }
}

/// Upper bound on message round trips per pump
const MAX_PUMP_ROUNDS: usize = 64;

/// One content agent and one host handoff machine joined by a lossy
/// channel. The host side is reduced to recording what it was asked to do.
pub struct Bridge {
    pub clock: Arc<ManualClock>,
    pub doc: FakeDocument,
    pub agent: ContentAgent,
    pub handoff: HandoffMachine,
    pub channel: LossyChannel,
    /// Cart store shared by the surface, survives [`Bridge::reload`]
    pub cart_store: SharedStore,
    /// Handoff effects other than posts to content, in order
    pub host_effects: Vec<HandoffEffect>,
    pub cart_counts: Vec<u32>,
    pub tab_requests: Vec<HostTab>,
    pub external_checkouts: Vec<String>,
    /// Content-local actions such as history back
    pub local_actions: Vec<ContentAction>,
}

impl Bridge {
    /// # Panics
    ///
    /// On an invalid configuration.
    pub fn new(config: BridgeConfig, doc: FakeDocument) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let cart_store: SharedStore = Arc::new(LruSessionStore::new(
            16,
            config.cart.store_ttl_ms,
            Arc::clone(&clock),
        ));
        let agent = ContentAgent::new(SurfaceId::new(), &config, Arc::clone(&cart_store))
            .expect("content agent config");
        let handoff = HandoffMachine::new(
            &config.store_url,
            config.handoff.clone(),
            Arc::new(MemoryStore::new()),
        )
        .expect("handoff config");

        Self {
            clock,
            doc,
            agent,
            handoff,
            channel: LossyChannel::new(),
            cart_store,
            host_effects: Vec::new(),
            cart_counts: Vec::new(),
            tab_requests: Vec::new(),
            external_checkouts: Vec::new(),
            local_actions: Vec::new(),
        }
    }

    pub fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    /// Document load: attach the agent and deliver what it posts.
    pub fn load(&mut self) {
        let now = self.now();
        let actions = self.agent.on_load(now, &self.doc);
        self.dispatch(actions);
        self.pump();
    }

    /// Host saw the surface commit a navigation
    pub fn committed(&mut self) {
        let now = self.now();
        self.handoff.on_surface_navigated(now);
    }

    /// Full reload onto `url`: messages in flight towards the old document
    /// are lost, and a fresh agent state is built.
    pub fn reload(&mut self, url: &str) {
        let lost = self.channel.drain(Direction::HostToContent).len();
        debug!(lost, url, "Surface reloading");
        self.channel.set_content_reloading(true);
        self.pump();
        self.channel.set_content_reloading(false);
        self.doc.navigate(url);
        self.load();
    }

    /// Click; returns whether the click was cancelled
    pub fn click(&mut self, target: &ClickTarget) -> bool {
        let now = self.now();
        let decision = self.agent.on_click(now, &self.doc, target);
        self.dispatch(decision.actions);
        self.pump();
        decision.cancel
    }

    pub fn request(&mut self, url: &str) {
        let now = self.now();
        let actions = self.agent.on_request(now, url);
        self.dispatch(actions);
        self.pump();
    }

    pub fn mutate(&mut self) {
        let now = self.now();
        self.agent.on_mutation(now);
    }

    /// Hash navigation inside the page
    pub fn hash_change(&mut self, url: &str) {
        self.doc.navigate(url);
        let to = self.doc.url().clone();
        let now = self.now();
        let actions = self.agent.on_hash_change(now, &to);
        self.dispatch(actions);
        self.pump();
    }

    /// Host posts a message to content
    pub fn host_send(&mut self, message: &Message) {
        self.channel.send(Direction::HostToContent, message);
        self.pump();
    }

    /// Content posts a message to the host
    pub fn content_send(&mut self, message: &Message) {
        self.channel.send(Direction::ContentToHost, message);
        self.pump();
    }

    pub fn dismiss_banner(&mut self) {
        let effects = self.handoff.dismiss_banner();
        self.apply(effects);
        self.pump();
    }

    pub fn paste(&mut self, text: &str) {
        let now = self.now();
        let effects = self.handoff.apply_token(now, text, TokenSource::Paste);
        self.apply(effects);
        self.pump();
    }

    pub fn advance(&mut self, ms: Millis) {
        let target = self.now().saturating_add(ms);
        self.advance_to(target);
    }

    /// Run every timer due up to `target`, in deadline order.
    pub fn advance_to(&mut self, target: Millis) {
        loop {
            let next = [self.agent.next_deadline(), self.handoff.next_deadline()]
                .into_iter()
                .flatten()
                .min();
            let at = match next {
                Some(at) if at <= target => at.max(self.now()),
                _ => break,
            };
            self.clock.set(at);

            let actions = self.agent.tick(at, &self.doc);
            self.dispatch(actions);
            let effects = self.handoff.poll(at);
            self.apply(effects);
            self.pump();
        }
        if target > self.now() {
            self.clock.set(target);
        }
    }

    /// Tops of every banner shown so far
    pub fn banner_tops(&self) -> Vec<f64> {
        self.host_effects
            .iter()
            .filter_map(|effect| match effect {
                HandoffEffect::ShowBanner { top } => Some(*top),
                _ => None,
            })
            .collect()
    }

    /// URLs the host loaded into the surface
    pub fn surface_loads(&self) -> Vec<Url> {
        self.host_effects
            .iter()
            .filter_map(|effect| match effect {
                HandoffEffect::LoadInSurface(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    fn dispatch(&mut self, actions: Vec<ContentAction>) {
        let local = dispatch(actions, &mut self.channel);
        self.local_actions.extend(local);
    }

    fn apply(&mut self, effects: Vec<HandoffEffect>) {
        for effect in effects {
            match effect {
                HandoffEffect::PostToContent(message) => {
                    self.channel.send(Direction::HostToContent, &message)
                }
                other => self.host_effects.push(other),
            }
        }
    }

    /// Deliver queued messages both ways until the channel is quiet.
    pub fn pump(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            let to_host = self.channel.receive_all(Direction::ContentToHost);
            let to_content = self.channel.drain(Direction::HostToContent);
            if to_host.is_empty() && to_content.is_empty() {
                return;
            }

            let now = self.now();
            for message in to_host {
                debug!(message_type = message.type_name(), now, "host <- content");
                match message {
                    Message::CartCount { value } => self.cart_counts.push(value),
                    Message::NavigateTab { tab } => self.tab_requests.push(tab),
                    Message::OpenExternalCheckout { url, .. } => self.external_checkouts.push(url),
                    other => {
                        let effects = self.handoff.on_message(now, &other);
                        self.apply(effects);
                    }
                }
            }
            for raw in to_content {
                let actions = self.agent.receive(now, &self.doc, &raw);
                self.dispatch(actions);
            }
        }
        debug!("Pump round limit reached");
    }
}
