//! Per-surface content agent.

use shopview_auth::{AuthDocument, ConfirmationProbe, LinkRequestDetector, LoginDetector};
use shopview_bridge::{receive, Direction, Message, MessageChannel};
use shopview_cart::{CartDocument, CartExtractor};
use shopview_core::{BridgeConfig, Millis, SharedStore, ShopviewResult, SurfaceId};
use shopview_nav::{ClickOutcome, ClickTarget, Classifier, HashGuard, HashOutcome, PurchaseIntent};
use tracing::{debug, info, warn};
use url::Url;

/// Everything the agent reads from the document
pub trait ContentDocument: CartDocument + AuthDocument {}

impl<T: CartDocument + AuthDocument> ContentDocument for T {}

/// What the content script does after an input
#[derive(Debug, Clone, PartialEq)]
pub enum ContentAction {
    /// Send to the host
    Post(Message),
    /// Local history back
    GoBack,
}

/// Verdict on a click
#[derive(Debug, Clone, PartialEq)]
pub struct ClickDecision {
    /// Cancel the click at the source
    pub cancel: bool,
    pub actions: Vec<ContentAction>,
}

/// Send the `Post` actions over `channel` and return the local ones.
pub fn dispatch(
    actions: Vec<ContentAction>,
    channel: &mut dyn MessageChannel,
) -> Vec<ContentAction> {
    actions
        .into_iter()
        .filter_map(|action| match action {
            ContentAction::Post(message) => {
                channel.send(Direction::ContentToHost, &message);
                None
            }
            local => Some(local),
        })
        .collect()
}

pub struct ContentAgent {
    surface: SurfaceId,
    cart: CartExtractor,
    intent: PurchaseIntent,
    hash_guard: HashGuard,
    detector: LinkRequestDetector,
    probe: ConfirmationProbe,
    login: LoginDetector,
    /// Host reported a signed-in customer; confirmation signals stop
    suppressed: bool,
    active: bool,
    last_url: Option<Url>,
    last_login: Option<bool>,
}

impl ContentAgent {
    pub fn new(surface: SurfaceId, config: &BridgeConfig, store: SharedStore) -> ShopviewResult<Self> {
        let classifier = Classifier::default();
        let intent = PurchaseIntent::new(config, classifier.clone())?;
        let hash_guard = HashGuard::new(
            classifier.clone(),
            intent.matcher().clone(),
            config.platform,
            config.purchase_policy,
            config.navigation.hash_cooldown_ms,
        );

        Ok(Self {
            surface,
            cart: CartExtractor::new(surface, config.cart.clone(), classifier, store),
            intent,
            hash_guard,
            detector: LinkRequestDetector::new(&config.handoff),
            probe: ConfirmationProbe::new(&config.probe),
            login: LoginDetector::new(&config.login),
            suppressed: false,
            active: true,
            last_url: None,
            last_login: None,
        })
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn probe(&self) -> &ConfirmationProbe {
        &self.probe
    }

    pub fn cart(&self) -> &CartExtractor {
        &self.cart
    }

    /// The document (re)loaded. Per-load state starts over.
    pub fn on_load<D: ContentDocument>(&mut self, now: Millis, doc: &D) -> Vec<ContentAction> {
        let url = CartDocument::location(doc);
        info!(surface = %self.surface, %url, "Content agent attached");
        self.hash_guard.reset();
        self.probe.stop();
        self.last_login = None;
        self.last_url = Some(url);
        self.cart
            .on_load(now)
            .map(ContentAction::Post)
            .into_iter()
            .collect()
    }

    /// Mutation observer callback
    pub fn on_mutation(&mut self, now: Millis) {
        self.cart.on_mutation(now);
    }

    pub fn on_click<D: ContentDocument>(
        &mut self,
        now: Millis,
        doc: &D,
        target: &ClickTarget,
    ) -> ClickDecision {
        let url = CartDocument::location(doc);
        if let ClickOutcome::Cancel(checkout) = self.intent.on_click(target, &url) {
            return ClickDecision {
                cancel: true,
                actions: vec![ContentAction::Post(Message::OpenExternalCheckout {
                    url: checkout.url,
                    product_id: checkout.product_id,
                    product_name: checkout.product_name,
                })],
            };
        }

        let actions = match self.detector.on_click(now, &target.text) {
            Some(message) => self.link_requested(now, message),
            None => Vec::new(),
        };
        ClickDecision {
            cancel: false,
            actions,
        }
    }

    /// Outbound request observed (fetch/XHR wrapper)
    pub fn on_request(&mut self, now: Millis, request_url: &str) -> Vec<ContentAction> {
        match self.detector.on_request(now, request_url) {
            Some(message) => self.link_requested(now, message),
            None => Vec::new(),
        }
    }

    fn link_requested(&mut self, now: Millis, message: Message) -> Vec<ContentAction> {
        if self.suppressed {
            // a new request means the customer is signing in again
            debug!(surface = %self.surface, "Link request while suppressed, resuming");
            self.suppressed = false;
        }
        self.probe.start(now);
        vec![ContentAction::Post(message)]
    }

    /// Hash-based navigation inside the single-page store.
    pub fn on_hash_change(&mut self, now: Millis, to: &Url) -> Vec<ContentAction> {
        let from = self.last_url.replace(to.clone());
        self.cart.on_mutation(now);

        let Some(from) = from else {
            return Vec::new();
        };
        match self.hash_guard.on_hash_change(now, &from, to) {
            HashOutcome::Ignore => Vec::new(),
            HashOutcome::Bounce { back_to } => {
                let message = Message::OpenExternalCheckout {
                    url: back_to.to_string(),
                    product_id: self.intent.matcher().product_id(&back_to),
                    product_name: None,
                };
                self.last_url = Some(back_to);
                vec![ContentAction::GoBack, ContentAction::Post(message)]
            }
        }
    }

    /// Raw text posted by the host. Malformed input is dropped.
    pub fn receive<D: ContentDocument>(&mut self, now: Millis, doc: &D, raw: &str) -> Vec<ContentAction> {
        match receive(raw) {
            Some(message) => self.on_host_message(now, doc, &message),
            None => Vec::new(),
        }
    }

    pub fn on_host_message<D: ContentDocument>(
        &mut self,
        now: Millis,
        doc: &D,
        message: &Message,
    ) -> Vec<ContentAction> {
        match message {
            Message::TabActive { value } => {
                self.active = *value;
                if !*value {
                    return Vec::new();
                }
                self.cart
                    .force_check(doc)
                    .map(ContentAction::Post)
                    .into_iter()
                    .collect()
            }
            Message::Ping {} => {
                let mut actions: Vec<ContentAction> = self
                    .cart
                    .force_check(doc)
                    .map(ContentAction::Post)
                    .into_iter()
                    .collect();
                actions.extend(self.check_login(doc));
                actions
            }
            Message::AuthState { logged_in } => {
                self.suppressed = *logged_in;
                if *logged_in {
                    self.probe.stop();
                }
                debug!(surface = %self.surface, logged_in, "Host auth state");
                Vec::new()
            }
            other => {
                warn!(
                    surface = %self.surface,
                    message_type = other.type_name(),
                    now,
                    "Ignoring content-bound message of the wrong direction"
                );
                Vec::new()
            }
        }
    }

    fn check_login<D: ContentDocument>(&mut self, doc: &D) -> Vec<ContentAction> {
        let verdict = self.login.detect(doc);
        let mut actions = vec![ContentAction::Post(verdict.to_message())];
        if verdict.logged_in && self.last_login == Some(false) {
            actions.push(ContentAction::Post(Message::LoginSuccess {}));
        }
        self.last_login = Some(verdict.logged_in);
        actions
    }

    /// Run due work: cart checks and probe attempts.
    pub fn tick<D: ContentDocument>(&mut self, now: Millis, doc: &D) -> Vec<ContentAction> {
        let mut actions: Vec<ContentAction> = self
            .cart
            .tick(doc, now)
            .into_iter()
            .map(ContentAction::Post)
            .collect();

        if self.suppressed {
            self.probe.stop();
        } else if let Some(message) = self.probe.tick(doc, now) {
            actions.push(ContentAction::Post(message));
        }
        actions
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        match (self.cart.next_deadline(), self.probe.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Surface is going away
    pub fn detach(&mut self) {
        self.cart.stop();
        self.probe.stop();
    }
}
