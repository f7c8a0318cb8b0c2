//! Sign-in token normalization and identity.

use regex::Regex;
use sha2::{Digest, Sha256};
use shopview_core::config::HandoffConfig;
use shopview_core::{ShopviewError, ShopviewResult};
use std::borrow::Cow;
use std::sync::OnceLock;
use url::Url;

/// Shortest text accepted as a bare token
const MIN_TOKEN_LEN: usize = 16;

fn embedded_url() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s<>"'\]\[]+"#).ok())
        .as_ref()
}

/// Turns pasted or clipboard text into the URL to load in the surface.
#[derive(Debug, Clone)]
pub struct TokenNormalizer {
    sign_in_url: Url,
    allowed_hosts: Vec<String>,
    token_params: Vec<String>,
}

impl TokenNormalizer {
    pub fn new(store_url: &str, config: &HandoffConfig) -> ShopviewResult<Self> {
        let store_url = Url::parse(store_url)?;
        let sign_in_url = Url::parse(&config.sign_in_url)?;
        let allowed_hosts = [store_url.host_str(), sign_in_url.host_str()]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .collect();

        Ok(Self {
            sign_in_url,
            allowed_hosts,
            token_params: config.token_params.clone(),
        })
    }

    /// Accepts a sign-in URL, text containing one, a percent-encoded URL, or
    /// a bare token (expanded against the sign-in URL).
    pub fn normalize(&self, raw: &str) -> ShopviewResult<Url> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ShopviewError::token("no text to sign in with"));
        }

        let decoded: Cow<'_, str> =
            if text.starts_with("http%3A") || text.starts_with("https%3A") {
                urlencoding::decode(text)
                    .map_err(|e| ShopviewError::token(format!("bad percent-encoding: {}", e)))?
            } else {
                Cow::Borrowed(text)
            };
        let text: &str = &decoded;

        let url = match embedded_url().and_then(|re| re.find(text)) {
            Some(m) => {
                let candidate = m.as_str().trim_end_matches(['.', ',', ';', ')', '>']);
                Url::parse(candidate)
                    .map_err(|e| ShopviewError::token(format!("unreadable link: {}", e)))?
            }
            None => self.expand_bare(text)?,
        };

        self.check(&url)?;
        Ok(url)
    }

    fn expand_bare(&self, text: &str) -> ShopviewResult<Url> {
        let looks_like_token = text.len() >= MIN_TOKEN_LEN
            && text
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'));
        if !looks_like_token {
            return Err(ShopviewError::token("text is neither a link nor a token"));
        }
        let param = self
            .token_params
            .first()
            .ok_or_else(|| ShopviewError::token("no token parameter configured"))?;

        let separator = if self.sign_in_url.query().is_some() {
            '&'
        } else {
            '?'
        };
        let expanded = format!(
            "{}{}{}={}",
            self.sign_in_url,
            separator,
            urlencoding::encode(param),
            urlencoding::encode(text)
        );
        Ok(Url::parse(&expanded)?)
    }

    fn check(&self, url: &Url) -> ShopviewResult<()> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ShopviewError::token(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }

        let host_allowed = url
            .host_str()
            .map(|host| self.allowed_hosts.iter().any(|h| h == &host.to_lowercase()))
            .unwrap_or(false);
        let has_token = url.query_pairs().any(|(key, value)| {
            !value.is_empty() && self.token_params.iter().any(|p| p.as_str() == key)
        });

        if host_allowed || has_token {
            Ok(())
        } else {
            Err(ShopviewError::token(format!("{} is not a sign-in link", url)))
        }
    }
}

/// Identity of a token: SHA-256 of the normalized URL, lowercase hex
pub fn token_hash(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
