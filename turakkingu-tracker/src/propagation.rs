//! Cross-domain propagation.
//!
//! Outbound links and forms are rewritten to carry the attribution
//! parameters, so a visitor keeps their identity on partner domains and on
//! subdomains the cookie cannot reach.

use crate::host::{FormElement, LinkElement};
use crate::params::{ParamNames, TrackingParams};
use tracing::debug;
use url::Url;

/// Which destinations receive parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainPolicy {
    allow: Vec<String>,
}

impl DomainPolicy {
    /// An empty allow-list admits every domain.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allow = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { allow }
    }

    pub fn is_open(&self) -> bool {
        self.allow.is_empty()
    }

    /// Whether a link from `page_host` to `target_host` is decorated.
    pub fn allows(&self, page_host: &str, target_host: &str) -> bool {
        let target = target_host.to_ascii_lowercase();
        if target == page_host.to_ascii_lowercase() || self.is_open() {
            return true;
        }
        self.allow.iter().any(|domain| {
            target == *domain
                || target
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Rewrites navigation targets for one page load.
#[derive(Debug, Clone)]
pub struct Propagator {
    page_url: Url,
    names: ParamNames,
    params: TrackingParams,
    policy: DomainPolicy,
    cross_domain: bool,
    tag_same_host: bool,
}

impl Propagator {
    /// `cross_domain` enables full propagation under `policy`;
    /// `tag_same_host` adds the session id to same-host links regardless.
    pub fn new(
        page_url: Url,
        names: ParamNames,
        params: TrackingParams,
        policy: DomainPolicy,
        cross_domain: bool,
        tag_same_host: bool,
    ) -> Self {
        Self {
            page_url,
            names,
            params,
            policy,
            cross_domain,
            tag_same_host,
        }
    }

    pub fn params(&self) -> &TrackingParams {
        &self.params
    }

    /// Resolves a raw target and returns the pairs it should carry.
    ///
    /// `None` when the target is malformed, not http(s), or not admitted.
    fn plan(&self, raw: &str) -> Option<(Url, Vec<(&str, &str)>)> {
        let target = match self.page_url.join(raw.trim()) {
            Ok(url) => url,
            Err(e) => {
                debug!(target = raw, error = %e, "skipping malformed target");
                return None;
            }
        };
        if !matches!(target.scheme(), "http" | "https") {
            return None;
        }
        let target_host = target.host_str()?;
        let page_host = self.page_url.host_str().unwrap_or_default();

        let pairs = if self.cross_domain && self.policy.allows(page_host, target_host) {
            self.params.pairs(&self.names)
        } else if self.tag_same_host && target_host.eq_ignore_ascii_case(page_host) {
            vec![(
                self.names.session_id.as_str(),
                self.params.session_id.as_str(),
            )]
        } else {
            return None;
        };
        if pairs.is_empty() {
            return None;
        }
        Some((target, pairs))
    }

    /// Returns `target` with the parameters set in its query, or `None` if
    /// it is left alone.
    pub fn decorate_url(&self, target: &str) -> Option<Url> {
        let (mut url, pairs) = self.plan(target)?;
        set_query_params(&mut url, &pairs);
        Some(url)
    }

    /// Rewrites a link's href in place. Returns whether it changed.
    pub fn decorate_link(&self, link: &mut dyn LinkElement) -> bool {
        let href = link.href();
        match self.decorate_url(&href) {
            Some(url) => {
                debug!(from = %href, to = %url, "decorated link");
                link.set_href(url.as_str());
                true
            }
            None => false,
        }
    }

    /// Adds the parameters to a submitted form. Returns whether it changed.
    ///
    /// GET forms get hidden fields (an existing field wins); other methods
    /// carry the parameters on the action URL.
    pub fn decorate_form(&self, form: &mut dyn FormElement) -> bool {
        let action = form.action();
        let Some((mut url, pairs)) = self.plan(&action) else {
            return false;
        };

        let method = form.method();
        if method.is_empty() || method.eq_ignore_ascii_case("get") {
            let mut added = false;
            for (name, value) in pairs {
                if !form.has_field(name) {
                    form.add_hidden_field(name, value);
                    added = true;
                }
            }
            if added {
                debug!(action = %action, "added hidden fields to form");
            }
            added
        } else {
            set_query_params(&mut url, &pairs);
            debug!(from = %action, to = %url, "decorated form action");
            form.set_action(url.as_str());
            true
        }
    }
}

/// Sets each pair in the query, replacing earlier values of the same name.
fn set_query_params(url: &mut Url, pairs: &[(&str, &str)]) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !pairs.iter().any(|(name, _)| k == *name))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .extend_pairs(pairs.iter().copied());
}
