//! Cookie domain detection.
//!
//! A script cannot ask the browser for the registrable domain, so it
//! probes: write a marker cookie at a candidate domain and read it back.
//! Public suffixes (`.co.uk`, `.com`) refuse the write, the registrable
//! domain accepts it.

use crate::{CookieJar, SetCookie};
use std::net::IpAddr;
use tracing::debug;

/// Name of the marker cookie used while probing.
pub const PROBE_COOKIE: &str = "_zt_probe";

/// Finds the broadest domain this page may scope cookies to.
///
/// Candidates start at the last two labels and grow one label at a time
/// towards the full hostname; the first that round-trips is returned with
/// a leading dot. `localhost`, IP literals and single-label hosts are
/// returned unchanged, as is any host where no candidate sticks.
pub fn detect_cookie_domain(jar: &dyn CookieJar, hostname: &str) -> String {
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    if !can_broaden(&hostname) {
        return hostname;
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    for start in (0..labels.len() - 1).rev() {
        let candidate = format!(".{}", labels[start..].join("."));
        jar.set(&SetCookie::new(PROBE_COOKIE, "1").domain(Some(&candidate)));
        if jar.get(PROBE_COOKIE).is_some() {
            jar.set(
                &SetCookie::new(PROBE_COOKIE, "")
                    .domain(Some(&candidate))
                    .max_age(0),
            );
            debug!(domain = %candidate, "detected cookie domain");
            return candidate;
        }
    }

    hostname
}

/// Whether a host can carry a broadened `domain=` attribute at all.
fn can_broaden(hostname: &str) -> bool {
    if hostname.is_empty() || hostname == "localhost" {
        return false;
    }
    let bare = hostname.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() || bare.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return false;
    }
    hostname.contains('.')
}
