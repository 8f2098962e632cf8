//! Cookie attribute model and `document.cookie` string handling.

use std::fmt;

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lax => "Lax",
            Self::Strict => "Strict",
            Self::None => "None",
        })
    }
}

/// A cookie write, as it would be assigned to `document.cookie`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    /// Lifetime in seconds. Zero or negative deletes the cookie.
    pub max_age: Option<i64>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub same_site: Option<SameSite>,
    pub secure: bool,
}

impl SetCookie {
    /// A bare `name=value` cookie with no attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            path: None,
            domain: None,
            same_site: None,
            secure: false,
        }
    }

    pub fn max_age(mut self, secs: i64) -> Self {
        self.max_age = Some(secs);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: Option<&str>) -> Self {
        self.domain = domain.filter(|d| !d.is_empty()).map(str::to_string);
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// True when this write removes the cookie.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.max_age.is_some_and(|age| age <= 0)
    }
}

impl fmt::Display for SetCookie {
    /// Renders the `document.cookie` assignment string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(age) = self.max_age {
            write!(f, "; max-age={age}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "; path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; domain={domain}")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={same_site}")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

/// Extracts one cookie's value from a `document.cookie` style header
/// (`a=1; b=2`). Empty values read as absent.
#[must_use]
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim_start)
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_end().to_string())
        .filter(|value| !value.is_empty())
}
