//! URL templates
//!
//! A template is a URL pattern with named placeholders plus the ordered list
//! of query parameters the provider understands. Templates are plain data so
//! a whole provider catalog can be written down as a table (or loaded from a
//! JSON file) instead of being spelled out as code.
//!
//! Supported placeholders:
//! - `{id}` - numeric content id from the metadata API
//! - `{external_id}` - IMDb style external id (percent-encoded)
//! - `{season}` / `{episode}` - series coordinates
//! - `{slug}` - URL-safe slug derived from the title
//! - `{lang}` - selected language code (percent-encoded)

use crate::slug::slugify;
use serde::{Deserialize, Serialize};

/// All placeholder names a pattern may use
pub const PLACEHOLDERS: &[&str] = &["id", "external_id", "season", "episode", "slug", "lang"];

/// How a query parameter obtains its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Appended only when autoplay is selected
    Autoplay,
    /// Appended only when ad suppression is selected
    AdFree,
    /// Carries the selected language code
    Language,
    /// Always appended with its fixed value
    Fixed,
}

/// A single query parameter supported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    /// Query key as the provider expects it
    pub key: String,
    /// Where the value comes from
    pub kind: ParamKind,
    /// Value for flag and fixed parameters (ignored for `Language`)
    #[serde(default)]
    pub value: String,
}

impl QueryParam {
    /// Parameter that is always present
    pub fn fixed(key: &str, value: &str) -> Self {
        Self::with_kind(ParamKind::Fixed, key, value)
    }

    /// Parameter present when autoplay is requested
    pub fn autoplay(key: &str, value: &str) -> Self {
        Self::with_kind(ParamKind::Autoplay, key, value)
    }

    /// Parameter present when ad suppression is requested
    pub fn ad_free(key: &str, value: &str) -> Self {
        Self::with_kind(ParamKind::AdFree, key, value)
    }

    /// Parameter carrying the language code
    pub fn language(key: &str) -> Self {
        Self::with_kind(ParamKind::Language, key, "")
    }

    fn with_kind(kind: ParamKind, key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            kind,
            value: value.to_string(),
        }
    }

    /// Renders `key=value`, or None if the selection does not ask for it
    fn render(&self, ctx: &TemplateContext<'_>) -> Option<String> {
        let value = match self.kind {
            ParamKind::Fixed => self.value.clone(),
            ParamKind::Autoplay if ctx.autoplay => self.value.clone(),
            ParamKind::AdFree if ctx.ad_free => self.value.clone(),
            ParamKind::Language if !ctx.language.trim().is_empty() => {
                urlencoding::encode(ctx.language.trim()).into_owned()
            }
            _ => return None,
        };

        Some(format!("{}={}", urlencoding::encode(&self.key), value))
    }
}

/// Values available to a template when rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateContext<'a> {
    pub content_id: u64,
    pub external_id: Option<&'a str>,
    pub season: u32,
    pub episode: u32,
    pub title: Option<&'a str>,
    pub language: &'a str,
    pub autoplay: bool,
    pub ad_free: bool,
}

/// A URL pattern plus the query parameters the provider supports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlTemplate {
    /// URL with `{placeholder}` segments
    pub pattern: String,
    /// Query parameters in the order they are appended
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<QueryParam>,
}

impl UrlTemplate {
    /// Creates a template without query parameters
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            params: Vec::new(),
        }
    }

    /// Adds a supported query parameter
    pub fn param(mut self, param: QueryParam) -> Self {
        self.params.push(param);
        self
    }

    /// Returns true if the pattern contains `{name}`
    pub fn uses(&self, name: &str) -> bool {
        placeholder_names(&self.pattern).any(|p| p == name)
    }

    /// Placeholders in the pattern that this module does not know
    pub fn unknown_placeholders(&self) -> Vec<String> {
        placeholder_names(&self.pattern)
            .filter(|name| !PLACEHOLDERS.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Returns true if every placeholder the pattern uses has a value
    pub fn can_render(&self, ctx: &TemplateContext<'_>) -> bool {
        if self.uses("external_id") && external_id(ctx).is_none() {
            return false;
        }
        if self.uses("slug") && slug(ctx).is_none() {
            return false;
        }
        true
    }

    /// Renders the template into a URL
    ///
    /// Returns None if the pattern needs an external id or a title that the
    /// context does not carry.
    pub fn render(&self, ctx: &TemplateContext<'_>) -> Option<String> {
        if !self.can_render(ctx) {
            return None;
        }

        let mut url = expand(&self.pattern, |name| match name {
            "id" => Some(ctx.content_id.to_string()),
            "external_id" => external_id(ctx).map(|id| urlencoding::encode(id).into_owned()),
            "season" => Some(ctx.season.to_string()),
            "episode" => Some(ctx.episode.to_string()),
            "slug" => slug(ctx),
            "lang" => Some(urlencoding::encode(ctx.language.trim()).into_owned()),
            _ => None,
        });

        let query: Vec<String> = self.params.iter().filter_map(|p| p.render(ctx)).collect();
        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query.join("&"));
        }

        Some(url)
    }
}

fn external_id<'a>(ctx: &TemplateContext<'a>) -> Option<&'a str> {
    ctx.external_id.map(str::trim).filter(|id| !id.is_empty())
}

fn slug(ctx: &TemplateContext<'_>) -> Option<String> {
    ctx.title.map(slugify).filter(|s| !s.is_empty())
}

/// Iterates over the `{name}` placeholders in a pattern
fn placeholder_names(pattern: &str) -> impl Iterator<Item = &str> {
    let mut rest = pattern;
    std::iter::from_fn(move || {
        let start = rest.find('{')?;
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        rest = &after[end + 1..];
        Some(&after[..end])
    })
}

/// Replaces every `{name}` in a single pass
///
/// Substituted values are never scanned again. Placeholders the lookup does
/// not resolve stay in the output untouched.
fn expand(pattern: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut rest = pattern;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
