//! Provider catalog
//!
//! The catalog is the table the resolver works from: every embed provider,
//! the URL templates it offers per content type, and whether it can serve a
//! request with only the numeric content id or needs the external id as well.
//!
//! A built-in catalog ships with the crate. Custom catalogs can be loaded
//! from JSON files with the same shape:
//!
//! ```json
//! {
//!   "default_provider": "vidsrc",
//!   "providers": [
//!     {
//!       "id": "vidsrc",
//!       "name": "VidSrc",
//!       "movie": {
//!         "availability": "always",
//!         "by_content_id": { "pattern": "https://vidsrc.to/embed/movie/{id}" }
//!       }
//!     }
//!   ]
//! }
//! ```

mod builtin;

use crate::content::ContentType;
use crate::template::{TemplateContext, UrlTemplate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur while loading or validating a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read the catalog file
    #[error("Failed to read catalog file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the catalog JSON
    #[error("Failed to parse catalog: {0}")]
    ParseFailed(#[from] serde_json::Error),

    /// The catalog lists no providers
    #[error("Catalog does not contain any providers")]
    Empty,

    /// Two entries share the same identifier
    #[error("Provider '{0}' is listed more than once")]
    DuplicateProvider(String),

    /// The default provider is not part of the catalog
    #[error("Default provider '{0}' is not in the catalog")]
    UnknownDefault(String),

    /// The default provider cannot serve every request on its own
    #[error(
        "Default provider '{provider}' needs a {content_type} template that works with only the numeric id"
    )]
    DefaultNotResolvable {
        provider: String,
        content_type: ContentType,
    },

    /// A template is inconsistent with its availability or malformed
    #[error("Invalid {content_type} template for provider '{provider}': {reason}")]
    InvalidTemplate {
        provider: String,
        content_type: ContentType,
        reason: String,
    },
}

/// Whether a provider needs the external id for a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Works with only the numeric content id
    Always,
    /// Only works when the external id is known
    RequiresExternalId,
}

/// Templates a provider offers for one content type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTemplates {
    /// Availability class of the provider for this content type
    pub availability: Availability,
    /// Template keyed by the external id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_external_id: Option<UrlTemplate>,
    /// Template keyed by the numeric content id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_content_id: Option<UrlTemplate>,
}

/// One embed provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Identifier used to select the provider
    pub id: String,
    /// Display name
    pub name: String,
    /// Movie templates, None if the provider has no movies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie: Option<TypeTemplates>,
    /// Series templates, None if the provider has no series
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<TypeTemplates>,
}

impl ProviderEntry {
    /// Templates for the given content type
    pub fn templates(&self, content_type: ContentType) -> Option<&TypeTemplates> {
        match content_type {
            ContentType::Movie => self.movie.as_ref(),
            ContentType::Series => self.series.as_ref(),
        }
    }
}

/// The provider table plus the default provider
///
/// Every way of building a catalog, deserialization included, validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCatalog")]
pub struct Catalog {
    default_provider: String,
    providers: Vec<ProviderEntry>,
}

/// Catalog JSON as written, before validation
#[derive(Deserialize)]
struct RawCatalog {
    default_provider: String,
    providers: Vec<ProviderEntry>,
}

impl TryFrom<RawCatalog> for Catalog {
    type Error = CatalogError;

    fn try_from(raw: RawCatalog) -> Result<Self, Self::Error> {
        Catalog::new(raw.providers, raw.default_provider)
    }
}

impl Catalog {
    /// Builds and validates a catalog
    pub fn new(
        providers: Vec<ProviderEntry>,
        default_provider: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            default_provider: default_provider.into(),
            providers,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog shipped with this crate
    pub fn builtin() -> &'static Catalog {
        static BUILTIN: OnceLock<Catalog> = OnceLock::new();
        BUILTIN.get_or_init(|| Catalog {
            default_provider: builtin::DEFAULT_PROVIDER.to_string(),
            providers: builtin::providers(),
        })
    }

    /// Parses and validates a catalog from JSON
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        Catalog::try_from(raw)
    }

    /// Loads a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|e| CatalogError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Returns a copy of this catalog with another default provider
    pub fn with_default(&self, provider: &str) -> Result<Self, CatalogError> {
        let catalog = Self {
            default_provider: provider.to_string(),
            providers: self.providers.clone(),
        };
        catalog.validate_default()?;
        Ok(catalog)
    }

    /// Looks up a provider by identifier
    pub fn get(&self, id: &str) -> Option<&ProviderEntry> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// The provider used when the requested one cannot serve a request
    ///
    /// Validated catalogs always contain their default provider; the built-in
    /// default stands in otherwise.
    pub fn default_provider(&self) -> &ProviderEntry {
        self.get(&self.default_provider)
            .unwrap_or_else(|| builtin::fallback_provider())
    }

    /// Renders the default provider's content id template
    ///
    /// Returns the identifier of the provider that produced the URL. Never
    /// returns an empty URL: if the default cannot render the request the
    /// built-in default provider is used.
    pub(crate) fn render_default(
        &self,
        content_type: ContentType,
        ctx: &TemplateContext<'_>,
    ) -> (&str, String) {
        let default = self.default_provider();
        let rendered = default
            .templates(content_type)
            .and_then(|t| t.by_content_id.as_ref())
            .and_then(|t| t.render(ctx));

        match rendered {
            Some(url) => (default.id.as_str(), url),
            None => {
                warn!(
                    provider = %default.id,
                    %content_type,
                    "default provider cannot render request, using built-in fallback"
                );
                (
                    builtin::DEFAULT_PROVIDER,
                    builtin::fallback_url(content_type, ctx),
                )
            }
        }
    }

    /// All providers in table order
    pub fn providers(&self) -> &[ProviderEntry] {
        &self.providers
    }

    /// Providers that work with only the numeric id for a content type
    pub fn always_available(&self, content_type: ContentType) -> Vec<&str> {
        self.ids_with(content_type, Availability::Always)
    }

    /// Providers that need the external id for a content type
    pub fn requires_external_id(&self, content_type: ContentType) -> Vec<&str> {
        self.ids_with(content_type, Availability::RequiresExternalId)
    }

    fn ids_with(&self, content_type: ContentType, availability: Availability) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| {
                p.templates(content_type)
                    .is_some_and(|t| t.availability == availability)
            })
            .map(|p| p.id.as_str())
            .collect()
    }

    /// Checks every catalog invariant
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.providers.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.id.as_str()) {
                return Err(CatalogError::DuplicateProvider(provider.id.clone()));
            }

            for content_type in ContentType::ALL {
                if let Some(templates) = provider.templates(content_type) {
                    validate_templates(&provider.id, content_type, templates)?;
                }
            }
        }

        self.validate_default()
    }

    /// The default provider must render every request from the numeric id alone
    fn validate_default(&self) -> Result<(), CatalogError> {
        let default = self
            .get(&self.default_provider)
            .ok_or_else(|| CatalogError::UnknownDefault(self.default_provider.clone()))?;

        for content_type in ContentType::ALL {
            let usable = default
                .templates(content_type)
                .and_then(|t| t.by_content_id.as_ref())
                .is_some_and(|t| !t.uses("external_id") && !t.uses("slug"));

            if !usable {
                return Err(CatalogError::DefaultNotResolvable {
                    provider: default.id.clone(),
                    content_type,
                });
            }
        }

        Ok(())
    }
}

fn validate_templates(
    provider: &str,
    content_type: ContentType,
    templates: &TypeTemplates,
) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidTemplate {
        provider: provider.to_string(),
        content_type,
        reason,
    };

    match templates.availability {
        Availability::Always => {
            if templates.by_content_id.is_none() {
                return Err(invalid(
                    "always available providers need a content id template".into(),
                ));
            }
        }
        Availability::RequiresExternalId => {
            if templates.by_external_id.is_none() {
                return Err(invalid("missing external id template".into()));
            }
        }
    }

    if let Some(template) = &templates.by_external_id {
        if !template.uses("external_id") {
            return Err(invalid(format!(
                "external id template does not use {{external_id}}: {}",
                template.pattern
            )));
        }
        check_template(template).map_err(invalid)?;
    }

    if let Some(template) = &templates.by_content_id {
        for needed in ["external_id", "slug"] {
            if template.uses(needed) {
                return Err(invalid(format!(
                    "content id template uses {{{}}}: {}",
                    needed, template.pattern
                )));
            }
        }
        check_template(template).map_err(invalid)?;
    }

    Ok(())
}

/// Renders a template with sample values and checks the result is a web URL
fn check_template(template: &UrlTemplate) -> Result<(), String> {
    let unknown = template.unknown_placeholders();
    if !unknown.is_empty() {
        return Err(format!("unknown placeholders {{{}}}", unknown.join("}, {")));
    }

    let sample = TemplateContext {
        content_id: 603,
        external_id: Some("tt0133093"),
        season: 1,
        episode: 1,
        title: Some("The Matrix"),
        language: "en",
        autoplay: true,
        ad_free: true,
    };

    let rendered = template
        .render(&sample)
        .ok_or_else(|| format!("cannot render {}", template.pattern))?;

    match url::Url::parse(&rendered) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(format!("unsupported scheme '{}' in {}", url.scheme(), rendered)),
        Err(e) => Err(format!("{} is not a valid URL: {}", rendered, e)),
    }
}
