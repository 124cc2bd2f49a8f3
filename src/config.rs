//! Configuration for document processing and question answering.
//!
//! All behaviour is controlled through [`LecternConfig`], built via its
//! [`LecternConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across calls and to diff two runs to understand
//! why their outputs differ. The LLM provider and the optional text
//! recognizer are injected here as trait objects, so tests substitute fakes
//! without touching any global state.

use crate::error::LecternError;
use crate::source::TextRecognizer;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default subject-matter vocabulary for the domain-term classifier rule.
///
/// The reference corpus this heuristic was tuned on is crystallography /
/// X-ray diffraction course material. The list is configurable via
/// [`LecternConfigBuilder::domain_terms`]; these entries are matched as
/// lowercase substrings.
pub const DEFAULT_DOMAIN_TERMS: &[&str] = &[
    "bragg",
    "diffraction",
    "crystallograph",
    "lattice",
    "reciprocal space",
    "ewald",
    "scattering",
    "miller indices",
    "unit cell",
    "wavelength",
    "interplanar",
    "x-ray",
];

/// Configuration for extraction, classification, harvesting, and asking.
///
/// Built via [`LecternConfig::builder()`] or [`LecternConfig::default()`].
///
/// # Example
/// ```rust
/// use lectern::LecternConfig;
///
/// let config = LecternConfig::builder()
///     .zoom(2.0)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct LecternConfig {
    /// Rasterization zoom factor (pixels per page point). Default: 2.0.
    ///
    /// 2x keeps formula crops sharp enough for a vision model to read while
    /// staying well under API upload limits. Page-image captures and formula
    /// crops both use this factor.
    pub zoom: f32,

    /// Padding added on each side of a formula line's bounding box before
    /// cropping, in page points. Default: 10.0. Clamped to the page box.
    pub formula_padding: f32,

    /// Upper bound on formula crops harvested from a single page. Default: 20.
    ///
    /// Bounds the per-page rasterization cost on pathological pages where
    /// nearly every line trips the classifier. Hitting the cap is logged.
    pub max_formula_regions_per_page: usize,

    /// Raster payloads attached for a single-page question. Default: 4.
    pub max_page_attachments: usize,

    /// Raster payloads sampled for a whole-document question. Default: 5.
    pub max_document_attachments: usize,

    /// Subject-matter terms for the domain-term classifier rule, matched as
    /// lowercase substrings. Default: [`DEFAULT_DOMAIN_TERMS`].
    pub domain_terms: Vec<String>,

    /// Directory where document records are persisted. Default: `"slides"`.
    pub storage_dir: PathBuf,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Best-effort text recognizer applied to embedded images. `None`
    /// disables recognition; assets are then emitted without `ocr_text`.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "gemini-2.0-flash".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for answers. Default: 0.2.
    ///
    /// Low temperature keeps the tutor grounded in the supplied context
    /// rather than improvising around it.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per answer. Default: 2048.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient LLM API failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for LecternConfig {
    fn default() -> Self {
        Self {
            zoom: 2.0,
            formula_padding: 10.0,
            max_formula_regions_per_page: 20,
            max_page_attachments: 4,
            max_document_attachments: 5,
            domain_terms: DEFAULT_DOMAIN_TERMS.iter().map(|s| s.to_string()).collect(),
            storage_dir: PathBuf::from("slides"),
            password: None,
            recognizer: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 2048,
            max_retries: 3,
            retry_backoff_ms: 500,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for LecternConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LecternConfig")
            .field("zoom", &self.zoom)
            .field("formula_padding", &self.formula_padding)
            .field(
                "max_formula_regions_per_page",
                &self.max_formula_regions_per_page,
            )
            .field("max_page_attachments", &self.max_page_attachments)
            .field("max_document_attachments", &self.max_document_attachments)
            .field("domain_terms", &self.domain_terms.len())
            .field("storage_dir", &self.storage_dir)
            .field("recognizer", &self.recognizer.as_ref().map(|_| "<dyn TextRecognizer>"))
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl LecternConfig {
    /// Create a new builder for `LecternConfig`.
    pub fn builder() -> LecternConfigBuilder {
        LecternConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`LecternConfig`].
#[derive(Debug)]
pub struct LecternConfigBuilder {
    config: LecternConfig,
}

impl LecternConfigBuilder {
    pub fn zoom(mut self, zoom: f32) -> Self {
        self.config.zoom = zoom;
        self
    }

    pub fn formula_padding(mut self, pad: f32) -> Self {
        self.config.formula_padding = pad.max(0.0);
        self
    }

    pub fn max_formula_regions_per_page(mut self, n: usize) -> Self {
        self.config.max_formula_regions_per_page = n.max(1);
        self
    }

    pub fn max_page_attachments(mut self, n: usize) -> Self {
        self.config.max_page_attachments = n;
        self
    }

    pub fn max_document_attachments(mut self, n: usize) -> Self {
        self.config.max_document_attachments = n;
        self
    }

    pub fn domain_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.domain_terms = terms.into_iter().map(|t| t.into().to_lowercase()).collect();
        self
    }

    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = dir.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn recognizer(mut self, r: Arc<dyn TextRecognizer>) -> Self {
        self.config.recognizer = Some(r);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<LecternConfig, LecternError> {
        let c = &self.config;
        if !(1.0..=4.0).contains(&c.zoom) {
            return Err(LecternError::InvalidConfig(format!(
                "zoom must be 1.0–4.0, got {}",
                c.zoom
            )));
        }
        if c.max_page_attachments == 0 || c.max_document_attachments == 0 {
            return Err(LecternError::InvalidConfig(
                "attachment caps must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
