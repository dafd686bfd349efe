//! Configuration management for imagify.
//!
//! Every setting can be given on the command line or through an environment
//! variable with the `IMAGIFY_` prefix, and has a default matching the
//! plugin's stock behaviour.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use imagify::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! if let Command::Check(config) = cli.command {
//!     config.validate()?;
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `IMAGIFY_MAX_LENGTH` - Plain-text length that triggers conversion (default: 648)
//! - `IMAGIFY_MAX_LINE_COUNT` - Line count that triggers conversion (default: 20)
//! - `IMAGIFY_RULES_FILE` - JSON rule set; enables advanced mode
//! - `IMAGIFY_CACHE_ENABLED` - Cache rendered images (default: true)
//! - `IMAGIFY_CACHE_THRESHOLD` - Lookups before an image is kept in memory (default: 3)
//! - `IMAGIFY_CACHE_BACKEND` - `file`, `memory` or `sqlite` (default: file)
//! - `IMAGIFY_CACHE_DIR` - Directory of the file backend
//! - `IMAGIFY_CACHE_DB` - Database path of the sqlite backend
//! - `IMAGIFY_CACHE_STALE_SECS` - Idle time before a cache entry is swept (default: 7 days)
//! - `IMAGIFY_POOL_SIZE` - Number of render sessions (default: 5)
//! - `IMAGIFY_ACQUIRE_TIMEOUT_MS` - Wait for a free render session (default: 30000)
//! - `IMAGIFY_QUALITY` - Capture quality, 20-100 (default: 80)
//! - `IMAGIFY_STYLE_FILE` - Card stylesheet
//! - `IMAGIFY_TEMPLATE_FILE` - Page template
//! - `IMAGIFY_BACKGROUND` - Background image URL (http or https)
//! - `IMAGIFY_BLUR` - Background blur in pixels, 1-50 (default: 10)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use crate::cache::{RenderSalt, DEFAULT_FREQUENCY_THRESHOLD};
use crate::error::{ConfigError, StoreError};
use crate::hook::{Trigger, DEFAULT_MAX_LENGTH, DEFAULT_MAX_LINE_COUNT};
use crate::render::{PageTemplate, DEFAULT_POOL_SIZE, DEFAULT_STYLE};
use crate::rule::RuleSet;
use crate::store::{CacheStore, FileStore, MemoryStore, SqliteStore};

// =============================================================================
// Default Values
// =============================================================================

/// Default directory of the file cache backend.
pub const DEFAULT_CACHE_DIR: &str = "./data/imagify/cache";

/// Default database of the sqlite cache backend.
pub const DEFAULT_CACHE_DB: &str = "./data/imagify/cache.db";

/// Default idle time before a cache entry is swept (7 days).
pub const DEFAULT_CACHE_STALE_SECS: u64 = 7 * 24 * 60 * 60;

/// Default wait for a free render session, in milliseconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;

/// Default capture quality.
pub const DEFAULT_QUALITY: u8 = 80;

/// Default background blur in pixels.
pub const DEFAULT_BLUR: u32 = 10;

/// Allowed capture quality range.
pub const QUALITY_RANGE: std::ops::RangeInclusive<u8> = 20..=100;

/// Allowed background blur range.
pub const BLUR_RANGE: std::ops::RangeInclusive<u32> = 1..=50;

// =============================================================================
// CLI
// =============================================================================

/// imagify - Render long chat messages as images.
#[derive(Parser, Debug)]
#[command(name = "imagify")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the configuration and rule set.
    Check(ImagifyConfig),

    /// Print the markup for a JSON element list.
    Markup(MarkupArgs),

    /// Report whether a JSON message would be converted.
    Trigger(TriggerArgs),
}

/// Arguments of the `markup` command.
#[derive(Args, Debug, Clone)]
pub struct MarkupArgs {
    /// JSON file with an array of elements.
    #[arg(long)]
    pub input: PathBuf,

    /// Print the full page instead of the element markup.
    #[arg(long, default_value_t = false)]
    pub page: bool,

    /// Seed for random elements, for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub config: ImagifyConfig,
}

/// Arguments of the `trigger` command.
#[derive(Args, Debug, Clone)]
pub struct TriggerArgs {
    /// JSON file with a message (`session` and `elements`).
    #[arg(long)]
    pub input: PathBuf,

    /// Seed for random elements, for a reproducible cache key.
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub config: ImagifyConfig,
}

/// Where cached images are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CacheBackendKind {
    /// One file per image in a directory
    #[default]
    File,
    /// In-process only; lost on restart
    Memory,
    /// A single SQLite database
    Sqlite,
}

// =============================================================================
// Service Configuration
// =============================================================================

/// Settings of the imagify service.
#[derive(Args, Debug, Clone)]
pub struct ImagifyConfig {
    // =========================================================================
    // Trigger Configuration
    // =========================================================================
    /// Convert messages whose plain text is longer than this.
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH, env = "IMAGIFY_MAX_LENGTH")]
    pub max_length: usize,

    /// Convert messages with more lines than this.
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_COUNT, env = "IMAGIFY_MAX_LINE_COUNT")]
    pub max_line_count: usize,

    /// JSON rule set deciding which messages are converted.
    ///
    /// When set, the length and line thresholds are ignored.
    #[arg(long, env = "IMAGIFY_RULES_FILE")]
    pub rules_file: Option<PathBuf>,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Cache rendered images.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "IMAGIFY_CACHE_ENABLED")]
    pub cache_enabled: bool,

    /// Lookups after which an image is kept in memory.
    #[arg(long, default_value_t = DEFAULT_FREQUENCY_THRESHOLD, env = "IMAGIFY_CACHE_THRESHOLD")]
    pub cache_threshold: u64,

    /// Persistence backend for cached images.
    #[arg(long, value_enum, default_value_t = CacheBackendKind::File, env = "IMAGIFY_CACHE_BACKEND")]
    pub cache_backend: CacheBackendKind,

    /// Directory of the file backend.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "IMAGIFY_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Database path of the sqlite backend.
    #[arg(long, default_value = DEFAULT_CACHE_DB, env = "IMAGIFY_CACHE_DB")]
    pub cache_db: PathBuf,

    /// Seconds without a lookup after which a cache entry is swept.
    #[arg(long, default_value_t = DEFAULT_CACHE_STALE_SECS, env = "IMAGIFY_CACHE_STALE_SECS")]
    pub cache_stale_secs: u64,

    // =========================================================================
    // Render Configuration
    // =========================================================================
    /// Number of render sessions kept open.
    #[arg(long, default_value_t = DEFAULT_POOL_SIZE, env = "IMAGIFY_POOL_SIZE")]
    pub pool_size: usize,

    /// Milliseconds to wait for a free render session.
    #[arg(long, default_value_t = DEFAULT_ACQUIRE_TIMEOUT_MS, env = "IMAGIFY_ACQUIRE_TIMEOUT_MS")]
    pub acquire_timeout_ms: u64,

    /// Capture quality (20-100).
    #[arg(long, default_value_t = DEFAULT_QUALITY, env = "IMAGIFY_QUALITY")]
    pub quality: u8,

    // =========================================================================
    // Card Configuration
    // =========================================================================
    /// Stylesheet for the card. Uses the built-in style if not set.
    #[arg(long, env = "IMAGIFY_STYLE_FILE")]
    pub style_file: Option<PathBuf>,

    /// Page template. Uses the built-in page if not set.
    #[arg(long, env = "IMAGIFY_TEMPLATE_FILE")]
    pub template_file: Option<PathBuf>,

    /// Background image URL, starting with http:// or https://.
    #[arg(long, env = "IMAGIFY_BACKGROUND")]
    pub background: Option<String>,

    /// Background blur in pixels (1-50).
    #[arg(long, default_value_t = DEFAULT_BLUR, env = "IMAGIFY_BLUR")]
    pub blur: u32,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Default for ImagifyConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            max_line_count: DEFAULT_MAX_LINE_COUNT,
            rules_file: None,
            cache_enabled: true,
            cache_threshold: DEFAULT_FREQUENCY_THRESHOLD,
            cache_backend: CacheBackendKind::File,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cache_db: PathBuf::from(DEFAULT_CACHE_DB),
            cache_stale_secs: DEFAULT_CACHE_STALE_SECS,
            pool_size: DEFAULT_POOL_SIZE,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            quality: DEFAULT_QUALITY,
            style_file: None,
            template_file: None,
            background: None,
            blur: DEFAULT_BLUR,
            verbose: false,
        }
    }
}

impl ImagifyConfig {
    /// Check every setting that can be checked without touching the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &'static str, message: String| ConfigError::InvalidValue { name, message };

        if self.max_length == 0 {
            return Err(invalid("max_length", "must be greater than 0".to_string()));
        }
        if self.max_line_count == 0 {
            return Err(invalid("max_line_count", "must be greater than 0".to_string()));
        }
        if self.cache_threshold == 0 {
            return Err(invalid("cache_threshold", "must be greater than 0".to_string()));
        }
        if self.pool_size == 0 {
            return Err(invalid("pool_size", "must be greater than 0".to_string()));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(invalid("acquire_timeout_ms", "must be greater than 0".to_string()));
        }
        if !QUALITY_RANGE.contains(&self.quality) {
            return Err(invalid(
                "quality",
                format!(
                    "must be between {} and {}",
                    QUALITY_RANGE.start(),
                    QUALITY_RANGE.end()
                ),
            ));
        }
        if !BLUR_RANGE.contains(&self.blur) {
            return Err(invalid(
                "blur",
                format!("must be between {} and {}", BLUR_RANGE.start(), BLUR_RANGE.end()),
            ));
        }

        if let Some(ref background) = self.background {
            let url = Url::parse(background)
                .map_err(|e| invalid("background", format!("'{}': {}", background, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid(
                    "background",
                    format!("'{}' must start with http:// or https://", background),
                ));
            }
        }

        Ok(())
    }

    /// Load the rule set, if one is configured.
    pub fn load_rules(&self) -> Result<Option<RuleSet>, ConfigError> {
        self.rules_file
            .as_deref()
            .map(RuleSet::load)
            .transpose()
    }

    /// The conversion trigger: advanced when a rule set is configured,
    /// threshold otherwise.
    pub fn trigger(&self) -> Result<Trigger, ConfigError> {
        Ok(match self.load_rules()? {
            Some(rules) => Trigger::Advanced(rules),
            None => Trigger::Threshold {
                max_length: self.max_length,
                max_line_count: self.max_line_count,
            },
        })
    }

    /// The card stylesheet.
    pub fn load_style(&self) -> Result<String, ConfigError> {
        match self.style_file {
            Some(ref path) => read_file("style", path),
            None => Ok(DEFAULT_STYLE.to_string()),
        }
    }

    /// The page template.
    pub fn load_template(&self) -> Result<PageTemplate, ConfigError> {
        match self.template_file {
            Some(ref path) => read_file("template", path).map(PageTemplate::new),
            None => Ok(PageTemplate::default()),
        }
    }

    /// Every output-affecting setting, for cache key derivation.
    pub fn salt(&self) -> Result<RenderSalt, ConfigError> {
        let style = self.load_style()?;
        let template = self.load_template()?;
        Ok(self.render_salt(&style, &template))
    }

    pub(crate) fn render_salt(&self, style: &str, template: &PageTemplate) -> RenderSalt {
        RenderSalt {
            style: style.to_string(),
            background: self.background.clone(),
            blur: self.blur,
            max_length: self.max_length,
            max_line_count: self.max_line_count,
            template: template.source().to_string(),
            quality: self.quality,
        }
    }

    /// Open the configured cache store, or `None` when caching is disabled.
    pub fn build_store(&self) -> Result<Option<Arc<dyn CacheStore>>, StoreError> {
        if !self.cache_enabled {
            return Ok(None);
        }
        let store: Arc<dyn CacheStore> = match self.cache_backend {
            CacheBackendKind::File => Arc::new(FileStore::new(self.cache_dir.clone())),
            CacheBackendKind::Memory => Arc::new(MemoryStore::new()),
            CacheBackendKind::Sqlite => Arc::new(SqliteStore::open(&self.cache_db)?),
        };
        Ok(Some(store))
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn cache_stale_after(&self) -> Duration {
        Duration::from_secs(self.cache_stale_secs)
    }
}

fn read_file(what: &'static str, path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::File {
        what,
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
