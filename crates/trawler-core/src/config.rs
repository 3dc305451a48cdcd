//! Configuration loading and typed config structures for the trawler agent.
//!
//! The optional configuration file (`trawler-config.yaml` by default) holds
//! engine tunables and operating-site descriptors. Every field has a default,
//! so an empty or missing file yields the built-in behavior. Built-in site
//! presets are always available; a site of the same name in the file
//! replaces the preset.
//!
//! Environment variables are applied on top of the file through
//! [`TrawlerConfig::apply_env_overrides`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use trawler_types::Tile;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The selected site is neither a preset nor defined in the file.
    #[error("unknown site '{name}' (known: {known})")]
    UnknownSite {
        /// The requested site key.
        name: String,
        /// Comma-separated list of known site keys.
        known: String,
    },

    /// An override value could not be parsed.
    #[error("invalid value for {key}: {message}")]
    Invalid {
        /// The offending key.
        key: String,
        /// What was wrong with it.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level agent configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrawlerConfig {
    /// Key of the active site.
    #[serde(default = "default_site_key")]
    pub site: String,

    /// Engine tunables.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Site descriptors by key, merged over the built-in presets.
    #[serde(default)]
    pub sites: BTreeMap<String, SiteConfig>,
}

impl Default for TrawlerConfig {
    fn default() -> Self {
        Self {
            site: default_site_key(),
            engine: EngineConfig::default(),
            sites: builtin_sites(),
        }
    }
}

impl TrawlerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load the file if it exists, otherwise return the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config.with_builtin_sites())
    }

    /// Add every preset not already defined by the file.
    fn with_builtin_sites(mut self) -> Self {
        for (key, preset) in builtin_sites() {
            self.sites.entry(key).or_insert(preset);
        }
        self
    }

    /// Apply `BOT_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// `BOT_SITE` selects the site; everything else tunes [`EngineConfig`].
    /// Boolean switches are off only for `0`, `false`, or `off`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(site) = lookup("BOT_SITE") {
            self.site = site.trim().to_lowercase();
        }

        let engine = &mut self.engine;
        if let Some(v) = lookup("BOT_STUCK_TICKS") {
            engine.stuck_tick_threshold = parse_number("BOT_STUCK_TICKS", &v)?;
        }
        if let Some(v) = lookup("BOT_FISHING_RETRY_MS") {
            engine.interaction_settle_ms = parse_number("BOT_FISHING_RETRY_MS", &v)?;
        }
        if let Some(v) = lookup("BOT_MAX_FISH_SPOT_DISTANCE") {
            engine.max_interact_distance = parse_number("BOT_MAX_FISH_SPOT_DISTANCE", &v)?;
        }
        if let Some(v) = lookup("BOT_STRICT_SPOT_ONLY") {
            engine.strict_anchored_targets = parse_switch(&v);
        }
        if let Some(v) = lookup("BOT_FISH_TILE_RADIUS") {
            engine.anchor_tile_radius = parse_number("BOT_FISH_TILE_RADIUS", &v)?;
        }
        if let Some(v) = lookup("BOT_DROP_SHRIMP_WHEN_FULL") {
            engine.drop_overflow_when_full = parse_switch(&v);
        }
        if let Some(v) = lookup("BOT_COMMAND_COOLDOWN_MS") {
            engine.command_cooldown_ms = parse_number("BOT_COMMAND_COOLDOWN_MS", &v)?;
        }
        if let Some(v) = lookup("BOT_DEBUG") {
            engine.debug = parse_switch(&v);
        }
        if let Some(v) = lookup("BOT_DEBUG_SNAPSHOT_TICKS") {
            engine.debug_snapshot_every_ticks = parse_number("BOT_DEBUG_SNAPSHOT_TICKS", &v)?;
        }
        Ok(())
    }

    /// Resolve the active site descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSite`] if no site has the selected key.
    pub fn active_site(&self) -> Result<SiteConfig, ConfigError> {
        self.sites
            .get(&self.site)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownSite {
                name: self.site.clone(),
                known: self.sites.keys().cloned().collect::<Vec<_>>().join(", "),
            })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_owned(),
        message: format!("'{value}': {e}"),
    })
}

fn parse_switch(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off"
    )
}

// ---------------------------------------------------------------------------
// Engine tunables
// ---------------------------------------------------------------------------

/// Tunables for the decision engine, trackers, and liveness monitor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Minimum wall-clock spacing between commands.
    #[serde(default = "default_command_cooldown_ms")]
    pub command_cooldown_ms: u64,

    /// Ticks of unchanged state, position, and progress before the agent is
    /// considered stuck.
    #[serde(default = "default_stuck_tick_threshold")]
    pub stuck_tick_threshold: u32,

    /// How long to wait after a gather interaction before issuing another.
    #[serde(default = "default_interaction_settle_ms")]
    pub interaction_settle_ms: u64,

    /// How long a resource or experience gain keeps the agent waiting.
    #[serde(default = "default_progress_grace_ms")]
    pub progress_grace_ms: u64,

    /// Farthest client-reported distance at which a gather target is used.
    #[serde(default = "default_max_interact_distance")]
    pub max_interact_distance: i32,

    /// Radius around the gather anchor that counts as "arrived".
    #[serde(default = "default_near_field_radius")]
    pub near_field_radius: f64,

    /// Distance from an anchor tile at which a target counts as anchored.
    #[serde(default = "default_anchor_tile_radius")]
    pub anchor_tile_radius: f64,

    /// Distance from the nearest anchor tile that counts as standing on it.
    #[serde(default = "default_exact_tile_tolerance")]
    pub exact_tile_tolerance: f64,

    /// Only work targets near an anchor tile.
    #[serde(default = "default_true")]
    pub strict_anchored_targets: bool,

    /// Distance to the deposit anchor that counts as "in range".
    #[serde(default = "default_deposit_range")]
    pub deposit_range: f64,

    /// Distance to the deposit anchor within which the agent tries to ascend.
    #[serde(default = "default_ascent_radius")]
    pub ascent_radius: f64,

    /// Anchor distance beyond which a site layout is implausible.
    #[serde(default = "default_implausible_anchor_distance")]
    pub implausible_anchor_distance: f64,

    /// Drop overflow items instead of depositing them when full.
    #[serde(default = "default_true")]
    pub drop_overflow_when_full: bool,

    /// Number of inventory slots.
    #[serde(default = "default_inventory_capacity")]
    pub inventory_capacity: usize,

    /// Animation codes the client plays while gathering.
    #[serde(default = "default_gathering_animations")]
    pub gathering_animations: Vec<i32>,

    /// Emit periodic debug snapshot lines.
    #[serde(default = "default_true")]
    pub debug: bool,

    /// Processed ticks between debug snapshot lines.
    #[serde(default = "default_debug_snapshot_every_ticks")]
    pub debug_snapshot_every_ticks: u64,
}

impl EngineConfig {
    /// Whether the animation code means the avatar is gathering.
    pub fn is_gathering_animation(&self, code: i32) -> bool {
        self.gathering_animations.contains(&code)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_cooldown_ms: default_command_cooldown_ms(),
            stuck_tick_threshold: default_stuck_tick_threshold(),
            interaction_settle_ms: default_interaction_settle_ms(),
            progress_grace_ms: default_progress_grace_ms(),
            max_interact_distance: default_max_interact_distance(),
            near_field_radius: default_near_field_radius(),
            anchor_tile_radius: default_anchor_tile_radius(),
            exact_tile_tolerance: default_exact_tile_tolerance(),
            strict_anchored_targets: true,
            deposit_range: default_deposit_range(),
            ascent_radius: default_ascent_radius(),
            implausible_anchor_distance: default_implausible_anchor_distance(),
            drop_overflow_when_full: true,
            inventory_capacity: default_inventory_capacity(),
            gathering_animations: default_gathering_animations(),
            debug: true,
            debug_snapshot_every_ticks: default_debug_snapshot_every_ticks(),
        }
    }
}

// ---------------------------------------------------------------------------
// Site descriptors
// ---------------------------------------------------------------------------

/// Skill level range a site is suited for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LevelRange {
    /// Lowest suitable level.
    pub min: u32,
    /// Highest level before a better site should be used.
    pub max: u32,
}

impl LevelRange {
    /// Whether `level` is too low for the site.
    pub const fn is_below(self, level: u32) -> bool {
        level < self.min
    }

    /// Whether `level` has reached the top of the range, where a
    /// higher-tier site becomes worthwhile.
    pub const fn is_outgrown(self, level: u32) -> bool {
        level >= self.max
    }
}

/// A named operating site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteConfig {
    /// Display name.
    pub name: String,

    /// Skill whose level and experience are tracked.
    #[serde(default = "default_skill")]
    pub skill: String,

    /// Suitable skill level range.
    pub level_range: LevelRange,

    /// Option used on gather targets, e.g. `Net`.
    pub gather_option: String,

    /// Any one of these items enables gathering.
    pub required_tools: Vec<String>,

    /// Center of the gathering area.
    pub gather_anchor: Tile,

    /// Exact tiles to stand near; empty means the gather anchor itself.
    #[serde(default)]
    pub gather_anchor_alternatives: Vec<Tile>,

    /// Replacement gather anchor used when the configured one is implausible.
    #[serde(default)]
    pub known_good_gather_anchor: Option<Tile>,

    /// Deposit fixture location.
    pub deposit_anchor: Tile,

    /// Option used to open the deposit fixture.
    #[serde(default = "default_deposit_option")]
    pub deposit_option: String,

    /// Whether the deposit fixture is on a higher level.
    #[serde(default)]
    pub requires_vertical_traversal: bool,

    /// Vertical level of the deposit fixture on traversal sites.
    #[serde(default)]
    pub deposit_level: i32,

    /// Where to find the way up.
    #[serde(default)]
    pub ascend_anchor: Option<Tile>,

    /// Where to find the way down.
    #[serde(default)]
    pub descend_anchor: Option<Tile>,

    /// Item name keywords that count as gathered resources.
    #[serde(default = "default_resource_items")]
    pub resource_items: Vec<String>,

    /// Item name keywords that may be dropped when full.
    #[serde(default = "default_overflow_items")]
    pub overflow_items: Vec<String>,
}

impl SiteConfig {
    /// Tiles the agent may stand near while gathering.
    pub fn anchor_tiles(&self) -> Vec<Tile> {
        if self.gather_anchor_alternatives.is_empty() {
            vec![self.gather_anchor]
        } else {
            self.gather_anchor_alternatives.clone()
        }
    }

    /// Level the agent must reach before depositing.
    ///
    /// Ground level unless the site requires traversal, in which case at
    /// least the first level up.
    pub fn deposit_floor(&self) -> i32 {
        if self.requires_vertical_traversal {
            self.deposit_level.max(1)
        } else {
            0
        }
    }

    /// Nearest anchor tile to a position and its distance.
    pub fn nearest_anchor_tile(&self, position: Tile) -> (Tile, f64) {
        self.anchor_tiles()
            .into_iter()
            .map(|t| (t, t.distance_to(position)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((self.gather_anchor, self.gather_anchor.distance_to(position)))
    }
}

/// The built-in site presets.
pub fn builtin_sites() -> BTreeMap<String, SiteConfig> {
    let net_tools = vec!["small fishing net".to_owned(), "fishing net".to_owned()];
    let mut sites = BTreeMap::new();

    sites.insert(
        "lumbridge".to_owned(),
        SiteConfig {
            name: "Lumbridge Swamp".to_owned(),
            skill: default_skill(),
            level_range: LevelRange { min: 1, max: 20 },
            gather_option: "Net".to_owned(),
            required_tools: net_tools.clone(),
            gather_anchor: Tile::new(3245, 3155),
            gather_anchor_alternatives: vec![
                Tile::new(3245, 3155),
                Tile::new(3244, 3154),
                Tile::new(3246, 3156),
            ],
            known_good_gather_anchor: None,
            deposit_anchor: Tile::new(3208, 3220),
            deposit_option: default_deposit_option(),
            requires_vertical_traversal: true,
            deposit_level: 2,
            ascend_anchor: Some(Tile::new(3206, 3208)),
            descend_anchor: Some(Tile::new(3206, 3208)),
            resource_items: default_resource_items(),
            overflow_items: default_overflow_items(),
        },
    );

    sites.insert(
        "draynor".to_owned(),
        SiteConfig {
            name: "Draynor Village".to_owned(),
            skill: default_skill(),
            level_range: LevelRange { min: 1, max: 30 },
            gather_option: "Net".to_owned(),
            required_tools: net_tools,
            gather_anchor: Tile::new(3087, 3228),
            gather_anchor_alternatives: vec![
                Tile::new(3086, 3227),
                Tile::new(3086, 3228),
                Tile::new(3087, 3228),
            ],
            known_good_gather_anchor: Some(Tile::new(3087, 3228)),
            deposit_anchor: Tile::new(3092, 3243),
            deposit_option: default_deposit_option(),
            requires_vertical_traversal: false,
            deposit_level: 0,
            ascend_anchor: None,
            descend_anchor: None,
            resource_items: default_resource_items(),
            overflow_items: default_overflow_items(),
        },
    );

    sites.insert(
        "barbarian".to_owned(),
        SiteConfig {
            name: "Barbarian Village".to_owned(),
            skill: default_skill(),
            level_range: LevelRange { min: 20, max: 50 },
            gather_option: "Lure".to_owned(),
            required_tools: vec!["fly fishing rod".to_owned()],
            gather_anchor: Tile::new(3104, 3424),
            gather_anchor_alternatives: Vec::new(),
            known_good_gather_anchor: None,
            deposit_anchor: Tile::new(3092, 3243),
            deposit_option: default_deposit_option(),
            requires_vertical_traversal: false,
            deposit_level: 0,
            ascend_anchor: None,
            descend_anchor: None,
            resource_items: default_resource_items(),
            overflow_items: default_overflow_items(),
        },
    );

    sites
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_site_key() -> String {
    "lumbridge".to_owned()
}

fn default_skill() -> String {
    "Fishing".to_owned()
}

fn default_deposit_option() -> String {
    "Bank".to_owned()
}

fn default_resource_items() -> Vec<String> {
    [
        "raw shrimp",
        "raw anchovies",
        "raw sardine",
        "raw herring",
        "raw trout",
        "raw salmon",
        "raw pike",
        "raw cod",
        "raw mackerel",
        "raw bass",
        "raw tuna",
        "raw lobster",
        "raw swordfish",
        "raw monkfish",
        "raw shark",
        "raw karambwan",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

fn default_overflow_items() -> Vec<String> {
    vec!["raw shrimp".to_owned(), "shrimp".to_owned()]
}

const fn default_command_cooldown_ms() -> u64 {
    3000
}

const fn default_stuck_tick_threshold() -> u32 {
    25
}

const fn default_interaction_settle_ms() -> u64 {
    7000
}

const fn default_progress_grace_ms() -> u64 {
    7000
}

const fn default_max_interact_distance() -> i32 {
    2
}

const fn default_near_field_radius() -> f64 {
    15.0
}

const fn default_anchor_tile_radius() -> f64 {
    1.0
}

const fn default_exact_tile_tolerance() -> f64 {
    1.5
}

const fn default_deposit_range() -> f64 {
    5.0
}

const fn default_ascent_radius() -> f64 {
    20.0
}

const fn default_implausible_anchor_distance() -> f64 {
    120.0
}

const fn default_inventory_capacity() -> usize {
    28
}

fn default_gathering_animations() -> Vec<i32> {
    (618..=623).collect()
}

const fn default_debug_snapshot_every_ticks() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_presets() {
        let config = TrawlerConfig::default();
        assert_eq!(config.site, "lumbridge");
        assert_eq!(config.engine.command_cooldown_ms, 3000);
        assert_eq!(config.engine.stuck_tick_threshold, 25);
        assert_eq!(config.engine.inventory_capacity, 28);
        assert!(config.engine.is_gathering_animation(621));
        assert!(!config.engine.is_gathering_animation(-1));
        assert_eq!(config.sites.len(), 3);

        let site = config.active_site().unwrap();
        assert!(site.requires_vertical_traversal);
        assert_eq!(site.deposit_floor(), 2);
        assert_eq!(site.anchor_tiles().len(), 3);
    }

    #[test]
    fn level_range_edges() {
        let range = LevelRange { min: 1, max: 20 };
        assert!(range.is_below(0));
        assert!(!range.is_below(1));
        assert!(!range.is_outgrown(19));
        assert!(range.is_outgrown(20));
        assert!(range.is_outgrown(21));
    }

    #[test]
    fn parse_empty_yaml() {
        let config = TrawlerConfig::parse("").unwrap();
        assert_eq!(config, TrawlerConfig::default());
    }

    #[test]
    fn parse_partial_yaml_keeps_presets() {
        let yaml = r#"
site: harbor
engine:
  command_cooldown_ms: 1500
  strict_anchored_targets: false
sites:
  harbor:
    name: "Harbor"
    level_range: { min: 5, max: 40 }
    gather_option: "Cage"
    required_tools: ["lobster pot"]
    gather_anchor: { x: 100, z: 200 }
    deposit_anchor: { x: 110, z: 210 }
"#;
        let config = TrawlerConfig::parse(yaml).unwrap();
        assert_eq!(config.engine.command_cooldown_ms, 1500);
        assert!(!config.engine.strict_anchored_targets);
        // Untouched tunables keep their defaults.
        assert_eq!(config.engine.stuck_tick_threshold, 25);
        assert_eq!(config.sites.len(), 4);

        let site = config.active_site().unwrap();
        assert_eq!(site.name, "Harbor");
        assert_eq!(site.deposit_option, "Bank");
        assert_eq!(site.deposit_floor(), 0);
        assert_eq!(site.anchor_tiles(), vec![Tile::new(100, 200)]);
        assert!(!site.resource_items.is_empty());
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let result = TrawlerConfig::parse("engine: [not, a, map");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn unknown_site_lists_known_keys() {
        let config = TrawlerConfig {
            site: "atlantis".to_owned(),
            ..TrawlerConfig::default()
        };
        let err = config.active_site().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("atlantis"));
        assert!(text.contains("draynor"));
    }

    #[test]
    fn overrides_apply_from_lookup() {
        let mut config = TrawlerConfig::default();
        config
            .apply_overrides(|key| match key {
                "BOT_SITE" => Some("Draynor".to_owned()),
                "BOT_STUCK_TICKS" => Some("40".to_owned()),
                "BOT_STRICT_SPOT_ONLY" => Some("0".to_owned()),
                "BOT_DROP_SHRIMP_WHEN_FULL" => Some("yes".to_owned()),
                "BOT_FISH_TILE_RADIUS" => Some("2.5".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.site, "draynor");
        assert_eq!(config.engine.stuck_tick_threshold, 40);
        assert!(!config.engine.strict_anchored_targets);
        assert!(config.engine.drop_overflow_when_full);
        assert!((config.engine.anchor_tile_radius - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_override_is_an_error() {
        let mut config = TrawlerConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "BOT_COMMAND_COOLDOWN_MS").then(|| "soon".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::Invalid { ref key, .. }) if key == "BOT_COMMAND_COOLDOWN_MS"));
    }

    #[test]
    fn nearest_anchor_tile_picks_closest() {
        let site = builtin_sites().remove("draynor").unwrap();
        let (tile, distance) = site.nearest_anchor_tile(Tile::new(3086, 3226));
        assert_eq!(tile, Tile::new(3086, 3227));
        assert!((distance - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("trawler-config.yaml");
        if path.exists() {
            let config = TrawlerConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
