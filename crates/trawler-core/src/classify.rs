//! Entity and item classification.
//!
//! Everything the engine recognizes by name goes through the pattern tables
//! here. Matching is case-insensitive substring matching against display
//! names, so classification can be tested without running the state machine.

use trawler_types::{CommandKind, DialogOption, KEY_DIGIT_ZERO};

use crate::config::SiteConfig;

// ---------------------------------------------------------------------------
// Pattern tables
// ---------------------------------------------------------------------------

/// What kind of actor a name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    /// A spot resources are gathered from.
    GatherSpot,
}

/// What kind of static object a name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A fixture that opens the deposit container.
    DepositFixture,
    /// Stairs or a ladder between vertical levels.
    Traversal,
}

const ACTOR_PATTERNS: &[(&str, ActorKind)] = &[("fishing spot", ActorKind::GatherSpot)];

const OBJECT_PATTERNS: &[(&str, ObjectKind)] = &[
    ("bank booth", ObjectKind::DepositFixture),
    ("bank chest", ObjectKind::DepositFixture),
    ("stair", ObjectKind::Traversal),
    ("ladder", ObjectKind::Traversal),
];

/// Prompt choices that take the avatar down a level.
pub const DESCEND_PROMPT_KEYWORDS: &[&str] = &["climb down", "go down", "descend"];

/// Prompt choices that take the avatar up a level.
pub const ASCEND_PROMPT_KEYWORDS: &[&str] = &["climb up", "go up", "ascend"];

/// Fallback option position for opening a deposit fixture.
pub const DEPOSIT_FALLBACK_OPTION: u32 = 2;

/// Fallback option position for working a gather target.
pub const GATHER_FALLBACK_OPTION: u32 = 1;

/// Classify an actor by display name.
pub fn classify_actor(name: &str) -> Option<ActorKind> {
    let name = name.to_lowercase();
    ACTOR_PATTERNS
        .iter()
        .find(|(pattern, _)| name.contains(pattern))
        .map(|&(_, kind)| kind)
}

/// Classify a static object by display name.
pub fn classify_object(name: &str) -> Option<ObjectKind> {
    let name = name.to_lowercase();
    OBJECT_PATTERNS
        .iter()
        .find(|(pattern, _)| name.contains(pattern))
        .map(|&(_, kind)| kind)
}

/// Whether `name` contains any of `keywords`, ignoring case.
pub fn matches_any<S: AsRef<str>>(name: &str, keywords: &[S]) -> bool {
    let name = name.to_lowercase();
    keywords
        .iter()
        .any(|k| name.contains(&k.as_ref().to_lowercase()))
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// How the active site regards an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemClass {
    /// A gathered resource that should be deposited.
    pub resource: bool,
    /// Low-value overflow that may be dropped when full.
    pub overflow: bool,
    /// A tool that enables gathering.
    pub tool: bool,
}

/// Classify an item name against the site's keyword lists.
pub fn classify_item(name: &str, site: &SiteConfig) -> ItemClass {
    ItemClass {
        resource: matches_any(name, &site.resource_items),
        overflow: matches_any(name, &site.overflow_items),
        tool: matches_any(name, &site.required_tools),
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Outcome of looking up a named option in a positional option list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMatch {
    /// The desired option was present at this 1-based position.
    Matched {
        /// 1-based option position.
        index: u32,
    },
    /// The desired option was absent; this position is a guess.
    Fallback {
        /// 1-based option position.
        index: u32,
    },
}

impl OptionMatch {
    /// The option position to send, matched or not.
    pub const fn index(self) -> u32 {
        match self {
            Self::Matched { index } | Self::Fallback { index } => index,
        }
    }

    /// Whether the position came from an actual match.
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Find `desired` in `options` (case-insensitive, exact text).
pub fn match_option<S: AsRef<str>>(options: &[S], desired: &str, fallback: u32) -> OptionMatch {
    options
        .iter()
        .position(|o| o.as_ref().trim().eq_ignore_ascii_case(desired))
        .and_then(|pos| u32::try_from(pos).ok())
        .map_or(OptionMatch::Fallback { index: fallback }, |pos| {
            OptionMatch::Matched {
                index: pos.saturating_add(1),
            }
        })
}

/// Direction of a level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward higher levels.
    Up,
    /// Toward ground level.
    Down,
}

impl Direction {
    const fn option_keyword(self) -> &'static str {
        match self {
            Self::Up => "climb-up",
            Self::Down => "climb-down",
        }
    }

    const fn prompt_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Up => ASCEND_PROMPT_KEYWORDS,
            Self::Down => DESCEND_PROMPT_KEYWORDS,
        }
    }
}

/// Whether an option list offers a level change in `direction`.
///
/// A bare `Climb` option counts for either direction; it opens a prompt.
pub fn offers_traversal<S: AsRef<str>>(options: &[S], direction: Direction) -> bool {
    let keyword = direction.option_keyword();
    options.iter().any(|o| {
        let o = o.as_ref().to_lowercase();
        o.contains(keyword) || o == "climb"
    })
}

// ---------------------------------------------------------------------------
// Prompt choices
// ---------------------------------------------------------------------------

/// Find the level-change choice in a prompt and turn it into a command.
///
/// The choice's 1-based position in the list is picked with its digit key
/// when it is 1 to 9. Otherwise the raw handle is used when the client
/// reports one, and the client's option index as a last resort.
pub fn prompt_choice(options: &[DialogOption], direction: Direction) -> Option<CommandKind> {
    let keywords = direction.prompt_keywords();
    let position = options
        .iter()
        .position(|o| matches_any(&o.text, keywords))?;
    let choice = options.get(position)?;

    let digit = position
        .checked_add(1)
        .and_then(|n| i32::try_from(n).ok())
        .filter(|n| (1..=9).contains(n));
    if let Some(digit) = digit {
        return Some(CommandKind::SendKey {
            key_code: KEY_DIGIT_ZERO.saturating_add(digit),
        });
    }
    Some(choice.handle.map_or(
        CommandKind::ChoosePromptOption {
            option_index: choice.index,
        },
        |handle| CommandKind::ChoosePromptHandle { handle },
    ))
}
