//! The decision engine: one state machine step per processed tick.
//!
//! Each step reads the latest snapshot together with the tracker signals,
//! evaluates the rows for the current [`ActivityState`] top to bottom, and
//! returns a [`Decision`] holding at most one state change and at most one
//! command. Nothing is queued between ticks. When the throttle is closed the
//! step simply issues nothing and the next tick starts from scratch.
//!
//! The engine never reads a clock or performs I/O. The caller passes `now`
//! in the [`Observation`] and is responsible for sending the command and
//! marking the throttle.

use std::time::{Duration, Instant};

use tracing::debug;
use trawler_types::{
    ActivityState, Command, CommandKind, DepositAmount, KEY_ESCAPE, NearbyActor, NearbyObject,
    Tile, WorldSnapshot,
};

use crate::classify::{
    ActorKind, DEPOSIT_FALLBACK_OPTION, Direction, GATHER_FALLBACK_OPTION, ObjectKind,
    OptionMatch, classify_actor, classify_object, match_option, offers_traversal, prompt_choice,
};
use crate::condition::Condition;
use crate::config::{EngineConfig, SiteConfig};
use crate::inventory::InventoryView;
use crate::validator::{ConfigValidator, Validation};

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Everything the engine looks at for one step.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    /// The snapshot being processed.
    pub snapshot: &'a WorldSnapshot,
    /// The position changed since the previous processed tick.
    pub moving: bool,
    /// The cooldown throttle would accept a command now.
    pub throttle_open: bool,
    /// A resource or experience gain happened within the grace window.
    pub recent_progress: bool,
    /// Wall-clock time of this step.
    pub now: Instant,
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// State before the step.
    pub from: ActivityState,
    /// State after the step.
    pub to: ActivityState,
    /// Command to send, if any.
    pub command: Option<Command>,
    /// How the option in the command was chosen, for interactions.
    pub option: Option<OptionMatch>,
    /// Conditions observed during the step.
    pub conditions: Vec<Condition>,
    /// Human-readable activity label.
    pub activity: Option<String>,
}

impl Decision {
    /// Whether the step changed state.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Accumulates the side outputs of a step.
#[derive(Debug, Default)]
struct Plan {
    command: Option<Command>,
    option: Option<OptionMatch>,
    conditions: Vec<Condition>,
    activity: Option<String>,
}

impl Plan {
    fn issue(&mut self, kind: CommandKind, reason: impl Into<String>) {
        if self.command.is_none() {
            self.command = Some(Command::new(kind, reason));
        }
    }

    fn travel(&mut self, tile: Tile, reason: impl Into<String>) {
        self.issue(
            CommandKind::TravelTo {
                x: tile.x,
                z: tile.z,
            },
            reason,
        );
    }

    fn report(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    fn activity(&mut self, label: impl Into<String>) {
        self.activity = Some(label.into());
    }
}

// ---------------------------------------------------------------------------
// Target selection
// ---------------------------------------------------------------------------

/// A gather target chosen from the visible actors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatherTarget<'a> {
    /// The actor to interact with.
    pub actor: &'a NearbyActor,
    /// Which option to use on it.
    pub option: OptionMatch,
    /// Distance from the actor to the nearest anchor tile.
    pub anchor_distance: f64,
}

/// Choose the gather target to work.
///
/// Candidates are gather-spot actors. Anchored candidates (within the anchor
/// tile radius of an anchor tile) are preferred; in strict mode they are the
/// only ones allowed. Candidates are ordered by client-reported distance and
/// the first one offering the configured option wins. If none offers it, the
/// nearest candidate is returned with a fallback option.
pub fn select_gather_target<'a>(
    snapshot: &'a WorldSnapshot,
    site: &SiteConfig,
    config: &EngineConfig,
) -> Option<GatherTarget<'a>> {
    let anchors = site.anchor_tiles();
    let mut candidates: Vec<(&NearbyActor, f64)> = snapshot
        .nearby_actors
        .iter()
        .filter(|a| classify_actor(&a.name) == Some(ActorKind::GatherSpot))
        .map(|a| {
            let nearest = anchors
                .iter()
                .map(|t| t.distance_to(a.tile()))
                .fold(f64::INFINITY, f64::min);
            (a, nearest)
        })
        .collect();

    let radius = config.anchor_tile_radius;
    let any_anchored = candidates.iter().any(|&(_, d)| d <= radius);
    if config.strict_anchored_targets || any_anchored {
        candidates.retain(|&(_, d)| d <= radius);
    }
    candidates.sort_by_key(|&(a, _)| a.distance);

    let &(nearest, nearest_anchor_distance) = candidates.first()?;
    let matched = candidates.iter().find_map(|&(actor, anchor_distance)| {
        let option = match_option(&actor.options, &site.gather_option, GATHER_FALLBACK_OPTION);
        option.is_strict().then_some(GatherTarget {
            actor,
            option,
            anchor_distance,
        })
    });
    Some(matched.unwrap_or(GatherTarget {
        actor: nearest,
        option: OptionMatch::Fallback {
            index: GATHER_FALLBACK_OPTION,
        },
        anchor_distance: nearest_anchor_distance,
    }))
}

/// Nearest visible object of `kind` satisfying `accept`.
fn nearest_object<'a>(
    snapshot: &'a WorldSnapshot,
    kind: ObjectKind,
    accept: impl Fn(&NearbyObject) -> bool,
) -> Option<&'a NearbyObject> {
    snapshot
        .nearby_objects
        .iter()
        .filter(|o| classify_object(&o.name) == Some(kind) && accept(o))
        .min_by_key(|o| o.distance)
}

/// Nearest traversal primitive going in `direction`.
fn traversal_primitive(snapshot: &WorldSnapshot, direction: Direction) -> Option<&NearbyObject> {
    nearest_object(snapshot, ObjectKind::Traversal, |o| {
        offers_traversal(&o.options, direction)
    })
}

// ---------------------------------------------------------------------------
// DecisionEngine
// ---------------------------------------------------------------------------

/// The activity state machine.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    /// Engine tunables.
    config: EngineConfig,

    /// Runtime anchor checks.
    validator: ConfigValidator,

    /// Current state.
    state: ActivityState,

    /// When the last gather interaction was issued.
    last_interaction_at: Option<Instant>,
}

impl DecisionEngine {
    /// Create an engine in [`ActivityState::Idle`].
    pub fn new(config: EngineConfig) -> Self {
        Self::starting_in(config, ActivityState::Idle)
    }

    /// Create an engine in a specific state, e.g. to resume a run.
    pub fn starting_in(config: EngineConfig, state: ActivityState) -> Self {
        let validator = ConfigValidator::new(config.implausible_anchor_distance);
        Self {
            config,
            validator,
            state,
            last_interaction_at: None,
        }
    }

    /// Use `validator` for runtime anchor checks, keeping what it has
    /// already reported.
    #[must_use]
    pub fn with_validator(mut self, validator: ConfigValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Current state.
    pub const fn state(&self) -> ActivityState {
        self.state
    }

    /// Engine tunables.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one step.
    ///
    /// `site` is mutable because a live measurement can trigger the
    /// validator, which corrects anchors in place.
    pub fn step(&mut self, site: &mut SiteConfig, obs: &Observation<'_>) -> Decision {
        let from = self.state;
        let mut plan = Plan::default();
        let inventory = InventoryView::new(obs.snapshot, site, self.config.inventory_capacity);
        let level = obs.snapshot.vertical_level();

        let to = match from {
            ActivityState::Idle => self.idle(site, level, &inventory, &mut plan),
            ActivityState::TraverseLevels => {
                self.traverse_levels(site, level, obs, &inventory, &mut plan)
            }
            ActivityState::TravelToGather => {
                self.travel_to_gather(site, level, obs, &inventory, &mut plan)
            }
            _ if Self::must_descend(site, level, from) => ActivityState::TraverseLevels,
            ActivityState::Gathering => self.gathering(site, obs, &inventory, &mut plan),
            ActivityState::UnloadExcess => Self::unload_excess(obs, &inventory, &mut plan),
            ActivityState::TravelToDeposit => {
                self.travel_to_deposit(site, level, obs, &mut plan)
            }
            ActivityState::Depositing => self.depositing(site, obs, &inventory, &mut plan),
        };

        self.state = to;
        Decision {
            from,
            to,
            command: plan.command,
            option: plan.option,
            conditions: plan.conditions,
            activity: plan.activity,
        }
    }

    // -----------------------------------------------------------------------
    // Shared rules
    // -----------------------------------------------------------------------

    /// Above ground where the agent has no business being.
    ///
    /// Ground-only sites never want a higher level. Traversal sites want one
    /// only while heading to the deposit.
    fn must_descend(site: &SiteConfig, level: i32, state: ActivityState) -> bool {
        level > 0 && (!site.requires_vertical_traversal || state == ActivityState::TravelToGather)
    }

    /// Where a full inventory sends the agent, if anywhere.
    fn full_inventory_route(&self, inventory: &InventoryView<'_>) -> Option<ActivityState> {
        if !inventory.full {
            return None;
        }
        if self.config.drop_overflow_when_full && !inventory.overflow.is_empty() {
            return Some(ActivityState::UnloadExcess);
        }
        if !inventory.resources.is_empty() {
            return Some(ActivityState::TravelToDeposit);
        }
        None
    }

    fn tool_missing(site: &SiteConfig) -> Condition {
        Condition::ToolMissing {
            required: site.required_tools.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // States
    // -----------------------------------------------------------------------

    fn idle(
        &self,
        site: &SiteConfig,
        level: i32,
        inventory: &InventoryView<'_>,
        plan: &mut Plan,
    ) -> ActivityState {
        if !inventory.full && inventory.has_tool {
            return ActivityState::TravelToGather;
        }
        if let Some(next) = self.full_inventory_route(inventory) {
            return next;
        }
        if Self::must_descend(site, level, ActivityState::Idle) {
            return ActivityState::TraverseLevels;
        }
        if !inventory.has_tool {
            plan.report(Self::tool_missing(site));
            plan.activity("Missing gathering tool");
        }
        ActivityState::Idle
    }

    fn travel_to_gather(
        &mut self,
        site: &mut SiteConfig,
        level: i32,
        obs: &Observation<'_>,
        inventory: &InventoryView<'_>,
        plan: &mut Plan,
    ) -> ActivityState {
        if let Some(next) = self.full_inventory_route(inventory) {
            return next;
        }
        if Self::must_descend(site, level, ActivityState::TravelToGather) {
            return ActivityState::TraverseLevels;
        }

        let position = obs.snapshot.position();
        let mut distance = position.distance_to(site.gather_anchor);
        if distance > self.config.implausible_anchor_distance {
            if let Validation::Corrected(condition) = self.validator.revalidate(site, position) {
                plan.report(condition);
                distance = position.distance_to(site.gather_anchor);
            }
        }

        let target_near = select_gather_target(obs.snapshot, site, &self.config)
            .is_some_and(|t| f64::from(t.actor.distance) <= self.config.near_field_radius);
        if target_near || distance < self.config.near_field_radius {
            return ActivityState::Gathering;
        }

        if obs.throttle_open && !obs.moving {
            plan.travel(
                site.gather_anchor,
                format!("travel to gather anchor {} ({distance:.0} tiles)", site.gather_anchor),
            );
        }
        plan.activity(format!("Walking to {} ({distance:.0} tiles)", site.name));
        ActivityState::TravelToGather
    }

    fn gathering(
        &mut self,
        site: &SiteConfig,
        obs: &Observation<'_>,
        inventory: &InventoryView<'_>,
        plan: &mut Plan,
    ) -> ActivityState {
        let stay = ActivityState::Gathering;

        if !inventory.has_tool {
            plan.report(Self::tool_missing(site));
            plan.activity("Missing gathering tool");
            return stay;
        }
        if let Some(next) = self.full_inventory_route(inventory) {
            return next;
        }
        if self
            .config
            .is_gathering_animation(obs.snapshot.animation_code())
        {
            plan.activity(format!("Gathering at {}", site.name));
            return stay;
        }
        let settle = Duration::from_millis(self.config.interaction_settle_ms);
        let settling = self
            .last_interaction_at
            .is_some_and(|at| obs.now.saturating_duration_since(at) < settle);
        if settling || obs.recent_progress || !obs.throttle_open || obs.moving {
            return stay;
        }

        let position = obs.snapshot.position();
        match select_gather_target(obs.snapshot, site, &self.config) {
            Some(target) if target.actor.distance <= self.config.max_interact_distance => {
                let reason = if target.option.is_strict() {
                    format!("{} on {} #{}", site.gather_option, target.actor.name, target.actor.index)
                } else {
                    debug!(
                        actor = target.actor.index,
                        option = target.option.index(),
                        wanted = %site.gather_option,
                        "Configured option missing; using fallback option"
                    );
                    format!(
                        "fallback option {} on {} #{} (no '{}')",
                        target.option.index(),
                        target.actor.name,
                        target.actor.index,
                        site.gather_option
                    )
                };
                plan.issue(
                    CommandKind::InteractWithActor {
                        actor_index: target.actor.index,
                        option_index: target.option.index(),
                    },
                    reason,
                );
                plan.option = Some(target.option);
                plan.activity(if target.option.is_strict() {
                    "Interacting with gather target".to_owned()
                } else {
                    "Interacting with gather target (fallback option)".to_owned()
                });
                self.last_interaction_at = Some(obs.now);
            }
            Some(target) => {
                let (tile, _) = site.nearest_anchor_tile(position);
                plan.travel(
                    tile,
                    format!(
                        "gather target {} tiles away; stepping to anchor tile {tile}",
                        target.actor.distance
                    ),
                );
            }
            None if obs.snapshot.nearby_actors.is_empty() => {
                plan.report(Condition::VisibilityDegraded);
                plan.activity("Waiting for nearby actors");
            }
            None => {
                let (tile, distance) = site.nearest_anchor_tile(position);
                if distance > self.config.exact_tile_tolerance {
                    plan.travel(tile, format!("no anchored target; moving onto anchor tile {tile}"));
                } else {
                    plan.activity("Waiting for a gather target");
                }
            }
        }
        stay
    }

    fn unload_excess(
        obs: &Observation<'_>,
        inventory: &InventoryView<'_>,
        plan: &mut Plan,
    ) -> ActivityState {
        if !inventory.full {
            return ActivityState::TravelToGather;
        }
        let Some(item) = inventory.overflow.first() else {
            return if inventory.resources.is_empty() {
                ActivityState::TravelToGather
            } else {
                ActivityState::TravelToDeposit
            };
        };
        if obs.throttle_open && !obs.moving {
            plan.issue(
                CommandKind::Drop { slot: item.slot },
                format!("drop overflow {} from slot {}", item.name, item.slot),
            );
            plan.activity(format!("Dropping {}", item.name));
        }
        ActivityState::UnloadExcess
    }

    fn traverse_levels(
        &self,
        site: &SiteConfig,
        level: i32,
        obs: &Observation<'_>,
        inventory: &InventoryView<'_>,
        plan: &mut Plan,
    ) -> ActivityState {
        let stay = ActivityState::TraverseLevels;
        if level <= 0 {
            return self.idle(site, level, inventory, plan);
        }
        // The deposit is upstairs on traversal sites, so a full load stops
        // the descent. Elsewhere the agent comes down first.
        if site.requires_vertical_traversal {
            if let Some(next) = self.full_inventory_route(inventory) {
                return next;
            }
        }

        if let Some(dialog) = obs.snapshot.dialog.as_ref().filter(|d| d.open) {
            if let Some(kind) = prompt_choice(&dialog.options, Direction::Down) {
                if obs.throttle_open {
                    plan.issue(kind, "confirm descend prompt");
                }
                plan.activity("Descending");
                return stay;
            }
        }

        if !obs.throttle_open || obs.moving {
            return stay;
        }
        if let Some(primitive) = traversal_primitive(obs.snapshot, Direction::Down) {
            plan.issue(
                CommandKind::Descend,
                format!("descend via {} at {}", primitive.name, primitive.tile()),
            );
            plan.activity(format!("Descending from level {level}"));
        } else if let Some(anchor) = site.descend_anchor {
            plan.travel(anchor, format!("walk to known descend point {anchor}"));
            plan.activity("Looking for a way down");
        } else {
            debug!(level, "No way down visible and no descend anchor configured");
        }
        stay
    }

    fn travel_to_deposit(
        &self,
        site: &SiteConfig,
        level: i32,
        obs: &Observation<'_>,
        plan: &mut Plan,
    ) -> ActivityState {
        let stay = ActivityState::TravelToDeposit;
        let position = obs.snapshot.position();
        let distance = position.distance_to(site.deposit_anchor);
        let floor = site.deposit_floor();

        if obs.snapshot.container_open() || (level >= floor && distance < self.config.deposit_range)
        {
            return ActivityState::Depositing;
        }

        let climbing = level < floor && distance < self.config.ascent_radius;
        if climbing {
            if let Some(dialog) = obs.snapshot.dialog.as_ref().filter(|d| d.open) {
                if let Some(kind) = prompt_choice(&dialog.options, Direction::Up) {
                    if obs.throttle_open {
                        plan.issue(kind, "confirm ascend prompt");
                    }
                    plan.activity("Ascending");
                    return stay;
                }
            }
        }

        if !obs.throttle_open || obs.moving {
            plan.activity(format!("Walking to deposit ({distance:.0} tiles)"));
            return stay;
        }

        if climbing {
            if let Some(primitive) = traversal_primitive(obs.snapshot, Direction::Up) {
                plan.issue(
                    CommandKind::Ascend,
                    format!("ascend via {} at {}", primitive.name, primitive.tile()),
                );
                plan.activity(format!("Ascending from level {level}"));
                return stay;
            }
            if let Some(anchor) = site.ascend_anchor {
                if position.distance_to(anchor) > self.config.exact_tile_tolerance {
                    plan.travel(anchor, format!("walk to known ascend point {anchor}"));
                    plan.activity("Looking for a way up");
                    return stay;
                }
            }
        }

        plan.travel(
            site.deposit_anchor,
            format!("travel to deposit anchor {} ({distance:.0} tiles)", site.deposit_anchor),
        );
        plan.activity(format!("Walking to deposit ({distance:.0} tiles)"));
        stay
    }

    fn depositing(
        &self,
        site: &SiteConfig,
        obs: &Observation<'_>,
        inventory: &InventoryView<'_>,
        plan: &mut Plan,
    ) -> ActivityState {
        let stay = ActivityState::Depositing;
        let open = obs.snapshot.container_open();

        if !open && inventory.resources.is_empty() {
            return ActivityState::TravelToGather;
        }

        if open {
            if let Some(item) = inventory.resources.first() {
                if obs.throttle_open {
                    plan.issue(
                        CommandKind::Deposit {
                            slot: item.slot,
                            amount: DepositAmount::All,
                        },
                        format!("deposit {} x{} from slot {}", item.name, item.count, item.slot),
                    );
                    plan.activity(format!("Depositing {}", item.name));
                }
                return stay;
            }
            if !obs.throttle_open {
                return stay;
            }
            plan.issue(
                CommandKind::SendKey {
                    key_code: KEY_ESCAPE,
                },
                "close deposit container",
            );
            if !inventory.has_tool {
                plan.report(Self::tool_missing(site));
            }
            plan.activity("Deposit complete");
            return ActivityState::TravelToGather;
        }

        if !obs.throttle_open {
            return stay;
        }
        if let Some(fixture) = nearest_object(obs.snapshot, ObjectKind::DepositFixture, |_| true) {
            let option = match_option(&fixture.options, &site.deposit_option, DEPOSIT_FALLBACK_OPTION);
            plan.issue(
                CommandKind::InteractWithObject {
                    x: fixture.x,
                    z: fixture.z,
                    object_id: fixture.id,
                    option_index: option.index(),
                },
                format!("open {} with option {}", fixture.name, option.index()),
            );
            plan.option = Some(option);
            plan.activity(format!("Opening {}", fixture.name));
        } else if !obs.moving
            && obs.snapshot.position().distance_to(site.deposit_anchor)
                > self.config.exact_tile_tolerance
        {
            plan.travel(site.deposit_anchor, "deposit fixture not visible; approaching anchor");
            plan.activity("Looking for deposit fixture");
        } else {
            plan.activity("Looking for deposit fixture");
        }
        stay
    }
}
