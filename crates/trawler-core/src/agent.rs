//! Per-run agent context.
//!
//! [`AgentContext`] owns every piece of mutable state a run has: the site
//! descriptor, the decision engine, the trackers, the throttle, the liveness
//! monitor, and the session statistics. The runner calls
//! [`AgentContext::process`] once per poll with the latest snapshot and
//! dispatches whatever command comes back. Nothing here performs I/O except
//! through the [`TelemetrySink`] capability.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use trawler_types::{ActivityState, Command, CommandKind, TelemetryMessage, WorldSnapshot};

use crate::condition::Condition;
use crate::config::{EngineConfig, SiteConfig};
use crate::engine::{DecisionEngine, Observation};
use crate::inventory::InventoryView;
use crate::liveness::{LivenessInput, LivenessMonitor, StuckEpisode};
use crate::motion::MotionTracker;
use crate::progress::ProgressTracker;
use crate::telemetry::TelemetrySink;
use crate::throttle::CooldownThrottle;
use crate::validator::{ConfigValidator, Validation};

/// What one call to [`AgentContext::process`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Tick of the snapshot.
    pub tick: u64,
    /// Whether the engine ran. False for duplicate ticks and when the
    /// avatar is not in the world.
    pub processed: bool,
    /// Engine state after the call.
    pub state: ActivityState,
    /// Command to dispatch. The throttle has already been marked.
    pub command: Option<Command>,
    /// A stagnation episode that began on this tick.
    pub stagnation: Option<StuckEpisode>,
}

/// Counters for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Sum of stack counts handed to deposit commands.
    pub resources_deposited: u64,
    /// Commands handed to the transport.
    pub commands_issued: u64,
    /// Experience in the tracked skill when first seen.
    pub start_experience: Option<u64>,
    /// Latest experience in the tracked skill.
    pub experience: u64,
    /// Latest level in the tracked skill.
    pub level: Option<u32>,
}

impl SessionStats {
    /// Experience gained since the run started.
    pub fn experience_gained(&self) -> u64 {
        self.start_experience
            .map_or(0, |start| self.experience.saturating_sub(start))
    }
}

/// The most recent command, kept for diagnostics.
#[derive(Debug, Clone)]
struct LastCommand {
    label: &'static str,
    reason: String,
    at: Instant,
}

/// One-shot flags for the level-range advisory.
#[derive(Debug, Clone, Copy, Default)]
struct LevelAdvisory {
    below_warned: bool,
    above_warned: bool,
}

/// Owns all per-run state and drives one engine step per new tick.
#[derive(Debug)]
pub struct AgentContext<T> {
    site: SiteConfig,
    engine: DecisionEngine,
    motion: MotionTracker,
    progress: ProgressTracker,
    throttle: CooldownThrottle,
    liveness: LivenessMonitor,
    telemetry: T,

    /// Tick of the last processed snapshot.
    last_tick: Option<u64>,

    /// Number of processed ticks.
    processed_ticks: u64,

    last_command: Option<LastCommand>,
    stats: SessionStats,
    advisory: LevelAdvisory,

    /// Conditions reported on the previous tick, to log only changes.
    last_conditions: Vec<Condition>,

    /// Last activity label forwarded, to forward only changes.
    last_activity: Option<String>,
}

impl<T: TelemetrySink> AgentContext<T> {
    /// Build a context for one run.
    ///
    /// The site is validated before anything else so that a stale gather
    /// anchor is corrected before the first decision.
    pub fn new(config: EngineConfig, mut site: SiteConfig, telemetry: T) -> Self {
        let mut validator = ConfigValidator::new(config.implausible_anchor_distance);
        let validation = validator.validate(&mut site);

        info!(
            site = %site.name,
            gather_anchor = %site.gather_anchor,
            anchor_tiles = site.anchor_tiles().len(),
            deposit_anchor = %site.deposit_anchor,
            vertical_traversal = site.requires_vertical_traversal,
            cooldown_ms = config.command_cooldown_ms,
            settle_ms = config.interaction_settle_ms,
            strict_targets = config.strict_anchored_targets,
            anchor_tile_radius = config.anchor_tile_radius,
            drop_overflow = config.drop_overflow_when_full,
            debug = config.debug,
            "Agent configured"
        );

        let mut context = Self {
            throttle: CooldownThrottle::new(Duration::from_millis(config.command_cooldown_ms)),
            liveness: LivenessMonitor::new(config.stuck_tick_threshold),
            engine: DecisionEngine::new(config).with_validator(validator),
            site,
            motion: MotionTracker::new(),
            progress: ProgressTracker::new(),
            telemetry,
            last_tick: None,
            processed_ticks: 0,
            last_command: None,
            stats: SessionStats::default(),
            advisory: LevelAdvisory::default(),
            last_conditions: Vec::new(),
            last_activity: None,
        };
        if let Validation::Corrected(condition) = validation {
            context.report_activity(condition.label());
        }
        context
    }

    /// Current engine state.
    pub const fn state(&self) -> ActivityState {
        self.engine.state()
    }

    /// The active site, including any runtime corrections.
    pub const fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Run statistics.
    pub const fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// The telemetry sink.
    pub const fn telemetry(&self) -> &T {
        &self.telemetry
    }

    /// Process the latest snapshot.
    ///
    /// Snapshots taken outside the world only update the activity label.
    /// Every in-world snapshot is forwarded to telemetry, but a tick that
    /// was already processed does not run the engine again.
    pub fn process(&mut self, snapshot: &WorldSnapshot, now: Instant) -> TickOutcome {
        let tick = snapshot.tick;
        let skipped = |state| TickOutcome {
            tick,
            processed: false,
            state,
            command: None,
            stagnation: None,
        };

        if !snapshot.in_world {
            let label = snapshot.game_state.map_or_else(
                || "Waiting (not in world)".to_owned(),
                |state| format!("Waiting ({state})"),
            );
            self.report_activity(label);
            return skipped(self.state());
        }

        self.emit(TelemetryMessage::state(snapshot));

        if self.last_tick == Some(tick) {
            debug!(tick, "Duplicate tick; skipping");
            return skipped(self.state());
        }
        self.last_tick = Some(tick);
        self.processed_ticks = self.processed_ticks.saturating_add(1);

        let moving = self.motion.update(snapshot.position());
        let experience = self.track_skill(snapshot);
        let config = self.engine.config();
        let resource_count =
            InventoryView::new(snapshot, &self.site, config.inventory_capacity).resource_count();
        if self.progress.update(tick, resource_count, experience, now) {
            debug!(tick, resource_count, experience, "Progress");
        }
        let recent_progress = self
            .progress
            .progressed_within(now, Duration::from_millis(config.progress_grace_ms));
        let throttle_open = self.throttle.can_send(now);
        let gathering_animation = config.is_gathering_animation(snapshot.animation_code());

        let decision = self.engine.step(
            &mut self.site,
            &Observation {
                snapshot,
                moving,
                throttle_open,
                recent_progress,
                now,
            },
        );

        let changed = decision.changed();
        if changed {
            info!(tick, from = %decision.from, to = %decision.to, "State transition");
        }
        self.log_conditions(tick, &decision.conditions);

        let command = decision.command.filter(|_| throttle_open);
        if let Some(command) = &command {
            self.record_command(tick, snapshot, command, now);
        }
        if let Some(activity) = decision.activity {
            self.report_activity(activity);
        } else if let Some(condition) = decision.conditions.first() {
            self.report_activity(condition.label());
        }

        let stagnation = self.liveness.observe(LivenessInput {
            tick,
            state_changed: changed,
            position_stable_ticks: self.motion.stationary_ticks(),
            ticks_since_progress: self.progress.ticks_since_progress(tick),
            gathering_animation,
            container_open: snapshot.container_open(),
        });
        if let Some(episode) = stagnation {
            self.report_stagnation(snapshot, episode, now);
        }

        self.debug_snapshot(snapshot, resource_count, moving, throttle_open, now);

        TickOutcome {
            tick,
            processed: true,
            state: decision.to,
            command,
            stagnation,
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// The single place telemetry leaves the context.
    fn emit(&self, message: TelemetryMessage) {
        self.telemetry.send(message);
    }

    fn report_activity(&mut self, label: impl Into<String>) {
        let label = label.into();
        if self.last_activity.as_ref() == Some(&label) {
            return;
        }
        self.emit(TelemetryMessage::activity(label.clone()));
        self.last_activity = Some(label);
    }

    /// Update skill statistics and return the tracked experience.
    fn track_skill(&mut self, snapshot: &WorldSnapshot) -> u64 {
        let Some(skill) = snapshot.skill(&self.site.skill) else {
            return self.stats.experience;
        };
        self.stats.start_experience.get_or_insert(skill.experience);
        self.stats.experience = skill.experience;
        if self.stats.level.is_some_and(|level| level < skill.level) {
            info!(skill = %skill.name, level = skill.level, "Level up");
        }
        self.stats.level = Some(skill.level);

        let range = self.site.level_range;
        if range.is_below(skill.level) && !self.advisory.below_warned {
            self.advisory.below_warned = true;
            warn!(
                site = %self.site.name,
                level = skill.level,
                min = range.min,
                "Skill level below the site's range"
            );
        }
        if range.is_outgrown(skill.level) && !self.advisory.above_warned {
            self.advisory.above_warned = true;
            info!(
                site = %self.site.name,
                level = skill.level,
                max = range.max,
                "Skill level at the top of the site's range; consider a higher-tier site"
            );
        }
        skill.experience
    }

    fn log_conditions(&mut self, tick: u64, conditions: &[Condition]) {
        for condition in conditions {
            if !self.last_conditions.contains(condition) {
                warn!(tick, state = %self.state(), %condition, "Condition");
            }
        }
        conditions.clone_into(&mut self.last_conditions);
    }

    fn record_command(
        &mut self,
        tick: u64,
        snapshot: &WorldSnapshot,
        command: &Command,
        now: Instant,
    ) {
        self.throttle.mark_sent(now);
        self.stats.commands_issued = self.stats.commands_issued.saturating_add(1);
        if let CommandKind::Deposit { slot, .. } = command.kind {
            let count = snapshot.item_in_slot(slot).map_or(0, |i| u64::from(i.count));
            self.stats.resources_deposited = self.stats.resources_deposited.saturating_add(count);
        }
        info!(
            tick,
            state = %self.state(),
            command = command.kind.label(),
            reason = %command.reason,
            "Command issued"
        );
        self.last_command = Some(LastCommand {
            label: command.kind.label(),
            reason: command.reason.clone(),
            at: now,
        });
    }

    fn report_stagnation(&mut self, snapshot: &WorldSnapshot, episode: StuckEpisode, now: Instant) {
        let condition = Condition::StagnationDetected {
            state: self.state(),
            position: snapshot.position(),
            ticks: episode.stable_state_ticks,
        };
        let (last_command, last_reason, last_command_age_ms) =
            self.last_command.as_ref().map_or(("none", "", None), |c| {
                let age = now.saturating_duration_since(c.at).as_millis();
                (c.label, c.reason.as_str(), Some(age))
            });
        warn!(
            tick = episode.tick,
            state = %self.state(),
            position = %snapshot.position(),
            level = snapshot.vertical_level(),
            stable_state_ticks = episode.stable_state_ticks,
            position_stable_ticks = episode.position_stable_ticks,
            ticks_since_progress = episode.ticks_since_progress,
            cooldown_remaining_ms = self.throttle.remaining(now).as_millis(),
            last_command,
            last_reason,
            last_command_age_ms = ?last_command_age_ms,
            "{condition}"
        );
        // Every episode is forwarded, even when the label repeats.
        let label = format!("Stuck in {}", self.state());
        self.emit(TelemetryMessage::activity(label.clone()));
        self.last_activity = Some(label);
    }

    fn debug_snapshot(
        &self,
        snapshot: &WorldSnapshot,
        resource_count: u64,
        moving: bool,
        throttle_open: bool,
        now: Instant,
    ) {
        let config = self.engine.config();
        let due = self
            .processed_ticks
            .checked_rem(config.debug_snapshot_every_ticks)
            .is_some_and(|r| r == 0);
        if !config.debug || !due {
            return;
        }
        info!(
            tick = snapshot.tick,
            state = %self.state(),
            position = %snapshot.position(),
            level = snapshot.vertical_level(),
            moving,
            animation = snapshot.animation_code(),
            inventory = snapshot.occupied_slots(),
            resources = resource_count,
            container_open = snapshot.container_open(),
            dialog_open = snapshot.dialog_open(),
            cooldown_remaining_ms = self.throttle.remaining(now).as_millis(),
            actionable = throttle_open && !moving,
            last_command = self.last_command.as_ref().map_or("none", |c| c.label),
            deposited = self.stats.resources_deposited,
            commands = self.stats.commands_issued,
            experience_gained = self.stats.experience_gained(),
            skill_level = ?self.stats.level,
            "Debug snapshot"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use trawler_types::{InventoryItem, PlayerState, SkillState, Tile};

    use super::*;
    use crate::config::builtin_sites;
    use crate::telemetry::RecordingTelemetry;

    fn draynor() -> SiteConfig {
        builtin_sites().remove("draynor").unwrap()
    }

    fn snapshot(tick: u64, experience: u64) -> WorldSnapshot {
        WorldSnapshot {
            tick,
            in_world: true,
            player: Some(PlayerState {
                name: None,
                world_x: 3092,
                world_z: 3243,
                level: Some(0),
                animation: -1,
            }),
            skills: vec![SkillState {
                name: "Fishing".to_owned(),
                level: 10,
                base_level: 10,
                experience,
            }],
            inventory: vec![InventoryItem {
                slot: 0,
                id: 303,
                name: "Small fishing net".to_owned(),
                count: 1,
            }],
            ..WorldSnapshot::default()
        }
    }

    fn context() -> AgentContext<RecordingTelemetry> {
        AgentContext::new(EngineConfig::default(), draynor(), RecordingTelemetry::new())
    }

    #[test]
    fn not_in_world_only_reports_waiting() {
        let mut ctx = context();
        let offline = WorldSnapshot {
            game_state: Some(10),
            ..WorldSnapshot::default()
        };
        let outcome = ctx.process(&offline, Instant::now());
        assert!(!outcome.processed);
        assert_eq!(
            ctx.telemetry().activities(),
            vec!["Waiting (10)".to_owned()]
        );
    }

    #[test]
    fn duplicate_tick_is_forwarded_but_not_processed() {
        let mut ctx = context();
        let now = Instant::now();
        let first = ctx.process(&snapshot(5, 0), now);
        assert!(first.processed);
        assert_eq!(first.state, ActivityState::TravelToGather);

        let again = ctx.process(&snapshot(5, 0), now);
        assert!(!again.processed);
        let states = ctx
            .telemetry()
            .drain()
            .into_iter()
            .filter(|m| matches!(m, TelemetryMessage::State { .. }))
            .count();
        assert_eq!(states, 2);
    }

    #[test]
    fn command_marks_throttle() {
        let mut ctx = context();
        let start = Instant::now();
        // Idle -> TravelToGather, then a walk on the next tick.
        ctx.process(&snapshot(1, 0), start);
        let walk = ctx.process(&snapshot(2, 0), start);
        assert!(matches!(
            walk.command.map(|c| c.kind),
            Some(CommandKind::TravelTo { .. })
        ));
        assert_eq!(ctx.stats().commands_issued, 1);

        let blocked = ctx.process(&snapshot(3, 0), start + Duration::from_millis(600));
        assert!(blocked.command.is_none());

        let open = ctx.process(&snapshot(4, 0), start + Duration::from_millis(3000));
        assert!(open.command.is_some());
    }

    #[test]
    fn experience_is_tracked() {
        let mut ctx = context();
        let now = Instant::now();
        ctx.process(&snapshot(1, 1000), now);
        ctx.process(&snapshot(2, 1040), now);
        assert_eq!(ctx.stats().experience_gained(), 40);
        assert_eq!(ctx.stats().level, Some(10));
    }

    #[test]
    fn startup_corrects_stale_anchor() {
        let mut site = draynor();
        site.gather_anchor = Tile::new(3245, 3155);
        let ctx = AgentContext::new(EngineConfig::default(), site, RecordingTelemetry::new());
        assert_eq!(ctx.site().gather_anchor, Tile::new(3087, 3228));
        assert_eq!(
            ctx.telemetry().activities(),
            vec!["Corrected site config".to_owned()]
        );
    }

    #[test]
    fn every_stuck_episode_is_forwarded() {
        let mut ctx = context();
        let start = Instant::now();
        let idle_at = |tick: u64, x: i32| WorldSnapshot {
            inventory: Vec::new(),
            player: Some(PlayerState {
                name: None,
                world_x: x,
                world_z: 3243,
                level: Some(0),
                animation: -1,
            }),
            ..snapshot(tick, 0)
        };

        let episodes = (1..=80)
            .filter(|&tick| {
                // One step sideways ends the first episode.
                let x = if tick < 40 { 3092 } else { 3093 };
                ctx.process(&idle_at(tick, x), start).stagnation.is_some()
            })
            .count();
        assert_eq!(episodes, 2);

        let stuck_labels = ctx
            .telemetry()
            .activities()
            .into_iter()
            .filter(|a| a == "Stuck in IDLE")
            .count();
        assert_eq!(stuck_labels, 2);
    }

    #[test]
    fn activity_labels_are_forwarded_on_change() {
        let mut ctx = context();
        let now = Instant::now();
        for tick in 1..=4 {
            ctx.process(&snapshot(tick, 0), now);
        }
        let activities = ctx.telemetry().activities();
        let mut deduped = activities.clone();
        deduped.dedup();
        assert_eq!(activities, deduped);
    }
}
