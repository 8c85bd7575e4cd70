//! Simulation orchestrator.
//!
//! A `Simulation` ties the configuration to a running automaton: it owns
//! the step controller (grid, rules, worker pool), the scheduler that paces
//! steps against host time, and the staging arenas holding packed uniforms
//! for a renderer. Configuration edits are queued and only take effect at
//! `restart`, which is the sole place the grid is reseeded or reallocated.

use tracing::{info, warn};

use crate::arena::{stage_offsets, Arena, Slot};
use crate::automaton::grid::{Dims, Grid, GridStore};
use crate::automaton::incremental::StepController;
use crate::automaton::region::{extract_region, import_region, Region};
use crate::automaton::scheduler::StepScheduler;
use crate::automaton::stepping::{RuleSet, RuleSlots, PACKED_CATEGORIES};
use crate::config::{ConfigChange, SimConfig};
use crate::error::Result;
use crate::rules::{COUNT_SLOTS, MAX_NEIGHBORS};

/// Born and survive flags for every packed category.
pub const RULE_ARENA_WORDS: usize = 2 * PACKED_CATEGORIES * COUNT_SLOTS;

/// Offsets of the largest main neighborhood plus edges and corners.
pub const OFFSET_ARENA_WORDS: usize = (MAX_NEIGHBORS as usize + 12 + 8) * 3;

/// Outcome of `Simulation::tick_budgeted`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepProgress {
    /// No step was due.
    Idle,
    /// A step is running and needs more ticks.
    InFlight,
    /// A step finished during this tick.
    Completed,
}

/// Packed rule flags and neighborhood offsets, ready for upload.
#[derive(Clone, Debug)]
struct Uniforms {
    rules: Arena<u32>,
    rule_slots: RuleSlots,
    offsets: Arena<i32>,
    offset_slots: Vec<Slot>,
}

impl Uniforms {
    fn stage(rules: &RuleSet) -> Result<Self> {
        let mut rule_arena = Arena::with_capacity(RULE_ARENA_WORDS);
        let rule_slots = rules.stage(&mut rule_arena)?;

        let mut offsets = Arena::with_capacity(OFFSET_ARENA_WORDS);
        let offset_slots = rules
            .categories()
            .iter()
            .map(|category| stage_offsets(category.kind.offsets(), &mut offsets))
            .collect::<Result<Vec<_>>>()?;

        Ok(Uniforms {
            rules: rule_arena,
            rule_slots,
            offsets,
            offset_slots,
        })
    }
}

pub struct Simulation {
    config: SimConfig,
    controller: StepController,
    scheduler: StepScheduler,
    uniforms: Uniforms,
    pending: Vec<ConfigChange>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let rules = config.compile_rules()?;
        let uniforms = Uniforms::stage(&rules)?;
        let scheduler = StepScheduler::new(config.step_duration_ms)?;

        let mut grid = GridStore::create(config.dims())?;
        grid.reset(&config.seed);
        let controller = StepController::new(grid, rules, config.threads)?;

        info!(
            grid_size = config.grid_size,
            neighborhood = %config.neighborhood,
            mixed = config.mixed,
            threads = controller.num_threads(),
            "simulation created"
        );

        Ok(Simulation {
            config,
            controller,
            scheduler,
            uniforms,
            pending: Vec::new(),
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::new(SimConfig::from_toml_str(text)?)
    }

    /// The configuration currently in effect. Queued changes are not included.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        self.controller.rules()
    }

    pub fn scheduler(&self) -> &StepScheduler {
        &self.scheduler
    }

    /// Feed host time and run a whole step if one is due. Returns whether a
    /// step completed.
    pub fn tick(&mut self, elapsed_ms: f64) -> bool {
        if !self.scheduler.tick(elapsed_ms) {
            return false;
        }
        self.controller.step_blocking();
        true
    }

    /// Like `tick`, but spreads each step over as many calls as needed,
    /// spending about `budget_us` microseconds per call.
    ///
    /// Time passed in while a step is in flight is not accumulated.
    pub fn tick_budgeted(&mut self, elapsed_ms: f64, budget_us: u64) -> StepProgress {
        if !self.controller.is_stepping() {
            if !self.scheduler.tick(elapsed_ms) {
                return StepProgress::Idle;
            }
            if let Err(err) = self.controller.begin_step() {
                warn!(%err, "could not begin step");
                return StepProgress::InFlight;
            }
        }

        if self.controller.tick(budget_us) {
            StepProgress::Completed
        } else {
            StepProgress::InFlight
        }
    }

    /// Run one step immediately, regardless of the scheduler.
    pub fn step(&mut self) {
        self.controller.step_blocking();
    }

    pub fn is_stepping(&self) -> bool {
        self.controller.is_stepping()
    }

    pub fn abandon_step(&mut self) -> bool {
        self.controller.abandon_step()
    }

    /// Takes effect on the next tick, without a restart.
    pub fn set_step_duration(&mut self, step_duration_ms: u32) -> Result<()> {
        self.scheduler.set_step_duration(step_duration_ms)?;
        self.config.step_duration_ms = step_duration_ms;
        Ok(())
    }

    /// Queue a change for the next `restart`. A queued change to the same
    /// setting is replaced, so the queue holds at most one entry per setting.
    pub fn queue_change(&mut self, change: ConfigChange) {
        match self.pending.iter_mut().find(|queued| queued.same_setting(&change)) {
            Some(queued) => *queued = change,
            None => self.pending.push(change),
        }
    }

    pub fn pending_changes(&self) -> &[ConfigChange] {
        &self.pending
    }

    /// Apply every queued change at once, then reseed.
    ///
    /// Any in-flight step is abandoned. If the changes don't validate, or a
    /// new grid can't be allocated, the queue is dropped and the simulation
    /// keeps running unchanged.
    pub fn restart(&mut self) -> Result<()> {
        let changes = std::mem::take(&mut self.pending);
        let next = self.config.with_changes(changes)?;

        let rules = next.compile_rules()?;
        let uniforms = Uniforms::stage(&rules)?;
        let scheduler = StepScheduler::new(next.step_duration_ms)?;

        let new_grid = if self.config.needs_new_grid(&next) {
            Some(GridStore::create(next.dims()).inspect_err(|err| {
                warn!(%err, grid_size = next.grid_size, "keeping the current grid");
            })?)
        } else {
            None
        };

        if next.threads != self.config.threads {
            let grid = match new_grid {
                Some(grid) => grid,
                None => GridStore::create(next.dims())?,
            };
            self.controller = StepController::new(grid, rules, next.threads)?;
        } else {
            self.controller.abandon_step();
            if let Some(grid) = new_grid {
                self.controller.replace_grid(grid);
            }
            self.controller.set_rules(rules)?;
        }
        self.controller.reset(&next.seed);

        self.scheduler = scheduler;
        self.uniforms = uniforms;
        self.config = next;

        info!(
            grid_size = self.config.grid_size,
            neighborhood = %self.config.neighborhood,
            mixed = self.config.mixed,
            "simulation restarted"
        );
        Ok(())
    }

    pub fn step_index(&self) -> u64 {
        self.controller.grid().step_index()
    }

    pub fn dims(&self) -> Dims {
        self.controller.grid().dims()
    }

    pub fn grid(&self) -> &GridStore {
        self.controller.grid()
    }

    /// The buffer a renderer should read.
    pub fn active(&self) -> &Grid {
        self.controller.grid().active()
    }

    pub fn active_words(&self) -> &[u32] {
        self.active().words()
    }

    pub fn live_count(&self) -> u64 {
        self.controller.grid().live_count()
    }

    pub fn get_cell(&self, x: i32, y: i32, z: i32) -> bool {
        self.active().get(x, y, z)
    }

    /// Refused while a step is in flight.
    pub fn set_cell(&mut self, x: i32, y: i32, z: i32, alive: bool) -> Result<()> {
        self.controller.set_cell(x, y, z, alive)
    }

    pub fn extract_region(&self, out: &mut [u8], region: Region) -> usize {
        extract_region(self.active(), out, region)
    }

    /// Write into the active buffer. Refused while a step is in flight.
    pub fn import_region(&mut self, input: &[u8], region: Region) -> Result<usize> {
        let grid = self.controller.grid_mut()?;
        Ok(import_region(grid.active_mut(), input, region))
    }

    /// Packed `(born, survive)` flags, `3 x 27` values each.
    pub fn rule_uniforms(&self) -> (&[u32], &[u32]) {
        let uniforms = &self.uniforms;
        (
            uniforms.rules.slice(uniforms.rule_slots.born),
            uniforms.rules.slice(uniforms.rule_slots.survive),
        )
    }

    /// Packed offset triples for each counted neighborhood, in rule order.
    pub fn offset_uniforms(&self) -> impl Iterator<Item = &[i32]> + '_ {
        self.uniforms
            .offset_slots
            .iter()
            .map(|&slot| self.uniforms.offsets.slice(slot))
    }
}
