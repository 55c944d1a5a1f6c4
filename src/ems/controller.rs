//! The energy management system driven once per timestep.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::trace;

use super::aggregate::aggregate;
use super::allocate::allocate_sequential;
use super::error::EmsError;
use super::port::{PriorityPort, Signal};
use super::registry::PortRegistry;
use super::setpoint::{SetpointOffsets, apply_setpoints};
use super::sorter::PriorityTable;
use super::state::{AllocationState, RoleLedger, SnapshotBuffer};
use super::tie_group::{TieScratch, allocate_with_ties};

/// How tiered devices negotiate for surplus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationStrategy {
    /// One pass in priority order; equal weights are served one after another.
    #[default]
    Sequential,
    /// Equal weights split the surplus and redistribute unused shares.
    TieGroup,
}

impl AllocationStrategy {
    pub const NAMES: &[&str] = &["sequential", "tie-group"];

    pub fn as_str(self) -> &'static str {
        match self {
            AllocationStrategy::Sequential => "sequential",
            AllocationStrategy::TieGroup => "tie-group",
        }
    }
}

impl FromStr for AllocationStrategy {
    type Err = EmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(AllocationStrategy::Sequential),
            "tie-group" => Ok(AllocationStrategy::TieGroup),
            other => Err(EmsError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime settings of the energy management system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EmsConfig {
    pub strategy: AllocationStrategy,
    pub offsets: SetpointOffsets,
    /// Peak-shaving limit (W). Carried for reporting; allocation ignores it.
    pub limit_to_shave_w: f64,
}

/// Everything the EMS decided in one timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Aggregates with `surplus_w` holding the final net grid exchange.
    pub state: AllocationState,
    /// Signed draw of each role from the running surplus.
    pub ledger: RoleLedger,
    /// Most rounds any tie group needed (1 for plain sequential steps).
    pub tie_rounds: usize,
    /// Whether a positive temperature offset was written.
    pub setpoints_raised: bool,
}

impl StepOutcome {
    /// Net grid exchange (positive = export, negative = import).
    pub fn grid_balance_w(&self) -> f64 {
        self.state.surplus_w
    }
}

/// Surplus electricity controller.
///
/// Generic over the port type so device models can be connected through any
/// [`PriorityPort`] implementation; [`Signal`] is the default.
#[derive(Debug)]
pub struct EnergyManager<P: PriorityPort = Signal> {
    config: EmsConfig,
    registry: PortRegistry<P>,
    table: Option<PriorityTable>,
    scratch: TieScratch,
    snapshots: SnapshotBuffer,
}

impl<P: PriorityPort> EnergyManager<P> {
    /// Creates a controller over an assembled registry.
    pub fn new(config: EmsConfig, registry: PortRegistry<P>) -> Self {
        Self {
            config,
            registry,
            table: None,
            scratch: TieScratch::default(),
            snapshots: SnapshotBuffer::default(),
        }
    }

    /// Builds the priority table ahead of the first step.
    ///
    /// Calling this is optional; [`step`](Self::step) builds the table on
    /// first use. It lets wiring errors surface before a run starts.
    ///
    /// # Errors
    ///
    /// Returns [`EmsError::Configuration`] for inconsistent wiring.
    pub fn prepare(&mut self) -> Result<(), EmsError> {
        if self.table.is_none() {
            let table = PriorityTable::build(&self.registry)?;
            self.scratch = TieScratch::with_capacity(table.largest_group());
            self.table = Some(table);
        }
        Ok(())
    }

    /// Runs aggregation, allocation, setpoint modification and output
    /// writing for one timestep.
    ///
    /// # Errors
    ///
    /// Returns [`EmsError::Configuration`] if the table cannot be built and
    /// [`EmsError::EmptyTieGroup`] if tie resolution divides by zero.
    pub fn step(&mut self, timestep: usize) -> Result<StepOutcome, EmsError> {
        self.prepare()?;
        // The table is immutable after the first build; take it out for the
        // duration of the step so the scratch slots can be borrowed mutably.
        let table = self.table.take().unwrap_or_default();
        let outcome = self.run_step(&table, timestep);
        self.table = Some(table);
        outcome
    }

    fn run_step(&mut self, table: &PriorityTable, timestep: usize) -> Result<StepOutcome, EmsError> {
        let registry = &self.registry;
        let outputs = registry.outputs();

        let district_feed_w = registry.district_feed().map_or(0.0, |p| p.read());
        outputs.district_feed_passthrough.write(district_feed_w);

        let mut state = aggregate(registry, table, district_feed_w);
        let mut ledger = RoleLedger::default();

        let (surplus_w, tie_rounds) = match self.config.strategy {
            AllocationStrategy::Sequential => {
                let s = allocate_sequential(registry, table.entries(), state.surplus_w, &mut ledger);
                (s, usize::from(!table.entries().is_empty()))
            }
            AllocationStrategy::TieGroup => allocate_with_ties(
                registry,
                table,
                state.surplus_w,
                &mut ledger,
                &mut self.scratch,
            )?,
        };
        state.surplus_w = surplus_w;

        let setpoints_raised =
            apply_setpoints(table.entries(), surplus_w, &self.config.offsets, outputs);

        outputs.grid_balance.write(surplus_w);
        outputs.total_consumption.write(state.total_consumption_w());
        self.snapshots.commit(state);

        trace!(
            timestep,
            production_w = state.production_w,
            uncontrolled_w = state.consumption_uncontrolled_w,
            ems_controlled_w = state.consumption_ems_controlled_w,
            grid_w = surplus_w,
            "ems step"
        );

        Ok(StepOutcome {
            state,
            ledger,
            tie_rounds,
            setpoints_raised,
        })
    }

    /// Saves the committed state before a step that may be replayed.
    pub fn save_state(&mut self) {
        self.snapshots.save();
    }

    /// Restores the state saved by [`save_state`](Self::save_state).
    pub fn restore_state(&mut self) {
        self.snapshots.restore();
        trace!("ems state restored");
    }

    /// Current committed aggregate state.
    pub fn state(&self) -> AllocationState {
        self.snapshots.current()
    }

    pub fn config(&self) -> &EmsConfig {
        &self.config
    }

    pub fn registry(&self) -> &PortRegistry<P> {
        &self.registry
    }

    /// Priority table, once built.
    pub fn table(&self) -> Option<&PriorityTable> {
        self.table.as_ref()
    }
}
