//! Per-timestep aggregate state and the rollback snapshot buffer.

use serde::Serialize;

use super::port::DeviceRole;

/// Aggregate snapshot of one timestep.
///
/// Sign convention for `surplus_w`: positive = available for use or export,
/// negative = deficit drawn from the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AllocationState {
    pub production_w: f64,
    pub consumption_uncontrolled_w: f64,
    pub consumption_ems_controlled_w: f64,
    pub surplus_w: f64,
}

impl AllocationState {
    /// Surplus before any tiered device was served.
    pub fn initial_surplus_w(&self) -> f64 {
        self.production_w - self.consumption_uncontrolled_w
    }

    /// Total consumption published by the output writer.
    pub fn total_consumption_w(&self) -> f64 {
        self.consumption_uncontrolled_w + self.consumption_ems_controlled_w
    }
}

/// Two-slot buffer backing the save/restore contract of the enclosing solver.
///
/// Slots are plain values; saving and restoring copy, they never alias.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SnapshotBuffer {
    current: AllocationState,
    previous: AllocationState,
}

impl SnapshotBuffer {
    pub fn current(&self) -> AllocationState {
        self.current
    }

    pub fn previous(&self) -> AllocationState {
        self.previous
    }

    /// Replaces the current slot after a step.
    pub fn commit(&mut self, state: AllocationState) {
        self.current = state;
    }

    /// Copies the current slot into the previous slot.
    pub fn save(&mut self) {
        self.previous = self.current;
    }

    /// Copies the previous slot back into the current slot.
    pub fn restore(&mut self) {
        self.current = self.previous;
    }
}

/// Signed power each role drew from the running surplus during one step.
///
/// Positive entries reduced the surplus (consumption, battery charging),
/// negative entries added to it (CHP production, battery discharge).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoleLedger([f64; DeviceRole::COUNT]);

impl RoleLedger {
    pub fn record(&mut self, role: DeviceRole, drawn_w: f64) {
        self.0[role.index()] += drawn_w;
    }

    pub fn get(&self, role: DeviceRole) -> f64 {
        self.0[role.index()]
    }

    /// Net draw over all roles.
    pub fn total_w(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Non-zero entries in role declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (DeviceRole, f64)> + '_ {
        DeviceRole::ALL
            .iter()
            .map(|&role| (role, self.get(role)))
            .filter(|(_, w)| *w != 0.0)
    }
}
