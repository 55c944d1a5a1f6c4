//! Priority sorter: turns the registry into the cached allocation order.

use tracing::debug;

use super::error::EmsError;
use super::port::{DeviceRole, PortTag, PriorityPort, Tier};
use super::registry::PortRegistry;

/// One tiered device in allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierEntry {
    pub weight: u32,
    pub role: DeviceRole,
    /// Index into [`PortRegistry::inputs`].
    pub input: usize,
    /// Index into [`PortRegistry::targets`].
    pub output: usize,
}

/// Contiguous run of entries sharing one weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieGroup {
    pub weight: u32,
    pub start: usize,
    pub len: usize,
}

/// Allocation order computed once and reused for the rest of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityTable {
    entries: Vec<TierEntry>,
    groups: Vec<TieGroup>,
    production: Vec<usize>,
    uncontrolled: Vec<usize>,
    ems_controlled: Vec<usize>,
}

impl PriorityTable {
    /// Sorts tiered inputs by ascending weight and pairs each with its target.
    ///
    /// Equal weights keep registration order.
    ///
    /// # Errors
    ///
    /// Returns [`EmsError::Configuration`] if a tiered input has no target of
    /// equal weight and role, has more than one, shares its target with
    /// another input, or is not tagged as ems-controlled consumption.
    pub fn build<P: PriorityPort>(registry: &PortRegistry<P>) -> Result<Self, EmsError> {
        let mut table = PriorityTable::default();
        let mut claimed = vec![false; registry.targets().len()];

        for (index, spec) in registry.inputs().iter().enumerate() {
            match spec.tag {
                PortTag::Production if spec.tier == Tier::Untiered => table.production.push(index),
                PortTag::ConsumptionUncontrolled if spec.tier == Tier::Untiered => {
                    table.uncontrolled.push(index)
                }
                PortTag::ConsumptionEmsControlled => table.ems_controlled.push(index),
                _ => {}
            }

            let Tier::Weighted(weight) = spec.tier else {
                continue;
            };
            let config_error = |reason: String| EmsError::Configuration {
                role: spec.role,
                weight,
                reason,
            };

            if spec.tag != PortTag::ConsumptionEmsControlled {
                return Err(config_error(format!(
                    "tiered input \"{}\" must be tagged ConsumptionEmsControlled, got {:?}",
                    spec.name, spec.tag
                )));
            }

            let matches: Vec<usize> = registry
                .targets()
                .iter()
                .enumerate()
                .filter(|(_, t)| t.tier == spec.tier && t.role == spec.role)
                .map(|(i, _)| i)
                .collect();

            let output = match matches.as_slice() {
                [single] => *single,
                [] => {
                    return Err(config_error(format!(
                        "input \"{}\" is not connected to an ElectricityTarget output",
                        spec.name
                    )));
                }
                many => {
                    return Err(config_error(format!(
                        "input \"{}\" matches {} ElectricityTarget outputs",
                        spec.name,
                        many.len()
                    )));
                }
            };

            if std::mem::replace(&mut claimed[output], true) {
                return Err(config_error(format!(
                    "input \"{}\" shares its ElectricityTarget output \"{}\" with another input",
                    spec.name,
                    registry.target(output).name
                )));
            }

            table.entries.push(TierEntry {
                weight,
                role: spec.role,
                input: index,
                output,
            });
        }

        table.entries.sort_by_key(|e| e.weight);
        table.groups = group_runs(&table.entries);

        debug!(
            devices = table.entries.len(),
            tie_groups = table.groups.iter().filter(|g| g.len > 1).count(),
            production = table.production.len(),
            uncontrolled = table.uncontrolled.len(),
            "priority table built"
        );
        for e in &table.entries {
            debug!(
                weight = e.weight,
                role = %e.role,
                input = %registry.input(e.input).name,
                "tier entry"
            );
        }

        Ok(table)
    }

    /// Tiered entries in allocation order.
    pub fn entries(&self) -> &[TierEntry] {
        &self.entries
    }

    /// Equal-weight runs over [`entries`](Self::entries), in order.
    pub fn groups(&self) -> &[TieGroup] {
        &self.groups
    }

    /// Entries belonging to `group`.
    pub fn members(&self, group: &TieGroup) -> &[TierEntry] {
        &self.entries[group.start..group.start + group.len]
    }

    /// Size of the largest tie group (1 when every weight is unique).
    pub fn largest_group(&self) -> usize {
        self.groups.iter().map(|g| g.len).max().unwrap_or(0)
    }

    pub fn production(&self) -> &[usize] {
        &self.production
    }

    pub fn uncontrolled(&self) -> &[usize] {
        &self.uncontrolled
    }

    pub fn ems_controlled(&self) -> &[usize] {
        &self.ems_controlled
    }
}

fn group_runs(entries: &[TierEntry]) -> Vec<TieGroup> {
    let mut groups: Vec<TieGroup> = Vec::new();
    for (i, e) in entries.iter().enumerate() {
        match groups.last_mut() {
            Some(g) if g.weight == e.weight => g.len += 1,
            _ => groups.push(TieGroup {
                weight: e.weight,
                start: i,
                len: 1,
            }),
        }
    }
    groups
}
