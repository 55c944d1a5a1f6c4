//! Assembly-time port registry.
//!
//! Device models are wired to the EMS once, before the first timestep. The
//! registry only records which port belongs to which role, tag and tier; it
//! is turned into a [`PriorityTable`](super::sorter::PriorityTable) on the
//! first step.

use super::port::{DeviceRole, PortTag, PriorityPort, Signal, Tier};

/// A registered port with its tagging.
#[derive(Debug, Clone)]
pub struct PortSpec<P> {
    /// Label used in logs and error messages.
    pub name: String,
    pub role: DeviceRole,
    pub tag: PortTag,
    pub tier: Tier,
    pub port: P,
}

/// Fixed output signals of the EMS, independent of the device set.
#[derive(Debug, Clone, Default)]
pub struct EmsOutputs<P> {
    /// Net grid exchange (positive = export, negative = import).
    pub grid_balance: P,
    /// Uncontrolled plus ems-controlled consumption.
    pub total_consumption: P,
    /// Building indoor temperature offset (°C).
    pub building_indoor_temperature_offset: P,
    /// Space-heating water storage temperature offset (°C).
    pub space_heating_storage_temperature_offset: P,
    /// Domestic hot water storage temperature offset (°C).
    pub dhw_storage_temperature_offset: P,
    /// Pass-through of the district feed input.
    pub district_feed_passthrough: P,
}

/// Inputs and outputs connected to one EMS instance.
#[derive(Debug, Clone)]
pub struct PortRegistry<P = Signal> {
    inputs: Vec<PortSpec<P>>,
    targets: Vec<PortSpec<P>>,
    district_feed: Option<P>,
    outputs: EmsOutputs<P>,
}

impl<P: PriorityPort + Default> Default for PortRegistry<P> {
    fn default() -> Self {
        Self::new(EmsOutputs::default())
    }
}

impl<P: PriorityPort> PortRegistry<P> {
    /// Creates an empty registry publishing into `outputs`.
    pub fn new(outputs: EmsOutputs<P>) -> Self {
        Self {
            inputs: Vec::new(),
            targets: Vec::new(),
            district_feed: None,
            outputs,
        }
    }

    /// Registers an input port.
    pub fn add_input(
        &mut self,
        name: impl Into<String>,
        role: DeviceRole,
        tag: PortTag,
        tier: Tier,
        port: P,
    ) -> &mut Self {
        self.inputs.push(PortSpec {
            name: name.into(),
            role,
            tag,
            tier,
            port,
        });
        self
    }

    /// Registers an untiered production input.
    pub fn add_production(&mut self, name: impl Into<String>, role: DeviceRole, port: P) -> &mut Self {
        self.add_input(name, role, PortTag::Production, Tier::Untiered, port)
    }

    /// Registers an untiered uncontrolled-consumption input.
    pub fn add_uncontrolled(
        &mut self,
        name: impl Into<String>,
        role: DeviceRole,
        port: P,
    ) -> &mut Self {
        self.add_input(name, role, PortTag::ConsumptionUncontrolled, Tier::Untiered, port)
    }

    /// Registers a tiered device: its demand input and its target output.
    pub fn add_device(
        &mut self,
        name: impl Into<String>,
        role: DeviceRole,
        tier: Tier,
        demand: P,
        target: P,
    ) -> &mut Self {
        let name = name.into();
        self.add_input(
            name.clone(),
            role,
            PortTag::ConsumptionEmsControlled,
            tier,
            demand,
        );
        self.add_target(name, role, tier, target)
    }

    /// Registers an `ElectricityTarget` output.
    pub fn add_target(
        &mut self,
        name: impl Into<String>,
        role: DeviceRole,
        tier: Tier,
        port: P,
    ) -> &mut Self {
        self.targets.push(PortSpec {
            name: name.into(),
            role,
            tag: PortTag::ElectricityTarget,
            tier,
            port,
        });
        self
    }

    /// Connects the optional feed from an upstream district network.
    pub fn set_district_feed(&mut self, port: P) -> &mut Self {
        self.district_feed = Some(port);
        self
    }

    pub fn inputs(&self) -> &[PortSpec<P>] {
        &self.inputs
    }

    pub fn targets(&self) -> &[PortSpec<P>] {
        &self.targets
    }

    pub fn input(&self, index: usize) -> &PortSpec<P> {
        &self.inputs[index]
    }

    pub fn target(&self, index: usize) -> &PortSpec<P> {
        &self.targets[index]
    }

    pub fn district_feed(&self) -> Option<&P> {
        self.district_feed.as_ref()
    }

    pub fn outputs(&self) -> &EmsOutputs<P> {
        &self.outputs
    }
}
