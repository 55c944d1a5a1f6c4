//! Role-specific allocation rules and the sequential allocator.

use tracing::trace;

use super::port::{DeviceRole, PriorityPort};
use super::registry::PortRegistry;
use super::sorter::TierEntry;
use super::state::RoleLedger;

/// Result of offering `surplus_w` to one device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    /// Value written to the device's target output.
    pub output_w: f64,
    /// Running surplus after the device was served.
    pub surplus_w: f64,
    /// Signed power the device took from the running surplus.
    pub drawn_w: f64,
}

/// Applies the signed-arithmetic rule of `role`.
///
/// * Battery: offered the whole surplus as target, the used power is
///   subtracted (negative demand = discharge).
/// * Consumers: with surplus the remainder after their demand is written,
///   otherwise the full demand is written as grid draw `-demand_w`. The
///   demand is subtracted in both cases.
/// * CHP: production is added and the new surplus is written.
/// * Peer district controller: like a consumer with surplus; in deficit it
///   writes `-demand_w` and leaves the surplus untouched.
pub fn apply_role_rule(role: DeviceRole, surplus_w: f64, demand_w: f64) -> Allocation {
    let (output_w, remaining_w) = match role {
        DeviceRole::Battery => (surplus_w, surplus_w - demand_w),
        DeviceRole::Chp => {
            let s = surplus_w + demand_w;
            (s, s)
        }
        DeviceRole::PeerDistrictController => {
            if surplus_w > 0.0 {
                let s = surplus_w - demand_w;
                (s, s)
            } else {
                (-demand_w, surplus_w)
            }
        }
        role if role.is_consumer() => {
            if surplus_w > 0.0 {
                let s = surplus_w - demand_w;
                (s, s)
            } else {
                (-demand_w, surplus_w - demand_w)
            }
        }
        // Aggregate-only roles are never tiered; pass the surplus through.
        _ => (0.0, surplus_w),
    };

    Allocation {
        output_w,
        surplus_w: remaining_w,
        drawn_w: surplus_w - remaining_w,
    }
}

/// Reads one device, applies its rule and writes its target.
pub(crate) fn serve_device<P: PriorityPort>(
    registry: &PortRegistry<P>,
    entry: &TierEntry,
    surplus_w: f64,
    ledger: &mut RoleLedger,
) -> f64 {
    let demand_w = registry.input(entry.input).port.read();
    let a = apply_role_rule(entry.role, surplus_w, demand_w);
    registry.target(entry.output).port.write(a.output_w);
    ledger.record(entry.role, a.drawn_w);

    trace!(
        weight = entry.weight,
        role = %entry.role,
        demand_w,
        offered_w = surplus_w,
        output_w = a.output_w,
        surplus_w = a.surplus_w,
        "device served"
    );

    a.surplus_w
}

/// Walks `entries` once in order and returns the final surplus.
pub fn allocate_sequential<P: PriorityPort>(
    registry: &PortRegistry<P>,
    entries: &[TierEntry],
    surplus_w: f64,
    ledger: &mut RoleLedger,
) -> f64 {
    entries
        .iter()
        .fold(surplus_w, |s, entry| serve_device(registry, entry, s, ledger))
}
