//! Tie-group allocator for devices that share one priority weight.
//!
//! A group first splits the running surplus into equal shares. Members that
//! needed less than their share leave a positive remainder; consumers that
//! needed more are left with unmet need. Further rounds hand the pooled
//! remainder to the unmet members, again in equal shares over the shrinking
//! set of unmet members, until the pool is empty, nobody is unmet, or the
//! round bound is reached. The group's contribution to the running surplus is
//! the sum of member remainders, which redistribution never changes.

use tracing::{debug, warn};

use super::allocate::{apply_role_rule, serve_device};
use super::error::EmsError;
use super::port::{DeviceRole, PriorityPort};
use super::registry::PortRegistry;
use super::sorter::{PriorityTable, TierEntry};
use super::state::RoleLedger;

/// Upper bound on rounds per tie group, the initial split included.
pub const MAX_REPEAT_ROUNDS: usize = 10;

/// Power below this magnitude is treated as zero when deciding on another round.
const EPSILON_W: f64 = 1e-9;

/// Per-member working slots, sized once for the largest group.
#[derive(Debug, Clone, Default)]
pub struct TieScratch {
    output_w: Vec<f64>,
    remainder_w: Vec<f64>,
    need_w: Vec<f64>,
}

impl TieScratch {
    /// Allocates slots for groups of up to `capacity` members.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            output_w: vec![0.0; capacity],
            remainder_w: vec![0.0; capacity],
            need_w: vec![0.0; capacity],
        }
    }

    fn capacity(&self) -> usize {
        self.output_w.len()
    }
}

/// Result of resolving one tie group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TieOutcome {
    /// Running surplus after the group.
    pub surplus_w: f64,
    /// Rounds used, the initial split included.
    pub rounds: usize,
    /// Pooled remainder no unmet member could take.
    pub leftover_w: f64,
}

/// Divides `amount_w` over `count` members.
///
/// # Errors
///
/// Returns [`EmsError::EmptyTieGroup`] when `count` is zero.
pub fn split_share(amount_w: f64, count: usize, weight: u32, round: usize) -> Result<f64, EmsError> {
    if count == 0 {
        return Err(EmsError::EmptyTieGroup { weight, round });
    }
    Ok(amount_w / count as f64)
}

/// Need a member still has after the first round.
///
/// Only consumers and peer controllers that were offered a positive share
/// can still be topped up; everything else is settled by its reading.
fn unmet_need(role: DeviceRole, share_w: f64, remainder_w: f64) -> f64 {
    let can_top_up = role.is_consumer() || role == DeviceRole::PeerDistrictController;
    if can_top_up && share_w > 0.0 && remainder_w < 0.0 {
        -remainder_w
    } else {
        0.0
    }
}

/// Resolves one group of equal-weight members starting from `surplus_w`.
///
/// # Errors
///
/// Returns [`EmsError::EmptyTieGroup`] if a share is computed over zero members.
pub fn resolve_group<P: PriorityPort>(
    registry: &PortRegistry<P>,
    members: &[TierEntry],
    surplus_w: f64,
    ledger: &mut RoleLedger,
    scratch: &mut TieScratch,
) -> Result<TieOutcome, EmsError> {
    let weight = members.first().map_or(0, |e| e.weight);
    if scratch.capacity() < members.len() {
        *scratch = TieScratch::with_capacity(members.len());
    }
    let n = members.len();

    let share_w = split_share(surplus_w, n, weight, 1)?;
    for (i, entry) in members.iter().enumerate() {
        let demand_w = registry.input(entry.input).port.read();
        let a = apply_role_rule(entry.role, share_w, demand_w);
        ledger.record(entry.role, a.drawn_w);
        scratch.output_w[i] = a.output_w;
        scratch.remainder_w[i] = a.surplus_w;
        scratch.need_w[i] = unmet_need(entry.role, share_w, a.surplus_w);
    }

    let mut rounds = 1;
    let leftover_w = loop {
        let pool_w: f64 = scratch.remainder_w[..n].iter().filter(|r| **r > 0.0).sum();
        let unmet = scratch.need_w[..n].iter().filter(|w| **w > EPSILON_W).count();

        if pool_w <= EPSILON_W || unmet == 0 {
            break pool_w.max(0.0);
        }
        if rounds >= MAX_REPEAT_ROUNDS {
            warn!(weight, rounds, pool_w, unmet, "tie group hit the round bound");
            break pool_w;
        }
        rounds += 1;

        let share_w = split_share(pool_w, unmet, weight, rounds)?;
        for i in 0..n {
            if scratch.need_w[i] <= EPSILON_W {
                continue;
            }
            let given_w = share_w.min(scratch.need_w[i]);
            scratch.need_w[i] -= given_w;
            scratch.remainder_w[i] += given_w;
            scratch.output_w[i] += given_w;
            draw_from_donors(scratch, n, given_w);
        }
    };

    for (i, entry) in members.iter().enumerate() {
        registry.target(entry.output).port.write(scratch.output_w[i]);
    }

    let surplus_w: f64 = scratch.remainder_w[..n].iter().sum();
    debug!(weight, members = n, rounds, leftover_w, surplus_w, "tie group resolved");

    Ok(TieOutcome {
        surplus_w,
        rounds,
        leftover_w,
    })
}

/// Takes `amount_w` out of positive remainders in registration order.
fn draw_from_donors(scratch: &mut TieScratch, n: usize, mut amount_w: f64) {
    for i in 0..n {
        if amount_w <= 0.0 {
            break;
        }
        let available_w = scratch.remainder_w[i];
        if available_w <= 0.0 {
            continue;
        }
        let taken_w = available_w.min(amount_w);
        scratch.remainder_w[i] -= taken_w;
        scratch.output_w[i] -= taken_w;
        amount_w -= taken_w;
    }
}

/// Walks the table group by group; unique weights use the sequential rule.
///
/// Returns the final surplus and the largest number of rounds any group used.
///
/// # Errors
///
/// Propagates [`EmsError::EmptyTieGroup`] from [`resolve_group`].
pub fn allocate_with_ties<P: PriorityPort>(
    registry: &PortRegistry<P>,
    table: &PriorityTable,
    surplus_w: f64,
    ledger: &mut RoleLedger,
    scratch: &mut TieScratch,
) -> Result<(f64, usize), EmsError> {
    let mut surplus_w = surplus_w;
    let mut max_rounds = 0;

    for group in table.groups() {
        let members = table.members(group);
        if let [single] = members {
            surplus_w = serve_device(registry, single, surplus_w, ledger);
            max_rounds = max_rounds.max(1);
            continue;
        }
        let outcome = resolve_group(registry, members, surplus_w, ledger, scratch)?;
        surplus_w = outcome.surplus_w;
        max_rounds = max_rounds.max(outcome.rounds);
    }

    Ok((surplus_w, max_rounds))
}
