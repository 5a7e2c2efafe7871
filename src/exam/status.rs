//! Accessibility state of every slot in a group for one exam taker.
//!
//! The state is derived on every read from the exam taker's progress records
//! and the group flags. Rules are evaluated top to bottom and the first one
//! that yields a status wins; their order is the precedence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{
    group::{Group, GroupMemberSlot},
    progress::{ModuleProgress, ModuleStatus},
};

/// Everything a rule may look at when judging one slot.
pub struct StatusContext<'a> {
    pub slot: &'a GroupMemberSlot,
    pub group: &'a Group,
    /// The exam taker's progress in this group, keyed by slot id.
    pub progress_by_slot: &'a HashMap<i64, &'a ModuleProgress>,
    pub now: DateTime<Utc>,
}

impl<'a> StatusContext<'a> {
    fn own_progress(&self) -> Option<&'a ModuleProgress> {
        self.progress_by_slot.get(&self.slot.id).copied()
    }

    fn waits(&self) -> bool {
        self.group.wait_module_completion
    }

    fn order_locked(&self) -> bool {
        self.group.is_member_order_locked
    }

    /// Whether some other slot has a running attempt.
    fn other_slot_active(&self) -> bool {
        self.progress_by_slot
            .iter()
            .any(|(slot_id, p)| *slot_id != self.slot.id && p.is_active(self.now))
    }
}

type Rule = fn(&StatusContext<'_>) -> Option<ModuleStatus>;

/// Evaluation order. Earlier rules shadow later ones.
const RULES: &[Rule] = &[
    completed,
    time_elapsed,
    locked_by_active_module,
    in_progress,
    freely_accessible,
    gated_by_previous_slot,
];

/// Status of `slot`, given all of the exam taker's progress in `group`.
pub fn resolve_status(
    slot: &GroupMemberSlot,
    progress: &[ModuleProgress],
    group: &Group,
    now: DateTime<Utc>,
) -> ModuleStatus {
    let progress_by_slot = index_by_slot(progress, group);
    let ctx = StatusContext {
        slot,
        group,
        progress_by_slot: &progress_by_slot,
        now,
    };
    evaluate(&ctx)
}

/// Status of every slot in `group`, in slot order.
pub fn resolve_all(
    progress: &[ModuleProgress],
    group: &Group,
    now: DateTime<Utc>,
) -> Vec<(GroupMemberSlot, ModuleStatus)> {
    let progress_by_slot = index_by_slot(progress, group);
    let mut slots: Vec<&GroupMemberSlot> = group.slots.iter().collect();
    slots.sort_by_key(|s| s.order_number);

    slots
        .into_iter()
        .map(|slot| {
            let ctx = StatusContext {
                slot,
                group,
                progress_by_slot: &progress_by_slot,
                now,
            };
            (slot.clone(), evaluate(&ctx))
        })
        .collect()
}

fn evaluate(ctx: &StatusContext<'_>) -> ModuleStatus {
    RULES
        .iter()
        .find_map(|rule| rule(ctx))
        // Unreachable: the last rule always answers. Deny access if it ever is.
        .unwrap_or(ModuleStatus::Locked)
}

/// Ignores progress for slots outside the group.
fn index_by_slot<'a>(progress: &'a [ModuleProgress], group: &Group) -> HashMap<i64, &'a ModuleProgress> {
    progress
        .iter()
        .filter(|p| group.slot(p.group_member_id).is_some())
        .map(|p| (p.group_member_id, p))
        .collect()
}

fn completed(ctx: &StatusContext<'_>) -> Option<ModuleStatus> {
    let progress = ctx.own_progress().filter(|p| p.is_completed())?;
    if ctx.waits() && !progress.is_time_elapsed(ctx.now) {
        Some(ModuleStatus::WaitForModuleDurationToElapse)
    } else {
        Some(ModuleStatus::Completed)
    }
}

/// An expired attempt is reported as expired, never as locked.
fn time_elapsed(ctx: &StatusContext<'_>) -> Option<ModuleStatus> {
    ctx.own_progress()
        .filter(|p| p.is_time_elapsed(ctx.now))
        .map(|_| ModuleStatus::TimeElapsed)
}

fn locked_by_active_module(ctx: &StatusContext<'_>) -> Option<ModuleStatus> {
    (ctx.waits() && ctx.other_slot_active()).then_some(ModuleStatus::Locked)
}

fn in_progress(ctx: &StatusContext<'_>) -> Option<ModuleStatus> {
    ctx.own_progress().map(|_| ModuleStatus::InProgress)
}

fn freely_accessible(ctx: &StatusContext<'_>) -> Option<ModuleStatus> {
    let unrestricted = !ctx.order_locked() && !ctx.waits();
    (unrestricted || ctx.slot.order_number == 1).then_some(ModuleStatus::NotStarted)
}

fn gated_by_previous_slot(ctx: &StatusContext<'_>) -> Option<ModuleStatus> {
    let Some(previous_slot) = ctx.group.slot_at(ctx.slot.order_number - 1) else {
        return Some(ModuleStatus::Locked);
    };

    let Some(previous) = ctx.progress_by_slot.get(&previous_slot.id) else {
        // An order lock wins over wait-for-completion: an unstarted predecessor keeps this slot locked.
        let open = ctx.waits() && !ctx.order_locked() && !ctx.other_slot_active();
        return Some(if open {
            ModuleStatus::NotStarted
        } else {
            ModuleStatus::Locked
        });
    };

    let previous_expired = previous.is_time_elapsed(ctx.now);
    if ctx.order_locked() && !previous.is_completed() && !previous_expired {
        return Some(ModuleStatus::Locked);
    }

    if previous.is_completed() && ctx.waits() && !previous_expired {
        return Some(ModuleStatus::WaitForModuleDurationToElapse);
    }

    Some(ModuleStatus::NotStarted)
}
