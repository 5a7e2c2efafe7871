// src/models/group.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'groups' table: an ordered collection of module slots.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,

    pub name: String,

    /// Slot N must be finished before slot N+1 unlocks.
    pub is_member_order_locked: bool,

    /// Only one module may run group-wide, and a finished module's window
    /// must elapse before the next one is offered.
    pub wait_module_completion: bool,

    /// Slots ordered by `order_number`, loaded separately.
    #[sqlx(skip)]
    #[serde(default)]
    pub slots: Vec<GroupMemberSlot>,
}

impl Group {
    pub fn slot(&self, slot_id: i64) -> Option<&GroupMemberSlot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    pub fn slot_at(&self, order_number: i32) -> Option<&GroupMemberSlot> {
        self.slots.iter().find(|s| s.order_number == order_number)
    }
}

/// Represents the 'group_members' table.
/// Order numbers start at 1 and are contiguous within a group.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMemberSlot {
    pub id: i64,
    pub group_id: i64,
    pub order_number: i32,
    pub module_id: i64,
}
