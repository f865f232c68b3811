//! Single-instance permits, one per task kind.
//!
//! A slot is free or taken. Only the orchestrator takes slots (a single
//! compare-exchange, so a second attempt while taken is a no-op); the
//! [`SlotGuard`] handed to the job gives it back when dropped. Because the
//! release lives in `Drop`, it happens exactly once on every exit path,
//! including errors and panics inside the job.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use strata_types::ProofKind;

/// Every kind of background work the orchestrator launches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Idle proof and idle verify-result jobs.
    IdleChallenge,
    /// Service proof and service verify-result jobs.
    ServiceChallenge,
    ReportFiles,
    CalcTag,
    ReplaceIdle,
    ResizeSpace,
    SpaceManagement,
    Discovery,
}

impl TaskKind {
    pub const ALL: [TaskKind; 8] = [
        TaskKind::IdleChallenge,
        TaskKind::ServiceChallenge,
        TaskKind::ReportFiles,
        TaskKind::CalcTag,
        TaskKind::ReplaceIdle,
        TaskKind::ResizeSpace,
        TaskKind::SpaceManagement,
        TaskKind::Discovery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdleChallenge => "idle_challenge",
            Self::ServiceChallenge => "service_challenge",
            Self::ReportFiles => "report_files",
            Self::CalcTag => "calc_tag",
            Self::ReplaceIdle => "replace_idle",
            Self::ResizeSpace => "resize_space",
            Self::SpaceManagement => "space_management",
            Self::Discovery => "discovery",
        }
    }

    /// The slot shared by proof and verify-result jobs of `kind`.
    pub fn for_proof(kind: ProofKind) -> Self {
        match kind {
            ProofKind::Idle => Self::IdleChallenge,
            ProofKind::Service => Self::ServiceChallenge,
        }
    }

    /// The proof kind this slot serves, if it is a challenge slot.
    pub fn proof_kind(&self) -> Option<ProofKind> {
        match self {
            Self::IdleChallenge => Some(ProofKind::Idle),
            Self::ServiceChallenge => Some(ProofKind::Service),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A binary permit for one task kind.
#[derive(Debug)]
pub struct TaskSlot {
    kind: TaskKind,
    taken: AtomicBool,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl TaskSlot {
    /// A free slot.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            taken: AtomicBool::new(false),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn is_free(&self) -> bool {
        !self.taken.load(Ordering::Acquire)
    }

    /// Take the slot if it is free.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotGuard> {
        self.taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.acquired.fetch_add(1, Ordering::Relaxed);
        Some(SlotGuard {
            slot: Arc::clone(self),
        })
    }

    /// Times the slot has been taken.
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::Relaxed)
    }

    /// Times the slot has been given back.
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
        self.taken.store(false, Ordering::Release);
    }
}

/// Proof of holding a slot. Dropping it frees the slot.
#[must_use = "dropping the guard frees the slot immediately"]
#[derive(Debug)]
pub struct SlotGuard {
    slot: Arc<TaskSlot>,
}

impl SlotGuard {
    pub fn kind(&self) -> TaskKind {
        self.slot.kind
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slot.release();
    }
}

/// One slot per [`TaskKind`], all free at construction.
#[derive(Debug)]
pub struct SlotSet {
    slots: Vec<Arc<TaskSlot>>,
}

impl SlotSet {
    pub fn new() -> Self {
        Self {
            slots: TaskKind::ALL
                .iter()
                .map(|kind| Arc::new(TaskSlot::new(*kind)))
                .collect(),
        }
    }

    pub fn slot(&self, kind: TaskKind) -> &Arc<TaskSlot> {
        &self.slots[kind.index()]
    }

    pub fn try_acquire(&self, kind: TaskKind) -> Option<SlotGuard> {
        self.slot(kind).try_acquire()
    }

    pub fn is_free(&self, kind: TaskKind) -> bool {
        self.slot(kind).is_free()
    }

    pub fn acquired(&self, kind: TaskKind) -> u64 {
        self.slot(kind).acquired()
    }

    pub fn released(&self, kind: TaskKind) -> u64 {
        self.slot(kind).released()
    }
}

impl Default for SlotSet {
    fn default() -> Self {
        Self::new()
    }
}
