//! Fixed phase tables for simulated generation.
//!
//! Each job kind walks its table in order. Targets are strictly increasing
//! and the last one is always 100.

use crate::job::JobKind;

/// One step of a job's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    /// Progress recorded once the phase finishes.
    pub percent: i16,
    /// Human-readable status shown to the owner.
    pub message: &'static str,
}

const fn phase(percent: i16, message: &'static str) -> Phase {
    Phase { percent, message }
}

pub const VIDEO_PHASES: [Phase; 5] = [
    phase(10, "Analyzing script"),
    phase(30, "Generating scenes"),
    phase(60, "Rendering video"),
    phase(80, "Adding audio"),
    phase(100, "Finalizing"),
];

pub const SCRIPT_PHASES: [Phase; 5] = [
    phase(20, "Researching topic"),
    phase(40, "Drafting outline"),
    phase(70, "Writing script"),
    phase(90, "Polishing tone"),
    phase(100, "Finalizing"),
];

/// Phase table for a job kind.
pub fn phases_for(kind: JobKind) -> &'static [Phase] {
    match kind {
        JobKind::Video => &VIDEO_PHASES,
        JobKind::Script => &SCRIPT_PHASES,
    }
}
