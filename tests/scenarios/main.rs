//! End-to-end scenarios
//!
//! Whole actions resolved against small hand-built worlds, checking the
//! observable outcome a turn processor would see.

mod attack;
mod unlock;
