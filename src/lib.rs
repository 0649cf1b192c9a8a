//! Microscopic Traffic Simulator
//!
//! A step-driven traffic simulation library: IDM car-following kinematics,
//! mutual-exclusion intersection admission, and signal/stop-zone gating.

pub mod simulation;
