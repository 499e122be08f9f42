//! Internship allocation engine for a university placement portal.
//!
//! The [`allocation`] module carries the domain: internship postings with a
//! lifecycle, a versioned record store, and a coordinator that arbitrates
//! student and faculty assignments under capacity and uniqueness rules.
//! [`roster`] loads student rosters from registrar CSV exports, and the
//! remaining modules hold the service plumbing shared with the API binary.

pub mod allocation;
pub mod config;
pub mod error;
pub mod roster;
pub mod telemetry;
