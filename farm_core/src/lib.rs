//! # Farm Core
//!
//! The decision and safety layer of an automated farming script. This crate reads the
//! world through the `farm_world` host bridge, decides what the character should do next,
//! and keeps a persistent record of how each session went.
//!
//! ## Core Components
//!
//! - **danger**: Weighted 0-100 danger score and flee decision
//! - **supply**: Consumable history, usage rates and depletion forecasts
//! - **banking**: Weight, time, gold and supply triggers for bank trips
//! - **session_log**: Bounded JSON session log with analytics and CSV export
//! - **state_machine**: Idle/Harvesting/Banking/Fleeing arbitration and pack weight
//! - **farmer**: The tick loop tying the components to a host
//! - **config**: TOML configuration for a farmer
//!
//! ## Design Philosophy
//!
//! - **Host-Driven**: Every read, write and action goes through an injected host, so the
//!   same code runs against the live client and the in-process simulator
//! - **Fail Soft**: Missing state degrades to a neutral value and a log line, never a crash
//! - **Priority Ordered**: Fleeing beats banking beats harvesting, every tick

pub mod banking;
pub mod config;
pub mod danger;
pub mod farmer;
pub mod session_log;
pub mod state_machine;
pub mod supply;

pub use banking::*;
pub use config::*;
pub use danger::*;
pub use farmer::*;
pub use session_log::*;
pub use state_machine::*;
pub use supply::*;
