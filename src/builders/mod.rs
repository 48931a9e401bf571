//! Builders that wire schedulers and gates from [`GateConfig`](crate::config::GateConfig).

pub mod gate_builder;

pub use gate_builder::{build_gate, build_schedulers, build_trip_on_any_gate};
