//! OSCAR (OpenSCenario Automated Runner) interprets OpenSCENARIO driving scenarios.
//!
//! Scenarios are loaded by [`oscar_fmt_xml`] and executed by its `oscar_core` re-export,
//! tick by tick, against a simulator.
//! The command line runs them on the in-memory sandbox simulator,
//! reporting the outcome and optionally saving a trace of every tick.

mod cli;
mod print_trace;

pub use cli::Cli;
pub use oscar_fmt_xml;
pub use print_trace::TracePrinter;
