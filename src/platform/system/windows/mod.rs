// Windows system modules

pub mod cpu;
pub mod tcp;

pub use cpu::{processor_clocks_and_voltages, ProcessorReading};
pub use tcp::IpHelperTcpStats;
