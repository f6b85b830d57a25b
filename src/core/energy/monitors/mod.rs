// Per-component monitors

pub mod cpu;
pub mod gpu;
pub mod network;
pub mod storage;

pub use cpu::CpuMonitor;
pub use gpu::GpuMonitor;
pub use network::NetworkMonitor;
pub use storage::StorageMonitor;
