pub mod rng;
pub mod vm;

pub use vm::{Vm, VmConfig, run};
