//! Pure numeric kernels. No I/O, no threads; everything here is a function
//! of its arguments so the CPU backend and the tests share one code path.

mod decomposition;
mod spectral;
mod topology;

pub use decomposition::{decompose, Components};
pub use spectral::{abs_cosine, power_iteration, PowerIteration};
pub use topology::structural_invariants;
