use std::time::Instant;

use brep_kernel::{Kernel, KernelIntrospect};

/// Combined trait for operations that need both mutable Kernel access
/// and read-only KernelIntrospect access on the same object.
///
/// Lets an op snapshot topology, call the kernel, and snapshot again
/// through a single `&mut dyn KernelBundle`.
pub trait KernelBundle: Kernel + KernelIntrospect {
    fn as_introspect(&self) -> &dyn KernelIntrospect;
}

impl<T: Kernel + KernelIntrospect> KernelBundle for T {
    fn as_introspect(&self) -> &dyn KernelIntrospect {
        self
    }
}

/// Run a kernel call and report its wall time in milliseconds.
pub(crate) fn timed<T>(call: impl FnOnce() -> T) -> (T, f64) {
    let start = Instant::now();
    let out = call();
    (out, start.elapsed().as_secs_f64() * 1000.0)
}
