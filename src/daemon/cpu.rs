use crate::daemon::osproc::OsProcessTable;

/// The CPU Sampler (§4.5): on every monitor tick, samples CPU usage for
/// every live child and reports it. When the underlying OS capability is
/// unavailable the sampler reports `None` rather than fabricating a zero
/// reading, so callers must not treat a missing sample as "idle".
pub struct CpuSampler<'a> {
    table: &'a OsProcessTable,
}

impl<'a> CpuSampler<'a> {
    pub fn new(table: &'a OsProcessTable) -> Self {
        CpuSampler { table }
    }

    /// Samples CPU percent for `pid`. Returns `None` if the process is not
    /// currently visible to the OS process table.
    pub fn sample(&self, pid: u32) -> Option<f32> {
        self.table.cpu_percent(pid)
    }
}
