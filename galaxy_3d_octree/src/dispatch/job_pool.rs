/// Worker pool for per-node content jobs.

use crate::error::{Error, Result};

pub struct JobPool {
    pool: rayon::ThreadPool,
}

impl JobPool {
    /// Build a pool with `threads` workers (0 = one per core).
    pub fn new(threads: usize) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|index| format!("galaxy3d-content-{}", index));
        if threads > 0 {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| Error::InitializationFailed(format!("content job pool: {}", e)))?;

        crate::engine_info!("galaxy3d::JobPool", "Content job pool ready ({} threads)", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub(crate) fn pool(&self) -> &rayon::ThreadPool {
        &self.pool
    }
}
