use crate::cache::SnapshotCache;
use crate::pipeline::Pipeline;

/// Process-wide state: the loaded pipeline (font included) and the
/// snapshot slot. Built once in `main` and shared by `Arc` between the
/// refresh scheduler and the read endpoint.
pub struct SnapshotService {
    cache: SnapshotCache,
    pipeline: Pipeline,
}

impl SnapshotService {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            cache: SnapshotCache::new(),
            pipeline,
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}
