use crate::constants::{DOCKER_BUILDX_CACHE, DOCKER_CACHE, DOCKER_LOGS};
use crate::model::CategoryId;
use crate::scanner::PathScanner;
use std::path::Path;

/// Docker Desktop logs and build caches. Images and volumes live inside the
/// VM disk and are left to `docker system prune`.
pub fn docker_scanner(home: &Path) -> PathScanner {
    PathScanner::new(
        CategoryId::Docker,
        vec![
            home.join(DOCKER_LOGS),
            home.join(DOCKER_CACHE),
            home.join(DOCKER_BUILDX_CACHE),
        ],
    )
}
