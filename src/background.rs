//! 后台任务：定期清理中断上传遗留的临时文件。

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::TEMP_CLEAN_INTERVAL_SECS;
use crate::storage::Storage;

/// 启动临时文件清理任务；`temp_ttl` 为零时不启动。
pub fn spawn_background_tasks(storage: Arc<Storage>, temp_ttl: Duration) {
    if temp_ttl.is_zero() {
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(TEMP_CLEAN_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match storage.cleanup_stale_temp(temp_ttl).await {
                Ok(removed) if removed > 0 => {
                    debug!(removed, "removed stale upload temp files");
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "upload temp cleanup failed"),
            }
        }
    });
}
