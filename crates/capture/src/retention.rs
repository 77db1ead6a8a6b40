//! 파일 보존 정책 -- 세션 간 하우스키핑
//!
//! 로그 디렉토리를 스캔하여 휴지통 처리되지 않은 로그 파일 수가
//! 설정된 상한을 넘으면, 수정 시각이 오래된 순서로 초과분을
//! 휴지통 처리합니다.
//!
//! 휴지통 상태는 로그 파일별 사이드카 `<file>.meta.json`에 기록되며,
//! 이미 휴지통 처리된 파일은 카운트와 후보에서 모두 제외됩니다.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use debugtap_core::metrics as m;

use crate::error::CaptureError;

/// 로그 파일 사이드카 메타데이터
///
/// 최소한 `trashed` 플래그를 담으며, 알 수 없는 필드는 재기록 시에도
/// 보존됩니다.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SidecarMeta {
    /// 휴지통 처리 여부
    #[serde(default)]
    pub trashed: bool,
    /// 다른 도구가 기록한 추가 필드 (보존)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 보존 정책 집행 결과
#[derive(Debug, Default)]
pub struct RetentionReport {
    /// 추적 대상(휴지통 제외) 파일 수
    pub tracked: usize,
    /// 이번 실행에서 휴지통 처리된 파일 목록
    pub trashed: Vec<PathBuf>,
}

/// 파일 보존 정책 집행기
///
/// "사용자에게 알림" 플래그는 인스턴스 필드이므로 여러 파이프라인
/// 인스턴스(예: 테스트)가 서로 간섭하지 않습니다.
#[derive(Debug, Default)]
pub struct FileRetentionEnforcer {
    /// 알림을 이미 보냈는지 여부 — 인스턴스 수명 동안 최대 한 번
    notified: bool,
}

impl FileRetentionEnforcer {
    /// 새 집행기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 디렉토리에 보존 상한을 적용합니다.
    ///
    /// stat할 수 없는 파일은 전체 실행을 중단하지 않고 건너뜁니다.
    /// `max_files`가 0이면 무제한으로 간주하고 아무 작업도 하지 않습니다.
    ///
    /// # Errors
    /// 디렉토리 자체를 읽을 수 없는 경우에만 에러를 반환합니다.
    pub async fn enforce(
        &mut self,
        dir: &Path,
        max_files: usize,
    ) -> Result<RetentionReport, CaptureError> {
        if max_files == 0 {
            return Ok(RetentionReport::default());
        }

        let mut entries =
            tokio::fs::read_dir(dir)
                .await
                .map_err(|e| CaptureError::Retention {
                    path: dir.display().to_string(),
                    reason: format!("failed to read directory: {e}"),
                })?;

        let mut candidates: Vec<(PathBuf, SystemTime)> = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CaptureError::Retention {
                path: dir.display().to_string(),
                reason: format!("failed to read directory entry: {e}"),
            })?
        {
            let path = entry.path();

            let is_log = path.extension().is_some_and(|ext| ext == "log");
            if !is_log {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot stat log file, skipping");
                    continue;
                }
            };

            if load_sidecar(&path).await.trashed {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "no modification time, skipping");
                    continue;
                }
            };

            candidates.push((path, modified));
        }

        let tracked = candidates.len();
        if tracked <= max_files {
            return Ok(RetentionReport {
                tracked,
                trashed: Vec::new(),
            });
        }

        // 오래된 파일부터 초과분을 휴지통 처리
        candidates.sort_by_key(|(_, modified)| *modified);
        let excess = tracked - max_files;

        let mut trashed = Vec::new();
        for (path, _) in candidates.into_iter().take(excess) {
            match mark_trashed(&path).await {
                Ok(()) => {
                    metrics::counter!(m::CAPTURE_FILES_TRASHED_TOTAL).increment(1);
                    trashed.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to trash log file, skipping");
                }
            }
        }

        if !trashed.is_empty() && !self.notified {
            self.notified = true;
            tracing::info!(
                count = trashed.len(),
                max_files,
                dir = %dir.display(),
                "log file cap exceeded, oldest files moved to trash"
            );
        }

        Ok(RetentionReport { tracked, trashed })
    }
}

/// 로그 파일에 대응하는 사이드카 경로를 반환합니다.
pub fn sidecar_path(log_path: &Path) -> PathBuf {
    let mut name = OsString::from(log_path.as_os_str());
    name.push(".meta.json");
    PathBuf::from(name)
}

/// 사이드카를 읽습니다. 없거나 손상된 경우 기본값을 반환합니다.
async fn load_sidecar(log_path: &Path) -> SidecarMeta {
    let path = sidecar_path(log_path);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "corrupt sidecar, using defaults");
            SidecarMeta::default()
        }),
        Err(_) => SidecarMeta::default(),
    }
}

/// 사이드카의 trashed 플래그를 설정합니다. 기존 필드는 보존됩니다.
async fn mark_trashed(log_path: &Path) -> Result<(), CaptureError> {
    let mut meta = load_sidecar(log_path).await;
    meta.trashed = true;
    let content = serde_json::to_string_pretty(&meta).map_err(|e| CaptureError::Retention {
        path: log_path.display().to_string(),
        reason: format!("failed to serialize sidecar: {e}"),
    })?;
    tokio::fs::write(sidecar_path(log_path), content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn write_log(dir: &Path, name: &str, age: Duration) {
        let path = dir.join(name);
        tokio::fs::write(&path, "log content\n").await.unwrap();
        // mtime을 과거로 설정하여 결정적인 정렬 순서를 만든다
        let mtime = SystemTime::now() - age;
        let file = std::fs::File::options().append(true).open(&path).unwrap();
        file.set_modified(mtime).unwrap();
    }

    async fn is_trashed(dir: &Path, name: &str) -> bool {
        load_sidecar(&dir.join(name)).await.trashed
    }

    #[tokio::test]
    async fn under_cap_trashes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "a.log", Duration::from_secs(30)).await;
        write_log(dir.path(), "b.log", Duration::from_secs(20)).await;

        let mut enforcer = FileRetentionEnforcer::new();
        let report = enforcer.enforce(dir.path(), 5).await.unwrap();
        assert_eq!(report.tracked, 2);
        assert!(report.trashed.is_empty());
    }

    #[tokio::test]
    async fn oldest_excess_files_trashed() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "oldest.log", Duration::from_secs(300)).await;
        write_log(dir.path(), "middle.log", Duration::from_secs(200)).await;
        write_log(dir.path(), "newest.log", Duration::from_secs(100)).await;

        let mut enforcer = FileRetentionEnforcer::new();
        let report = enforcer.enforce(dir.path(), 1).await.unwrap();

        assert_eq!(report.tracked, 3);
        assert_eq!(report.trashed.len(), 2);
        assert!(is_trashed(dir.path(), "oldest.log").await);
        assert!(is_trashed(dir.path(), "middle.log").await);
        assert!(!is_trashed(dir.path(), "newest.log").await);
    }

    #[tokio::test]
    async fn already_trashed_excluded_from_count_and_candidates() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "trashed.log", Duration::from_secs(400)).await;
        write_log(dir.path(), "a.log", Duration::from_secs(300)).await;
        write_log(dir.path(), "b.log", Duration::from_secs(200)).await;
        mark_trashed(&dir.path().join("trashed.log")).await.unwrap();

        let mut enforcer = FileRetentionEnforcer::new();
        let report = enforcer.enforce(dir.path(), 2).await.unwrap();

        // trashed.log는 카운트에 포함되지 않으므로 상한 이내
        assert_eq!(report.tracked, 2);
        assert!(report.trashed.is_empty());
    }

    #[tokio::test]
    async fn zero_cap_means_unlimited() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "a.log", Duration::from_secs(10)).await;

        let mut enforcer = FileRetentionEnforcer::new();
        let report = enforcer.enforce(dir.path(), 0).await.unwrap();
        assert_eq!(report.tracked, 0);
        assert!(report.trashed.is_empty());
    }

    #[tokio::test]
    async fn non_log_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "a.log", Duration::from_secs(10)).await;
        tokio::fs::write(dir.path().join("notes.txt"), "x").await.unwrap();

        let mut enforcer = FileRetentionEnforcer::new();
        let report = enforcer.enforce(dir.path(), 5).await.unwrap();
        assert_eq!(report.tracked, 1);
    }

    #[tokio::test]
    async fn sidecar_files_not_counted_as_logs() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "a.log", Duration::from_secs(10)).await;
        mark_trashed(&dir.path().join("a.log")).await.unwrap();

        let mut enforcer = FileRetentionEnforcer::new();
        let report = enforcer.enforce(dir.path(), 5).await.unwrap();
        // a.log는 휴지통, 사이드카 자체는 .log가 아님
        assert_eq!(report.tracked, 0);
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let mut enforcer = FileRetentionEnforcer::new();
        let result = enforcer
            .enforce(Path::new("/nonexistent/debugtap-logs"), 3)
            .await;
        assert!(matches!(result, Err(CaptureError::Retention { .. })));
    }

    #[tokio::test]
    async fn corrupt_sidecar_treated_as_not_trashed() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "a.log", Duration::from_secs(10)).await;
        tokio::fs::write(dir.path().join("a.log.meta.json"), "{not json")
            .await
            .unwrap();

        let mut enforcer = FileRetentionEnforcer::new();
        let report = enforcer.enforce(dir.path(), 5).await.unwrap();
        assert_eq!(report.tracked, 1);
    }

    #[tokio::test]
    async fn mark_trashed_preserves_extra_fields() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("a.log");
        tokio::fs::write(&log, "x").await.unwrap();
        tokio::fs::write(
            sidecar_path(&log),
            r#"{"trashed": false, "note": "keep me"}"#,
        )
        .await
        .unwrap();

        mark_trashed(&log).await.unwrap();

        let meta = load_sidecar(&log).await;
        assert!(meta.trashed);
        assert_eq!(
            meta.extra.get("note").and_then(|v| v.as_str()),
            Some("keep me")
        );
    }
}
