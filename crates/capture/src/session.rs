//! 로그 세션 -- 열린 출력 파일 하나의 소유자
//!
//! [`LogSession`]은 포맷팅, 중복 제거, 분할 평가, 바이트/라인 계정을
//! 조율하며 로테이션(닫기/연속 헤더와 함께 재열기)을 수행합니다.
//!
//! # 상태 기계
//! ```text
//! recording <-> paused
//!     |            |
//!     +--> stopped <+   (terminal)
//! ```
//!
//! 세션당 열린 파일 핸들은 항상 최대 1개이며, 다른 컴포넌트는 이 파일에
//! 직접 쓰지 않습니다.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use debugtap_core::metrics as m;
use debugtap_core::types::SourceLocation;

use crate::config::CaptureConfig;
use crate::dedup::Deduplicator;
use crate::error::CaptureError;
use crate::format::{self, LineFormatter};
use crate::split::{FileSplitter, RotationState, SplitReason};

/// 세션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 기록 중
    Recording,
    /// 일시 정지
    Paused,
    /// 정지됨 (terminal)
    Stopped,
}

/// 세션이 발행하는 구조화된 통지
///
/// 콜백 대신 typed 이벤트를 채널로 전달하여 순서 보장을 명확히 합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// 누적 라인 수 변경 (상태 표시 갱신용)
    LineCountChanged {
        /// 소유 세션 ID
        session_id: String,
        /// 누적 라인 수
        lines: u64,
    },
    /// 파일 로테이션 수행됨
    SplitPerformed {
        /// 소유 세션 ID
        session_id: String,
        /// 새 파트 번호
        part: u32,
        /// 분할 사유
        reason: SplitReason,
    },
    /// 세션 최대 라인 수 도달
    MaxLinesReached {
        /// 소유 세션 ID
        session_id: String,
        /// 도달 시점의 누적 라인 수
        lines: u64,
    },
    /// 세션 정지됨
    Stopped {
        /// 소유 세션 ID
        session_id: String,
        /// 최종 누적 라인 수
        lines: u64,
    },
}

/// 로그 세션
pub struct LogSession {
    /// 소유 세션 ID
    session_id: String,
    /// 파트 1 파일 경로
    base_path: PathBuf,
    /// 현재 열린 파일 핸들
    file: Option<File>,
    /// 현재 상태
    state: SessionState,
    /// 현재 파트 번호 (1부터)
    part: u32,
    /// 세션 누적 라인 수 (로테이션에도 유지)
    line_count: u64,
    /// 현재 파트에 기록된 라인 수 (로테이션 시 리셋)
    part_line_count: u64,
    /// 현재 파트에 기록된 바이트 수 (로테이션 시 리셋)
    bytes_written: u64,
    /// 현재 파트 시작 시각
    part_started: Instant,
    /// 마지막 라인 기록 시각
    last_line_at: Option<Instant>,
    /// 세션당 최대 라인 수 (0 = 무제한)
    max_lines: u64,
    /// 최대 라인 수 도달 플래그 — clear() 외에는 해제되지 않음
    max_lines_hit: bool,
    /// 중복 제거기
    dedup: Deduplicator,
    /// 분할 평가기
    splitter: FileSplitter,
    /// 라인 포매터
    formatter: LineFormatter,
    /// 통지 채널
    notices: Option<mpsc::Sender<SessionNotice>>,
}

impl LogSession {
    /// 세션을 시작합니다: 파트 1 파일을 열고 헤더를 기록합니다.
    ///
    /// # Errors
    /// 디렉토리 생성이나 파일 열기/쓰기에 실패하면 에러를 전파합니다.
    /// 호출자(SessionManager)는 이 경우 해당 세션의 캡처를 포기합니다.
    pub async fn start(
        session_id: impl Into<String>,
        base_path: impl Into<PathBuf>,
        config: &CaptureConfig,
        notices: Option<mpsc::Sender<SessionNotice>>,
    ) -> Result<Self, CaptureError> {
        let session_id = session_id.into();
        let base_path = base_path.into();
        let started_at = Local::now();

        if let Some(parent) = base_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = open_append(&base_path).await?;

        let mut session = Self {
            session_id,
            base_path,
            file: Some(file),
            state: SessionState::Recording,
            part: 1,
            line_count: 0,
            part_line_count: 0,
            bytes_written: 0,
            part_started: Instant::now(),
            last_line_at: None,
            max_lines: config.max_lines,
            max_lines_hit: false,
            dedup: Deduplicator::new(std::time::Duration::from_millis(config.dedup_window_ms)),
            splitter: FileSplitter::new(config.split.clone()),
            formatter: LineFormatter::new(config.format.clone(), started_at),
            notices,
        };

        let header = session
            .formatter
            .header(&session.session_id, &session.base_file_name());
        session.write_raw(&header).await?;

        tracing::info!(
            session = %session.session_id,
            path = %session.base_path.display(),
            "capture session started"
        );
        Ok(session)
    }

    /// 출력 라인 하나를 처리합니다.
    ///
    /// 분할 평가 -> 포맷 -> 중복 제거 -> 기록 순서로 진행하며,
    /// 실제로 파일에 기록된 라인 문자열들을 순서대로 반환합니다
    /// (브로드캐스트용). 기록 중이 아니거나 최대 라인 수에 도달한
    /// 경우에는 아무것도 하지 않고 빈 Vec을 반환합니다.
    pub async fn append_line(
        &mut self,
        text: &str,
        category: &str,
        source: Option<&SourceLocation>,
    ) -> Result<Vec<String>, CaptureError> {
        if self.state != SessionState::Recording || self.max_lines_hit {
            return Ok(Vec::new());
        }

        // 분할은 트리거 라인을 기록하기 전에 완료되어야 합니다.
        let rotation_state = self.rotation_state();
        if let Some(reason) = self.splitter.evaluate(&rotation_state, Some(text)) {
            self.perform_split(reason).await?;
        }

        let formatted = self
            .formatter
            .format_line(text, category, source, Local::now());

        let pending = self.dedup.process(&formatted);
        if pending.is_empty() {
            metrics::counter!(m::CAPTURE_DEDUP_MERGED_TOTAL).increment(1);
        }

        let mut written = Vec::with_capacity(pending.len());
        for line in pending {
            self.write_line(&line).await?;
            written.push(line);

            if self.max_lines > 0 && self.line_count >= self.max_lines {
                let marker = format::max_lines_marker(self.max_lines);
                self.write_raw(&format!("{marker}\n")).await?;
                self.max_lines_hit = true;
                self.notify(SessionNotice::MaxLinesReached {
                    session_id: self.session_id.clone(),
                    lines: self.line_count,
                });
                tracing::info!(
                    session = %self.session_id,
                    lines = self.line_count,
                    "max line cap reached, no further lines accepted"
                );
                break;
            }
        }

        self.last_line_at = Some(Instant::now());
        self.notify(SessionNotice::LineCountChanged {
            session_id: self.session_id.clone(),
            lines: self.line_count,
        });
        Ok(written)
    }

    /// 마커 라인을 기록합니다.
    ///
    /// 마커는 중복 제거를 거치지 않고 즉시 기록되며 라인 수에
    /// 포함됩니다. 정지된 세션에서는 `None`을 반환합니다.
    pub async fn append_marker(&mut self, text: &str) -> Result<Option<String>, CaptureError> {
        if self.state == SessionState::Stopped {
            return Ok(None);
        }

        self.write_line(text).await?;
        self.last_line_at = Some(Instant::now());
        self.notify(SessionNotice::LineCountChanged {
            session_id: self.session_id.clone(),
            lines: self.line_count,
        });
        Ok(Some(text.to_owned()))
    }

    /// 로테이션을 수행합니다: 구 파일에 분할 마커를 남기고 닫은 뒤,
    /// 다음 파트 파일을 열어 연속 헤더를 기록합니다.
    async fn perform_split(&mut self, reason: SplitReason) -> Result<(), CaptureError> {
        // 열린 중복 그룹은 구 파일에 속하므로 먼저 내보냅니다.
        if let Some(summary) = self.dedup.flush() {
            self.write_line(&summary).await?;
        }

        let next_part = self.part + 1;
        let marker = format::split_marker(&reason, next_part);
        self.write_raw(&format!("{marker}\n")).await?;

        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }

        let path = self.part_path(next_part);
        let file = open_append(&path).await?;
        self.file = Some(file);
        self.part = next_part;
        self.part_line_count = 0;
        self.bytes_written = 0;
        self.part_started = Instant::now();

        let header = self.formatter.continuation_header(
            &self.session_id,
            &self.base_file_name(),
            next_part,
            &reason,
            Local::now(),
        );
        self.write_raw(&header).await?;

        tracing::info!(
            session = %self.session_id,
            part = next_part,
            reason = %reason,
            path = %path.display(),
            "log file rotated"
        );
        metrics::counter!(m::CAPTURE_SPLITS_TOTAL, m::LABEL_REASON => reason.label()).increment(1);
        self.notify(SessionNotice::SplitPerformed {
            session_id: self.session_id.clone(),
            part: next_part,
            reason,
        });
        Ok(())
    }

    /// 기록을 일시 정지합니다. 기록 중이 아니면 아무 일도 하지 않습니다.
    pub fn pause(&mut self) {
        if self.state == SessionState::Recording {
            self.state = SessionState::Paused;
            tracing::debug!(session = %self.session_id, "capture paused");
        }
    }

    /// 기록을 재개합니다. 일시 정지 상태가 아니면 아무 일도 하지 않습니다.
    pub fn resume(&mut self) {
        if self.state == SessionState::Paused {
            self.state = SessionState::Recording;
            tracing::debug!(session = %self.session_id, "capture resumed");
        }
    }

    /// 최대 라인 수 도달 플래그와 열린 중복 그룹을 초기화합니다.
    ///
    /// 라인 카운터도 0으로 되돌아가며, 파일 내용은 건드리지 않습니다.
    pub fn clear(&mut self) {
        self.max_lines_hit = false;
        self.line_count = 0;
        self.part_line_count = 0;
        let _ = self.dedup.flush();
        tracing::debug!(session = %self.session_id, "session counters cleared");
    }

    /// 세션을 정지하고 파일을 마무리합니다.
    ///
    /// 열린 중복 그룹을 내보내고 푸터를 기록한 뒤 파일을 닫습니다.
    /// 반복 호출은 no-op입니다. teardown 중 호출되므로 I/O 에러는
    /// 로그만 남기고 절대 전파하지 않습니다. 최종 라인 수를 반환합니다.
    pub async fn stop(&mut self) -> u64 {
        if self.state == SessionState::Stopped {
            return self.line_count;
        }
        self.state = SessionState::Stopped;

        if let Some(summary) = self.dedup.flush() {
            if let Err(e) = self.write_line(&summary).await {
                tracing::warn!(session = %self.session_id, error = %e, "failed to flush dedup group at stop");
            }
        }

        let footer = format::footer(self.line_count, Local::now());
        if let Err(e) = self.write_raw(&format!("{footer}\n")).await {
            tracing::warn!(session = %self.session_id, error = %e, "failed to write session footer");
        }

        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush().await {
                tracing::warn!(session = %self.session_id, error = %e, "failed to flush log file at stop");
            }
            if let Err(e) = file.sync_all().await {
                tracing::debug!(session = %self.session_id, error = %e, "failed to sync log file at stop");
            }
        }

        tracing::info!(
            session = %self.session_id,
            lines = self.line_count,
            parts = self.part,
            "capture session stopped"
        );
        self.notify(SessionNotice::Stopped {
            session_id: self.session_id.clone(),
            lines: self.line_count,
        });
        self.line_count
    }

    // --- 내부 쓰기 경로 ---

    /// 라인 하나를 기록하고 라인 카운터를 증가시킵니다.
    async fn write_line(&mut self, line: &str) -> Result<(), CaptureError> {
        self.write_raw(&format!("{line}\n")).await?;
        self.line_count += 1;
        self.part_line_count += 1;
        metrics::counter!(m::CAPTURE_LINES_WRITTEN_TOTAL).increment(1);
        Ok(())
    }

    /// 원시 문자열을 현재 파일에 기록하고 바이트 카운터를 증가시킵니다.
    async fn write_raw(&mut self, data: &str) -> Result<(), CaptureError> {
        let file = self.file.as_mut().ok_or_else(|| CaptureError::Session {
            session_id: self.session_id.clone(),
            reason: "log file is not open".to_owned(),
        })?;
        file.write_all(data.as_bytes()).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    fn rotation_state(&self) -> RotationState {
        RotationState {
            line_count: self.part_line_count,
            bytes_written: self.bytes_written,
            part_started: self.part_started,
            last_line_at: self.last_line_at,
        }
    }

    fn notify(&self, notice: SessionNotice) {
        if let Some(tx) = &self.notices
            && let Err(e) = tx.try_send(notice)
        {
            tracing::debug!(session = %self.session_id, error = %e, "session notice dropped");
        }
    }

    /// 파트 번호에 해당하는 파일 경로를 반환합니다.
    ///
    /// 파트 1은 기본 경로 그대로이고, 파트 2부터 `<base>_<NNN>.log`
    /// 형태의 0 패딩 접미사가 붙습니다.
    fn part_path(&self, part: u32) -> PathBuf {
        if part <= 1 {
            return self.base_path.clone();
        }
        let stem = self
            .base_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture".to_owned());
        let file_name = format!("{stem}_{part:03}.log");
        self.base_path.with_file_name(file_name)
    }

    fn base_file_name(&self) -> String {
        self.base_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture.log".to_owned())
    }

    // --- 조회 ---

    /// 현재 상태를 반환합니다.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 세션 누적 라인 수를 반환합니다.
    pub fn line_count(&self) -> u64 {
        self.line_count
    }

    /// 현재 파트 번호를 반환합니다.
    pub fn part(&self) -> u32 {
        self.part
    }

    /// 현재 파트에 기록된 바이트 수를 반환합니다.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// 소유 세션 ID를 반환합니다.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// 현재 기록 중인 파트의 파일 경로를 반환합니다.
    pub fn current_path(&self) -> PathBuf {
        self.part_path(self.part)
    }

    /// 최대 라인 수 도달 여부를 반환합니다.
    pub fn is_max_lines_hit(&self) -> bool {
        self.max_lines_hit
    }
}

async fn open_append(path: &Path) -> Result<File, CaptureError> {
    Ok(OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;
    use crate::format::FormatOptions;
    use crate::split::SplitRules;

    fn test_config() -> CaptureConfig {
        CaptureConfig {
            // 테스트에서 내용 검증이 쉽도록 타임스탬프 없는 포맷 사용
            format: FormatOptions {
                timestamps: false,
                categories: true,
                source_locations: false,
                elapsed: false,
            },
            ..Default::default()
        }
    }

    async fn start_session(dir: &Path, config: &CaptureConfig) -> LogSession {
        LogSession::start("run-1", dir.join("run-1.log"), config, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn start_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = start_session(dir.path(), &test_config()).await;
        session.stop().await;

        let content = std::fs::read_to_string(dir.path().join("run-1.log")).unwrap();
        assert!(content.starts_with(format::HEADER_DELIMITER));
        assert!(content.contains("session: run-1"));
        assert!(content.contains("part: 1"));
    }

    #[tokio::test]
    async fn append_line_writes_formatted_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = start_session(dir.path(), &test_config()).await;

        let written = session.append_line("hello", "stdout", None).await.unwrap();
        assert_eq!(written, vec!["[stdout] hello".to_owned()]);
        assert_eq!(session.line_count(), 1);
        session.stop().await;

        let content = std::fs::read_to_string(dir.path().join("run-1.log")).unwrap();
        assert!(content.contains("[stdout] hello\n"));
    }

    #[tokio::test]
    async fn stop_writes_footer_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = start_session(dir.path(), &test_config()).await;
        session.append_line("a", "stdout", None).await.unwrap();

        assert_eq!(session.stop().await, 1);
        assert_eq!(session.stop().await, 1); // no-op

        let content = std::fs::read_to_string(dir.path().join("run-1.log")).unwrap();
        assert_eq!(content.matches("=== SESSION END").count(), 1);
        assert!(content.contains("— 1 lines ==="));
    }

    #[tokio::test]
    async fn paused_session_ignores_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = start_session(dir.path(), &test_config()).await;

        session.pause();
        let written = session.append_line("lost", "stdout", None).await.unwrap();
        assert!(written.is_empty());
        assert_eq!(session.line_count(), 0);

        session.resume();
        let written = session.append_line("kept", "stdout", None).await.unwrap();
        assert_eq!(written.len(), 1);
        session.stop().await;
    }

    #[tokio::test]
    async fn pause_resume_are_idempotent_guards() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = start_session(dir.path(), &test_config()).await;

        session.resume(); // recording 상태에서 no-op
        assert_eq!(session.state(), SessionState::Recording);
        session.pause();
        session.pause(); // paused 상태에서 no-op
        assert_eq!(session.state(), SessionState::Paused);
        session.stop().await;
        session.pause(); // stopped 상태에서 no-op
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn dedup_groups_consecutive_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.dedup_window_ms = 60_000;
        let mut session = start_session(dir.path(), &config).await;

        session.append_line("same", "stdout", None).await.unwrap();
        let merged = session.append_line("same", "stdout", None).await.unwrap();
        assert!(merged.is_empty());
        session.append_line("same", "stdout", None).await.unwrap();
        session.stop().await;

        let content = std::fs::read_to_string(dir.path().join("run-1.log")).unwrap();
        assert!(content.contains("[stdout] same (x3)\n"));
        // 첫 발생은 즉시 기록되므로 원본 라인도 정확히 한 번 존재
        assert_eq!(content.matches("[stdout] same\n").count(), 1);
    }

    #[tokio::test]
    async fn max_lines_cap_is_sticky() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.max_lines = 5;
        let mut session = start_session(dir.path(), &config).await;

        for i in 0..6 {
            session
                .append_line(&format!("line {i}"), "stdout", None)
                .await
                .unwrap();
        }

        assert_eq!(session.line_count(), 5);
        assert!(session.is_max_lines_hit());
        // 6번째 호출은 no-op이어야 함
        let written = session.append_line("line 6", "stdout", None).await.unwrap();
        assert!(written.is_empty());
        session.stop().await;

        let content = std::fs::read_to_string(dir.path().join("run-1.log")).unwrap();
        assert_eq!(content.matches("=== MAX LINES REACHED").count(), 1);
        assert!(!content.contains("line 5")); // 0..=4만 기록됨
    }

    #[tokio::test]
    async fn clear_resets_sticky_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.max_lines = 2;
        let mut session = start_session(dir.path(), &config).await;

        session.append_line("a", "stdout", None).await.unwrap();
        session.append_line("b", "stdout", None).await.unwrap();
        assert!(session.is_max_lines_hit());

        session.clear();
        assert!(!session.is_max_lines_hit());
        let written = session.append_line("c", "stdout", None).await.unwrap();
        assert_eq!(written.len(), 1);
        session.stop().await;
    }

    #[tokio::test]
    async fn marker_bypasses_dedup_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.dedup_window_ms = 60_000;
        let mut session = start_session(dir.path(), &config).await;

        session.append_marker("=== note ===").await.unwrap();
        session.append_marker("=== note ===").await.unwrap();
        assert_eq!(session.line_count(), 2);
        session.stop().await;

        let content = std::fs::read_to_string(dir.path().join("run-1.log")).unwrap();
        // 동일 텍스트 마커가 병합되지 않고 둘 다 존재
        assert_eq!(content.matches("=== note ===\n").count(), 2);
    }

    #[tokio::test]
    async fn marker_after_stop_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = start_session(dir.path(), &test_config()).await;
        session.stop().await;
        let result = session.append_marker("late").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn split_on_line_count_rotates_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.split = SplitRules {
            max_lines: 3,
            ..Default::default()
        };
        let mut session = start_session(dir.path(), &config).await;

        for i in 0..5 {
            session
                .append_line(&format!("line {i}"), "stdout", None)
                .await
                .unwrap();
        }
        assert_eq!(session.part(), 2);
        // 누적 라인 수는 로테이션에도 유지됨
        assert_eq!(session.line_count(), 5);
        session.stop().await;

        let part1 = std::fs::read_to_string(dir.path().join("run-1.log")).unwrap();
        let part2 = std::fs::read_to_string(dir.path().join("run-1_002.log")).unwrap();

        assert!(part1.contains("=== SPLIT: lines — Continued in part 2 ==="));
        assert!(part1.contains("line 2"));
        assert!(!part1.contains("line 3"));
        // 트리거 라인은 새 파트에 기록됨
        assert!(part2.contains("line 3"));
        assert!(part2.contains("reason: lines"));
        assert!(part2.contains("continues: run-1.log"));
    }

    #[tokio::test]
    async fn split_on_keyword() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.split = SplitRules {
            keywords: vec!["CHECKPOINT".to_owned()],
            ..Default::default()
        };
        let mut session = start_session(dir.path(), &config).await;

        session.append_line("before", "stdout", None).await.unwrap();
        session
            .append_line("CHECKPOINT alpha", "stdout", None)
            .await
            .unwrap();
        session.stop().await;

        let part1 = std::fs::read_to_string(dir.path().join("run-1.log")).unwrap();
        let part2 = std::fs::read_to_string(dir.path().join("run-1_002.log")).unwrap();
        assert!(part1.contains("=== SPLIT: keyword 'CHECKPOINT'"));
        assert!(part2.contains("CHECKPOINT alpha"));
    }

    #[tokio::test]
    async fn part_path_zero_padding() {
        let dir = tempfile::tempdir().unwrap();
        let session = start_session(dir.path(), &test_config()).await;
        assert_eq!(
            session.part_path(2).file_name().unwrap().to_str().unwrap(),
            "run-1_002.log"
        );
        assert_eq!(
            session.part_path(12).file_name().unwrap().to_str().unwrap(),
            "run-1_012.log"
        );
        assert_eq!(session.part_path(1), dir.path().join("run-1.log"));
    }

    #[tokio::test]
    async fn stop_flushes_pending_dedup_group() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.dedup_window_ms = 60_000;
        let mut session = start_session(dir.path(), &config).await;

        for _ in 0..4 {
            session.append_line("same", "stdout", None).await.unwrap();
        }
        session.stop().await;

        let content = std::fs::read_to_string(dir.path().join("run-1.log")).unwrap();
        assert!(content.contains("[stdout] same (x4)\n"));
    }

    #[tokio::test]
    async fn notices_are_emitted() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = LogSession::start(
            "run-1",
            dir.path().join("run-1.log"),
            &test_config(),
            Some(tx),
        )
        .await
        .unwrap();

        session.append_line("a", "stdout", None).await.unwrap();
        session.stop().await;

        let first = rx.recv().await.unwrap();
        assert_eq!(
            first,
            SessionNotice::LineCountChanged {
                session_id: "run-1".to_owned(),
                lines: 1,
            }
        );
        let second = rx.recv().await.unwrap();
        assert_eq!(
            second,
            SessionNotice::Stopped {
                session_id: "run-1".to_owned(),
                lines: 1,
            }
        );
    }
}
