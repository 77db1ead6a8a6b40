//! 세션 매니저 -- 파이프라인 최상위 오케스트레이터
//!
//! 외부 세션 ID를 [`LogSession`]에 매핑하고, 자식 세션을 부모의 세션에
//! 별칭으로 연결하며, 이벤트마다 제외 -> 플러드 -> 기록 -> 워치 ->
//! 브로드캐스트 순서의 파이프라인을 실행합니다.
//!
//! # 내부 아키텍처
//! ```text
//! OutputEvent -> category gate -> alias lookup -> ExclusionMatcher
//!             -> FloodGuard -> LogSession(append) -> KeywordWatcher
//!             -> LineEvent broadcast (mpsc, 등록 순서)
//! ```
//!
//! 모든 변경 진입점은 `&mut self`이므로 매니저 인스턴스당 이벤트는
//! 한 번에 하나씩 처리됩니다. 서로 다른 매니저 인스턴스는 상태를
//! 공유하지 않습니다.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc;

use debugtap_core::error::{DebugtapError, PipelineError};
use debugtap_core::event::{LineEvent, MODULE_CAPTURE, OutputEvent};
use debugtap_core::metrics as m;
use debugtap_core::pipeline::{HealthStatus, Pipeline};
use debugtap_core::types::LineRecord;

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::exclude::ExclusionMatcher;
use crate::flood::{FloodGuard, FloodVerdict};
use crate::format;
use crate::retention::FileRetentionEnforcer;
use crate::session::{LogSession, SessionNotice, SessionState};
use crate::watch::KeywordWatcher;

/// 매니저 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum ManagerState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 세션 매니저
///
/// 소유 세션 ID -> [`LogSession`] 맵과 별칭 맵을 관리하며,
/// 세션별 플러드 가드와 파이프라인 공용 제외 매처/키워드 워처를
/// 소유합니다.
pub struct SessionManager {
    /// 파이프라인 설정
    config: CaptureConfig,
    /// 현재 상태
    state: ManagerState,
    /// 소유 세션 ID -> 세션
    sessions: HashMap<String, LogSession>,
    /// 모든 세션 ID -> 소유 세션 ID (소유자는 자기 자신으로 매핑)
    aliases: HashMap<String, String>,
    /// 소유 세션 ID -> 플러드 가드
    floods: HashMap<String, FloodGuard>,
    /// 제외 매처
    exclusion: ExclusionMatcher,
    /// 키워드 워처
    watcher: KeywordWatcher,
    /// 보존 정책 집행기
    retention: FileRetentionEnforcer,
    /// 등록된 리스너 (등록 순서 유지)
    listeners: Vec<mpsc::Sender<LineEvent>>,
    /// 세션 통지 채널 송신측 (세션에 복제하여 전달)
    notice_tx: mpsc::Sender<SessionNotice>,
    /// 처리된 이벤트 카운터
    processed_count: u64,
    /// 드롭된 이벤트 카운터
    dropped_count: u64,
}

impl SessionManager {
    /// 세션을 시작합니다.
    ///
    /// `parent`가 이미 세션을 소유하고 있으면 `id`를 같은 세션에 별칭으로
    /// 연결합니다 (새 파일 없음). 그렇지 않으면 새 [`LogSession`]을 만들어
    /// 시작하고 보존 정책 하우스키핑을 수행합니다.
    pub async fn start_session(
        &mut self,
        id: &str,
        parent: Option<&str>,
    ) -> Result<(), CaptureError> {
        if self.aliases.contains_key(id) {
            tracing::debug!(session = id, "session already started, ignoring");
            return Ok(());
        }

        // 부모가 세션을 소유하면 별칭만 추가 — 두 번째 파일은 절대 만들지 않음
        if let Some(parent_id) = parent
            && let Some(owner) = self.aliases.get(parent_id).cloned()
            && self.sessions.contains_key(&owner)
        {
            self.aliases.insert(id.to_owned(), owner.clone());
            tracing::debug!(session = id, owner = %owner, "child session aliased to parent");
            return Ok(());
        }

        let base_path = self.new_session_path(id);
        let session = LogSession::start(id, base_path, &self.config, Some(self.notice_tx.clone()))
            .await?;

        self.aliases.insert(id.to_owned(), id.to_owned());
        self.sessions.insert(id.to_owned(), session);
        self.floods.insert(
            id.to_owned(),
            FloodGuard::new(
                self.config.flood_threshold,
                Duration::from_millis(self.config.flood_window_ms),
                Duration::from_millis(self.config.flood_sample_interval_ms),
            ),
        );
        metrics::gauge!(m::CAPTURE_OPEN_SESSIONS).set(self.sessions.len() as f64);

        // 세션 간 하우스키핑 — 실패해도 캡처는 계속됩니다
        if self.config.max_log_files > 0 {
            if let Err(e) = self
                .retention
                .enforce(Path::new(&self.config.log_dir), self.config.max_log_files)
                .await
            {
                tracing::warn!(error = %e, "retention enforcement failed");
            }
        }

        Ok(())
    }

    /// 출력 이벤트 하나를 파이프라인에 통과시킵니다.
    ///
    /// 허용되지 않은 카테고리와 알 수 없는 세션의 이벤트는 조용히
    /// 드롭됩니다 (세션 시작/정지와 이벤트 전달 사이의 경합은 정상
    /// 상황입니다). 파일 I/O 에러가 발생하면 해당 세션의 캡처만 포기하고
    /// 다른 세션에는 영향을 주지 않습니다.
    pub async fn on_output_event(&mut self, event: &OutputEvent) {
        if !self
            .config
            .allowed_categories
            .iter()
            .any(|c| c == &event.category)
        {
            self.dropped_count += 1;
            metrics::counter!(m::CAPTURE_EVENTS_DROPPED_TOTAL, m::LABEL_REASON => "category")
                .increment(1);
            return;
        }

        let Some(owner) = self.aliases.get(&event.session_id).cloned() else {
            tracing::debug!(session = %event.session_id, "event for unknown session dropped");
            self.dropped_count += 1;
            metrics::counter!(m::CAPTURE_EVENTS_DROPPED_TOTAL, m::LABEL_REASON => "unknown_session")
                .increment(1);
            return;
        };

        if self.exclusion.is_excluded(&event.text) {
            self.dropped_count += 1;
            metrics::counter!(m::CAPTURE_EVENTS_DROPPED_TOTAL, m::LABEL_REASON => "excluded")
                .increment(1);
            return;
        }

        let verdict = match self.floods.get_mut(&owner) {
            Some(guard) => guard.check(&event.text),
            None => FloodVerdict {
                allow: true,
                suppressed: None,
            },
        };

        let Some(session) = self.sessions.get_mut(&owner) else {
            // 캡처가 포기된 세션 — 별칭은 남아 있지만 이벤트는 드롭
            self.dropped_count += 1;
            return;
        };

        let mut records: Vec<LineRecord> = Vec::new();
        let mut failure: Option<CaptureError> = None;
        let mut accepted = false;

        // 방금 닫힌 억제 윈도우는 합성 시스템 라인으로 보고
        if let Some(suppressed) = verdict.suppressed {
            metrics::counter!(m::CAPTURE_FLOOD_SUPPRESSED_TOTAL).increment(suppressed);
            match session.append_marker(&format::flood_marker(suppressed)).await {
                Ok(Some(text)) => records.push(LineRecord::marker(text, session.line_count())),
                Ok(None) => {}
                Err(e) => failure = Some(e),
            }
        }

        if failure.is_none() && verdict.allow {
            accepted =
                session.state() == SessionState::Recording && !session.is_max_lines_hit();
            match session
                .append_line(&event.text, &event.category, event.source.as_ref())
                .await
            {
                Ok(written) => {
                    let total = session.line_count();
                    let count = written.len() as u64;
                    for (i, text) in written.into_iter().enumerate() {
                        let line_no = total - (count - 1 - i as u64);
                        records.push(LineRecord::new(text, event.category.as_str(), line_no));
                    }
                }
                Err(e) => failure = Some(e),
            }
        }

        if let Some(e) = failure {
            self.abandon_session(&owner, &e);
            return;
        }

        if verdict.allow {
            self.processed_count += 1;
        }

        // 워치 평가는 브로드캐스트 경로에 도달한 텍스트에 대해서만 수행
        let hits = if accepted {
            self.watcher.test_line(&event.text)
        } else {
            Vec::new()
        };

        // 마지막 레코드가 현재 이벤트의 라인 — 워치/소스 정보를 붙입니다
        // (중복 요약 라인과 마커는 이전 텍스트에 속하므로 제외)
        if let Some(last) = records.last_mut()
            && !last.marker
        {
            last.watch_hits = hits;
            last.source = event.source.clone();
        }

        for record in records {
            let line_event =
                LineEvent::with_trace(owner.clone(), record, event.metadata.trace_id.clone());
            self.broadcast(line_event);
        }
    }

    /// 세션을 정지합니다.
    ///
    /// 별칭을 제거하고, 소유 세션 ID인 경우에만 실제로 [`LogSession`]을
    /// 정지/마무리합니다. 자식 세션의 정지는 부모의 로그를 건드리지 않는
    /// 조용한 no-op입니다.
    pub async fn stop_session(&mut self, id: &str) {
        let Some(owner) = self.aliases.remove(id) else {
            tracing::debug!(session = id, "stop for unknown session ignored");
            return;
        };

        if owner != id {
            tracing::debug!(session = id, owner = %owner, "non-owner stop is a no-op");
            return;
        }

        // 이 소유자를 가리키는 남은 자식 별칭도 정리
        self.aliases.retain(|_, o| o != &owner);

        if let Some(mut session) = self.sessions.remove(&owner) {
            session.stop().await;
        }
        self.floods.remove(&owner);
        metrics::gauge!(m::CAPTURE_OPEN_SESSIONS).set(self.sessions.len() as f64);
    }

    /// 모든 세션을 정지합니다 (teardown).
    pub async fn stop_all(&mut self) {
        let owners: Vec<String> = self.sessions.keys().cloned().collect();
        for owner in owners {
            self.stop_session(&owner).await;
        }
        self.aliases.clear();
    }

    /// 리스너를 등록하고 라인 이벤트 수신 채널을 반환합니다.
    ///
    /// 브로드캐스트는 등록 순서대로 수행됩니다. 채널이 가득 찬 리스너는
    /// 해당 라인을 놓치고, 닫힌 리스너는 목록에서 제거됩니다 — 잘못된
    /// 소비자 하나가 캡처를 망가뜨릴 수 없습니다.
    pub fn subscribe(&mut self) -> mpsc::Receiver<LineEvent> {
        let (tx, rx) = mpsc::channel(self.config.listener_channel_capacity);
        self.listeners.push(tx);
        rx
    }

    /// 파일 I/O 에러가 발생한 세션의 캡처를 포기합니다.
    ///
    /// 다른 세션은 영향을 받지 않습니다. 별칭은 남겨 두어 이후 이벤트가
    /// 조용히 드롭되도록 합니다.
    fn abandon_session(&mut self, owner: &str, err: &CaptureError) {
        tracing::error!(session = owner, error = %err, "capture abandoned for session");
        self.sessions.remove(owner);
        self.floods.remove(owner);
        metrics::gauge!(m::CAPTURE_OPEN_SESSIONS).set(self.sessions.len() as f64);
    }

    fn broadcast(&mut self, event: LineEvent) {
        self.listeners.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("listener channel full, line event dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// 새 세션의 파트 1 파일 경로를 만듭니다.
    fn new_session_path(&self, id: &str) -> PathBuf {
        let sanitized: String = id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        let file_name = format!("{sanitized}_{}.log", Local::now().format("%Y%m%d_%H%M%S"));
        Path::new(&self.config.log_dir).join(file_name)
    }

    // --- 조회 ---

    /// 현재 열려 있는 세션 수를 반환합니다.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// `id`가 세션을 소유하고 있는지 확인합니다.
    pub fn is_owner(&self, id: &str) -> bool {
        self.aliases.get(id).is_some_and(|owner| owner == id)
    }

    /// `id`(별칭 포함)에 연결된 세션이 있는지 확인합니다.
    pub fn has_session(&self, id: &str) -> bool {
        self.aliases
            .get(id)
            .is_some_and(|owner| self.sessions.contains_key(owner))
    }

    /// `id`에 연결된 세션이 현재 기록 중인 파일 경로를 반환합니다.
    pub fn session_file(&self, id: &str) -> Option<PathBuf> {
        let owner = self.aliases.get(id)?;
        self.sessions.get(owner).map(LogSession::current_path)
    }

    /// `id`에 연결된 세션의 누적 라인 수를 반환합니다.
    pub fn session_line_count(&self, id: &str) -> Option<u64> {
        let owner = self.aliases.get(id)?;
        self.sessions.get(owner).map(LogSession::line_count)
    }

    /// 처리된 이벤트 수를 반환합니다.
    pub fn processed_count(&self) -> u64 {
        self.processed_count
    }

    /// 드롭된 이벤트 수를 반환합니다.
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// 워치 레이블별 누적 매칭 횟수를 반환합니다.
    pub fn watch_counts(&self) -> &HashMap<String, u64> {
        self.watcher.counts()
    }

    /// 워치 카운터를 초기화합니다.
    pub fn reset_watch_counts(&mut self) {
        self.watcher.reset_counts();
    }

    /// 현재 상태를 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            ManagerState::Initialized => "initialized",
            ManagerState::Running => "running",
            ManagerState::Stopped => "stopped",
        }
    }
}

impl Pipeline for SessionManager {
    fn name(&self) -> &str {
        MODULE_CAPTURE
    }

    async fn start(&mut self) -> Result<(), DebugtapError> {
        if self.state == ManagerState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        tokio::fs::create_dir_all(&self.config.log_dir)
            .await
            .map_err(DebugtapError::Io)?;

        self.state = ManagerState::Running;
        tracing::info!(log_dir = %self.config.log_dir, "capture pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DebugtapError> {
        if self.state != ManagerState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!("stopping capture pipeline");
        self.stop_all().await;
        self.state = ManagerState::Stopped;
        tracing::info!("capture pipeline stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ManagerState::Running => HealthStatus::Healthy,
            ManagerState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ManagerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 세션 매니저 빌더
///
/// 매니저를 구성하고 세션 통지 채널을 생성합니다.
pub struct SessionManagerBuilder {
    config: CaptureConfig,
}

impl SessionManagerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: CaptureConfig::default(),
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: CaptureConfig) -> Self {
        self.config = config;
        self
    }

    /// 매니저를 빌드합니다.
    ///
    /// # Returns
    /// - `SessionManager`: 매니저 인스턴스
    /// - `mpsc::Receiver<SessionNotice>`: 세션 통지 수신 채널
    pub fn build(self) -> Result<(SessionManager, mpsc::Receiver<SessionNotice>), CaptureError> {
        self.config.validate()?;

        let (notice_tx, notice_rx) = mpsc::channel(self.config.notice_channel_capacity);
        let exclusion = ExclusionMatcher::compile(&self.config.exclusions);
        let watcher = KeywordWatcher::new(&self.config.watches);

        let manager = SessionManager {
            config: self.config,
            state: ManagerState::Initialized,
            sessions: HashMap::new(),
            aliases: HashMap::new(),
            floods: HashMap::new(),
            exclusion,
            watcher,
            retention: FileRetentionEnforcer::new(),
            listeners: Vec::new(),
            notice_tx,
            processed_count: 0,
            dropped_count: 0,
        };

        Ok((manager, notice_rx))
    }
}

impl Default for SessionManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
