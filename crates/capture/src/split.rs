//! 파일 분할 평가 -- 로테이션 규칙의 순수 평가기
//!
//! [`FileSplitter`]는 자체 가변 상태 없이 (미리 컴파일된 키워드 패턴
//! 제외) 주어진 [`RotationState`]만으로 분할 여부와 사유를 판정합니다.
//!
//! # 판정 우선순위
//! 여러 임계값이 동시에 넘어도 사유는 하나입니다 (첫 매칭 우선):
//! lines > size > duration > silence > keyword

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::pattern::LinePattern;

/// 분할 사유
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitReason {
    /// 파트당 최대 라인 수 초과
    Lines,
    /// 파트당 최대 크기 초과
    Size,
    /// 파트 최대 지속 시간 초과
    Duration,
    /// 무출력 시간 초과
    Silence,
    /// 키워드 매칭 (매칭된 원본 키워드 포함)
    Keyword(String),
}

impl SplitReason {
    /// 메트릭 레이블용 고정 문자열을 반환합니다.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Lines => "lines",
            Self::Size => "size",
            Self::Duration => "duration",
            Self::Silence => "silence",
            Self::Keyword(_) => "keyword",
        }
    }
}

impl fmt::Display for SplitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lines => write!(f, "lines"),
            Self::Size => write!(f, "size"),
            Self::Duration => write!(f, "duration"),
            Self::Silence => write!(f, "silence"),
            Self::Keyword(keyword) => write!(f, "keyword '{keyword}'"),
        }
    }
}

/// 분할 규칙 설정
///
/// 0 또는 빈 목록은 해당 규칙 비활성을 의미합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitRules {
    /// 파트당 최대 라인 수
    pub max_lines: u64,
    /// 파트당 최대 크기 (KB)
    pub max_size_kb: u64,
    /// 파트 최대 지속 시간 (분)
    pub max_duration_mins: u64,
    /// 무출력 분할 시간 (분)
    pub silence_mins: u64,
    /// 분할 트리거 키워드 (리터럴 또는 `/정규식/플래그`)
    pub keywords: Vec<String>,
}

/// 현재 파트의 로테이션 카운터
///
/// [`FileSplitter::evaluate`]가 필요로 하는 최소한의 상태입니다.
/// 라인/바이트 카운터는 로테이션 경계에서 0으로 초기화됩니다
/// (세션 누적 라인 수는 `LogSession`이 별도로 유지합니다).
#[derive(Debug, Clone)]
pub struct RotationState {
    /// 현재 파트에 기록된 라인 수
    pub line_count: u64,
    /// 현재 파트에 기록된 바이트 수
    pub bytes_written: u64,
    /// 현재 파트 시작 시각
    pub part_started: Instant,
    /// 마지막 라인 기록 시각 (아직 없으면 None)
    pub last_line_at: Option<Instant>,
}

impl RotationState {
    /// 새 파트의 초기 상태를 생성합니다.
    pub fn fresh() -> Self {
        Self {
            line_count: 0,
            bytes_written: 0,
            part_started: Instant::now(),
            last_line_at: None,
        }
    }
}

/// 파일 분할 평가기
///
/// 키워드 패턴은 생성 시 한 번만 컴파일됩니다. 유효하지 않은 패턴은
/// 경고 로그와 함께 드롭됩니다.
#[derive(Debug)]
pub struct FileSplitter {
    /// 분할 규칙
    rules: SplitRules,
    /// (원본 키워드, 컴파일된 패턴) 목록
    keyword_patterns: Vec<(String, LinePattern)>,
}

impl FileSplitter {
    /// 분할 규칙에서 평가기를 생성합니다.
    pub fn new(rules: SplitRules) -> Self {
        let keyword_patterns: Vec<(String, LinePattern)> = rules
            .keywords
            .iter()
            .filter_map(|raw| LinePattern::parse(raw).map(|p| (raw.clone(), p)))
            .collect();

        if keyword_patterns.len() < rules.keywords.len() {
            tracing::warn!(
                configured = rules.keywords.len(),
                active = keyword_patterns.len(),
                "some split keywords were invalid and dropped"
            );
        }

        Self {
            rules,
            keyword_patterns,
        }
    }

    /// 활성화된 규칙이 하나라도 있는지 확인합니다.
    ///
    /// 규칙이 없으면 `evaluate()`는 아무 작업 없이 즉시 반환합니다.
    pub fn has_active_rules(&self) -> bool {
        self.rules.max_lines > 0
            || self.rules.max_size_kb > 0
            || self.rules.max_duration_mins > 0
            || self.rules.silence_mins > 0
            || !self.keyword_patterns.is_empty()
    }

    /// 현재 상태와 (있다면) 현재 라인에 대해 분할 여부를 판정합니다.
    pub fn evaluate(
        &self,
        state: &RotationState,
        current_line: Option<&str>,
    ) -> Option<SplitReason> {
        if !self.has_active_rules() {
            return None;
        }

        if self.rules.max_lines > 0 && state.line_count >= self.rules.max_lines {
            return Some(SplitReason::Lines);
        }

        if self.rules.max_size_kb > 0 && state.bytes_written / 1024 >= self.rules.max_size_kb {
            return Some(SplitReason::Size);
        }

        if self.rules.max_duration_mins > 0
            && state.part_started.elapsed().as_secs() / 60 >= self.rules.max_duration_mins
        {
            return Some(SplitReason::Duration);
        }

        if self.rules.silence_mins > 0
            && let Some(last_line_at) = state.last_line_at
            && last_line_at.elapsed().as_secs() / 60 >= self.rules.silence_mins
        {
            return Some(SplitReason::Silence);
        }

        if let Some(line) = current_line {
            for (raw, pattern) in &self.keyword_patterns {
                if pattern.is_match(line) {
                    return Some(SplitReason::Keyword(raw.clone()));
                }
            }
        }

        None
    }
}
