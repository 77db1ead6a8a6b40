//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 캡처 파이프라인과 이를 소비하는 쪽(뷰어, 상태 표시)이 공유하는
//! 데이터 구조를 정의합니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 소스 위치 — 출력 이벤트가 발생한 소스 파일과 라인
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// 소스 파일 경로
    pub path: String,
    /// 라인 번호 (1부터 시작)
    pub line: u32,
}

impl SourceLocation {
    /// 새 소스 위치를 생성합니다.
    pub fn new(path: impl Into<String>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

/// 워치 패턴 매칭 결과
///
/// 한 라인이 여러 워치 패턴에 동시에 매칭될 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchHit {
    /// 매칭된 워치 패턴의 레이블
    pub label: String,
    /// 알림 종류
    pub kind: AlertKind,
}

impl fmt::Display for WatchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.kind)
    }
}

/// 워치 알림 종류
///
/// `Ord` 구현으로 종류 비교가 가능합니다 (`Notice < Warning < Error`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// 정보성 알림
    #[default]
    Notice,
    /// 경고
    Warning,
    /// 에러 — 즉시 확인 필요
    Error,
}

impl AlertKind {
    /// 문자열에서 알림 종류를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "notice" | "info" => Some(Self::Notice),
            "warning" | "warn" => Some(Self::Warning),
            "error" | "err" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notice => write!(f, "notice"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// 라인 레코드 — 리스너에게 브로드캐스트되는 단위
///
/// 파일에 기록된 한 라인의 구조화된 표현입니다.
/// 생성 이후 절대 변경되지 않으며, 한 세션 내에서는 파일에 기록된
/// 순서 그대로 브로드캐스트됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRecord {
    /// 포맷이 적용된 라인 텍스트
    pub text: String,
    /// 출력 카테고리 (console, stdout, stderr 등)
    pub category: String,
    /// 마커 라인 여부 (구분선, 시스템 안내 등)
    pub marker: bool,
    /// 기록 시점의 누적 라인 수
    pub line_no: u64,
    /// 기록 시각
    pub timestamp: SystemTime,
    /// 소스 위치 (알려진 경우)
    pub source: Option<SourceLocation>,
    /// 이 라인에 매칭된 워치 패턴 목록
    pub watch_hits: Vec<WatchHit>,
}

impl LineRecord {
    /// 일반 라인 레코드를 생성합니다.
    pub fn new(text: impl Into<String>, category: impl Into<String>, line_no: u64) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            marker: false,
            line_no,
            timestamp: SystemTime::now(),
            source: None,
            watch_hits: Vec::new(),
        }
    }

    /// 마커 라인 레코드를 생성합니다.
    pub fn marker(text: impl Into<String>, line_no: u64) -> Self {
        Self {
            text: text.into(),
            category: "system".to_owned(),
            marker: true,
            line_no,
            timestamp: SystemTime::now(),
            source: None,
            watch_hits: Vec::new(),
        }
    }

    /// 소스 위치를 설정합니다.
    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    /// 워치 매칭 결과를 설정합니다.
    pub fn with_watch_hits(mut self, hits: Vec<WatchHit>) -> Self {
        self.watch_hits = hits;
        self
    }
}

impl fmt::Display for LineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} [{}] {}", self.line_no, self.category, self.text)
    }
}
