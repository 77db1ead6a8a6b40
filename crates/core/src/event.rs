//! 이벤트 시스템 — 파이프라인 경계를 넘는 통신의 기본 단위
//!
//! 디버그 이벤트 소스에서 들어오는 [`OutputEvent`]와 리스너에게
//! 브로드캐스트되는 [`LineEvent`]를 정의합니다.
//! [`EventMetadata`]는 모든 이벤트에 공통으로 포함되는 메타데이터이며,
//! [`Event`] trait은 모든 이벤트 타입이 구현해야 하는 인터페이스입니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::{LineRecord, SourceLocation};

// --- 모듈명 상수 ---

/// 캡처 파이프라인 모듈명
pub const MODULE_CAPTURE: &str = "capture-pipeline";
/// 디버그 이벤트 소스 모듈명 (외부 협력자)
pub const MODULE_DEBUG_SOURCE: &str = "debug-source";

// --- 이벤트 타입 상수 ---

/// 원시 출력 이벤트 타입
pub const EVENT_TYPE_OUTPUT: &str = "output";
/// 라인 레코드 이벤트 타입
pub const EVENT_TYPE_LINE: &str = "line";

/// 이벤트 메타데이터 — 모든 이벤트에 공통으로 포함되는 추적 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명
    pub source_module: String,
    /// 분산 추적 ID — 같은 흐름의 이벤트를 연결합니다
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// 새로운 UUID v4 trace_id를 생성하여 메타데이터를 만듭니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source={} trace={}", self.source_module, self.trace_id)
    }
}

/// 모든 이벤트가 구현해야 하는 기본 trait
///
/// `Send + Sync + 'static` 바운드로 `tokio::mpsc` 채널을 통한
/// 안전한 전송을 보장합니다.
pub trait Event: Send + Sync + 'static {
    /// 이벤트 고유 ID (UUID v4)
    fn event_id(&self) -> &str;

    /// 이벤트 메타데이터 (timestamp, source_module, trace_id)
    fn metadata(&self) -> &EventMetadata;

    /// 이벤트 타입명 (로깅 및 라우팅에 사용)
    fn event_type(&self) -> &str;
}

/// 디버그 이벤트 소스에서 들어오는 원시 출력 이벤트
///
/// 세션 식별자, 카테고리, 텍스트, 선택적 소스 위치를 담습니다.
/// 파이프라인에 진입하기 전의 가공되지 않은 형태입니다.
#[derive(Debug, Clone)]
pub struct OutputEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 외부 세션 식별자
    pub session_id: String,
    /// 출력 카테고리 (console, stdout, stderr 등)
    pub category: String,
    /// 출력 텍스트 (개행 제외)
    pub text: String,
    /// 소스 위치 (알려진 경우)
    pub source: Option<SourceLocation>,
}

impl OutputEvent {
    /// 새로운 trace를 시작하는 출력 이벤트를 생성합니다.
    pub fn new(
        session_id: impl Into<String>,
        category: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::with_new_trace(MODULE_DEBUG_SOURCE),
            session_id: session_id.into(),
            category: category.into(),
            text: text.into(),
            source: None,
        }
    }

    /// 소스 위치를 설정합니다.
    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }
}

impl Event for OutputEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_OUTPUT
    }
}

/// 리스너에게 브로드캐스트되는 라인 이벤트
///
/// 파일에 기록된 [`LineRecord`]를 이벤트 메타데이터와 함께 감쌉니다.
/// 원본 출력 이벤트의 trace_id를 이어받아 흐름 추적이 가능합니다.
#[derive(Debug, Clone)]
pub struct LineEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 소유 세션 식별자
    pub session_id: String,
    /// 기록된 라인 레코드
    pub record: LineRecord,
}

impl LineEvent {
    /// 새로운 trace를 시작하는 라인 이벤트를 생성합니다.
    pub fn new(session_id: impl Into<String>, record: LineRecord) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::with_new_trace(MODULE_CAPTURE),
            session_id: session_id.into(),
            record,
        }
    }

    /// 기존 trace에 연결된 라인 이벤트를 생성합니다.
    pub fn with_trace(
        session_id: impl Into<String>,
        record: LineRecord,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_CAPTURE, trace_id),
            session_id: session_id.into(),
            record,
        }
    }
}

impl Event for LineEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_LINE
    }
}
