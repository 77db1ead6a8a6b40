//! 캡처 파이프라인 에러 타입
//!
//! [`CaptureError`]는 캡처 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<CaptureError> for DebugtapError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use debugtap_core::error::{DebugtapError, PipelineError};

/// 캡처 파이프라인 도메인 에러
///
/// 설정, 세션 파일 I/O, 보존 정책, 채널 통신 등 파이프라인 내부의
/// 모든 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 세션 에러 (파일 열기/쓰기 실패 등)
    #[error("session error: '{session_id}': {reason}")]
    Session {
        /// 문제가 된 세션 ID
        session_id: String,
        /// 에러 사유
        reason: String,
    },

    /// 보존 정책 집행 에러
    #[error("retention error: {path}: {reason}")]
    Retention {
        /// 문제가 된 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<CaptureError> for DebugtapError {
    fn from(err: CaptureError) -> Self {
        DebugtapError::Pipeline(PipelineError::InitFailed(err.to_string()))
    }
}
