//! 설정 관리 — debugtap.toml 파싱 및 런타임 설정
//!
//! [`DebugtapConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`DEBUGTAP_CAPTURE_LOG_DIR=/tmp/logs` 형식)
//! 2. 설정 파일 (`debugtap.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), debugtap_core::error::DebugtapError> {
//! use debugtap_core::config::DebugtapConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DebugtapConfig::load("debugtap.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DebugtapConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DebugtapError};

/// Debugtap 통합 설정
///
/// `debugtap.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugtapConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 캡처 파이프라인 설정
    #[serde(default)]
    pub capture: CaptureSection,
}

impl DebugtapConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DebugtapError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DebugtapError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DebugtapError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DebugtapError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DebugtapError> {
        toml::from_str(toml_str).map_err(|e| {
            DebugtapError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DEBUGTAP_{SECTION}_{FIELD}`
    /// 예: `DEBUGTAP_CAPTURE_LOG_DIR=/tmp/debugtap`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DEBUGTAP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DEBUGTAP_GENERAL_LOG_FORMAT");

        // Capture
        override_bool(&mut self.capture.enabled, "DEBUGTAP_CAPTURE_ENABLED");
        override_string(&mut self.capture.log_dir, "DEBUGTAP_CAPTURE_LOG_DIR");
        override_csv(
            &mut self.capture.allowed_categories,
            "DEBUGTAP_CAPTURE_ALLOWED_CATEGORIES",
        );
        override_bool(
            &mut self.capture.show_timestamps,
            "DEBUGTAP_CAPTURE_SHOW_TIMESTAMPS",
        );
        override_bool(
            &mut self.capture.show_categories,
            "DEBUGTAP_CAPTURE_SHOW_CATEGORIES",
        );
        override_bool(
            &mut self.capture.show_source_locations,
            "DEBUGTAP_CAPTURE_SHOW_SOURCE_LOCATIONS",
        );
        override_bool(
            &mut self.capture.show_elapsed,
            "DEBUGTAP_CAPTURE_SHOW_ELAPSED",
        );
        override_usize(
            &mut self.capture.max_log_files,
            "DEBUGTAP_CAPTURE_MAX_LOG_FILES",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DebugtapError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.capture.enabled {
            if self.capture.log_dir.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "capture.log_dir".to_owned(),
                    reason: "log_dir must not be empty when capture is enabled".to_owned(),
                }
                .into());
            }

            if self.capture.allowed_categories.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "capture.allowed_categories".to_owned(),
                    reason: "at least one category must be allowed when capture is enabled"
                        .to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 캡처 파이프라인 설정 섹션
///
/// 파이프라인 전용 확장 설정은 `debugtap-capture` 크레이트의
/// `CaptureConfig`가 이 섹션을 기반으로 제공합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSection {
    /// 활성화 여부
    pub enabled: bool,
    /// 로그 파일 디렉토리
    pub log_dir: String,
    /// 허용 카테고리 목록 — 이외의 카테고리 이벤트는 드롭됩니다
    pub allowed_categories: Vec<String>,
    /// 라인에 타임스탬프 프리픽스 포함 여부
    pub show_timestamps: bool,
    /// 라인에 카테고리 프리픽스 포함 여부
    pub show_categories: bool,
    /// 라인에 소스 위치 프리픽스 포함 여부
    pub show_source_locations: bool,
    /// 라인에 세션 시작 후 경과 시간 프리픽스 포함 여부
    pub show_elapsed: bool,
    /// 보존할 최대 로그 파일 수 (0 = 무제한)
    pub max_log_files: usize,
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: "/var/lib/debugtap/logs".to_owned(),
            allowed_categories: vec![
                "console".to_owned(),
                "stdout".to_owned(),
                "stderr".to_owned(),
                "important".to_owned(),
            ],
            show_timestamps: true,
            show_categories: true,
            show_source_locations: false,
            show_elapsed: false,
            max_log_files: 20,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        *target = value;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => *target = true,
            "false" | "0" | "no" => *target = false,
            other => warn!(env = env_key, value = other, "invalid bool override, ignored"),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(env = env_key, value = %value, "invalid usize override, ignored"),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        *target = value
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
