//! 캡처 파이프라인 설정
//!
//! [`CaptureConfig`]는 core의 [`CaptureSection`](debugtap_core::config::CaptureSection)을
//! 기반으로 캡처 파이프라인 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use debugtap_core::config::DebugtapConfig;
//! use debugtap_capture::config::CaptureConfig;
//!
//! let core_config = DebugtapConfig::default();
//! let config = CaptureConfig::from_core(&core_config.capture);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::format::FormatOptions;
use crate::split::SplitRules;
use crate::watch::WatchSpec;

/// 캡처 파이프라인 설정
///
/// core의 `CaptureSection`에서 파생되며, 파이프라인 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 로그 파일 디렉토리
    pub log_dir: String,
    /// 허용 카테고리 목록 — 이외의 카테고리 이벤트는 드롭됩니다
    pub allowed_categories: Vec<String>,
    /// 라인 프리픽스 구성
    pub format: FormatOptions,
    /// 보존할 최대 로그 파일 수 (0 = 무제한)
    pub max_log_files: usize,

    // --- 확장 설정 (core 섹션에 없는 추가 필드) ---
    /// 제외 패턴 목록
    pub exclusions: Vec<String>,
    /// 워치 패턴 목록
    pub watches: Vec<WatchSpec>,
    /// 중복 제거 병합 윈도우 (밀리초)
    pub dedup_window_ms: u64,
    /// 플러드 억제 진입 임계값
    pub flood_threshold: u32,
    /// 플러드 반복 추적 윈도우 (밀리초)
    pub flood_window_ms: u64,
    /// 플러드 억제 중 샘플 통과 간격 (밀리초)
    pub flood_sample_interval_ms: u64,
    /// 세션당 최대 캡처 라인 수 (0 = 무제한)
    pub max_lines: u64,
    /// 파일 분할 규칙
    pub split: SplitRules,
    /// 리스너 채널 용량
    pub listener_channel_capacity: usize,
    /// 세션 통지 채널 용량
    pub notice_channel_capacity: usize,
}

impl Default for CaptureConfig {
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
            format: FormatOptions::default(),
            max_log_files: 20,
            exclusions: Vec::new(),
            watches: Vec::new(),
            dedup_window_ms: 500,
            flood_threshold: 100,
            flood_window_ms: 1_000,
            flood_sample_interval_ms: 1_000,
            max_lines: 0,
            split: SplitRules::default(),
            listener_channel_capacity: 256,
            notice_channel_capacity: 256,
        }
    }
}

impl CaptureConfig {
    /// core의 `CaptureSection`에서 파이프라인 설정을 생성합니다.
    ///
    /// core 섹션에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &debugtap_core::config::CaptureSection) -> Self {
        Self {
            enabled: core.enabled,
            log_dir: core.log_dir.clone(),
            allowed_categories: core.allowed_categories.clone(),
            format: FormatOptions {
                timestamps: core.show_timestamps,
                categories: core.show_categories,
                source_locations: core.show_source_locations,
                elapsed: core.show_elapsed,
            },
            max_log_files: core.max_log_files,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CaptureError> {
        const MAX_DEDUP_WINDOW_MS: u64 = 60_000; // 1 minute
        const MAX_FLOOD_WINDOW_MS: u64 = 60_000;

        if self.enabled && self.log_dir.is_empty() {
            return Err(CaptureError::Config {
                field: "log_dir".to_owned(),
                reason: "must not be empty when capture is enabled".to_owned(),
            });
        }

        if self.enabled && self.allowed_categories.is_empty() {
            return Err(CaptureError::Config {
                field: "allowed_categories".to_owned(),
                reason: "at least one category must be allowed".to_owned(),
            });
        }

        if self.dedup_window_ms > MAX_DEDUP_WINDOW_MS {
            return Err(CaptureError::Config {
                field: "dedup_window_ms".to_owned(),
                reason: format!("must be 0-{MAX_DEDUP_WINDOW_MS}"),
            });
        }

        if self.flood_threshold == 0 {
            return Err(CaptureError::Config {
                field: "flood_threshold".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.flood_window_ms == 0 || self.flood_window_ms > MAX_FLOOD_WINDOW_MS {
            return Err(CaptureError::Config {
                field: "flood_window_ms".to_owned(),
                reason: format!("must be 1-{MAX_FLOOD_WINDOW_MS}"),
            });
        }

        if self.flood_sample_interval_ms == 0 {
            return Err(CaptureError::Config {
                field: "flood_sample_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.listener_channel_capacity == 0 {
            return Err(CaptureError::Config {
                field: "listener_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.notice_channel_capacity == 0 {
            return Err(CaptureError::Config {
                field: "notice_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 캡처 설정 빌더
///
/// 설정 필드가 많으므로 빌더 패턴을 사용합니다.
#[derive(Default)]
pub struct CaptureConfigBuilder {
    config: CaptureConfig,
}

impl CaptureConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 로그 디렉토리를 설정합니다.
    pub fn log_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    /// 허용 카테고리를 설정합니다.
    pub fn allowed_categories(mut self, categories: Vec<String>) -> Self {
        self.config.allowed_categories = categories;
        self
    }

    /// 라인 프리픽스 구성을 설정합니다.
    pub fn format(mut self, format: FormatOptions) -> Self {
        self.config.format = format;
        self
    }

    /// 보존할 최대 로그 파일 수를 설정합니다.
    pub fn max_log_files(mut self, max: usize) -> Self {
        self.config.max_log_files = max;
        self
    }

    /// 제외 패턴을 설정합니다.
    pub fn exclusions(mut self, patterns: Vec<String>) -> Self {
        self.config.exclusions = patterns;
        self
    }

    /// 워치 패턴을 설정합니다.
    pub fn watches(mut self, watches: Vec<WatchSpec>) -> Self {
        self.config.watches = watches;
        self
    }

    /// 중복 제거 윈도우(밀리초)를 설정합니다.
    pub fn dedup_window_ms(mut self, ms: u64) -> Self {
        self.config.dedup_window_ms = ms;
        self
    }

    /// 플러드 임계값을 설정합니다.
    pub fn flood_threshold(mut self, threshold: u32) -> Self {
        self.config.flood_threshold = threshold;
        self
    }

    /// 플러드 윈도우(밀리초)를 설정합니다.
    pub fn flood_window_ms(mut self, ms: u64) -> Self {
        self.config.flood_window_ms = ms;
        self
    }

    /// 플러드 샘플 간격(밀리초)을 설정합니다.
    pub fn flood_sample_interval_ms(mut self, ms: u64) -> Self {
        self.config.flood_sample_interval_ms = ms;
        self
    }

    /// 세션당 최대 라인 수를 설정합니다.
    pub fn max_lines(mut self, max: u64) -> Self {
        self.config.max_lines = max;
        self
    }

    /// 파일 분할 규칙을 설정합니다.
    pub fn split(mut self, rules: SplitRules) -> Self {
        self.config.split = rules;
        self
    }

    /// 설정을 검증하고 `CaptureConfig`를 생성합니다.
    pub fn build(self) -> Result<CaptureConfig, CaptureError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CaptureConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = debugtap_core::config::CaptureSection {
            enabled: true,
            log_dir: "/tmp/debugtap".to_owned(),
            allowed_categories: vec!["stdout".to_owned()],
            show_timestamps: false,
            show_categories: true,
            show_source_locations: true,
            show_elapsed: false,
            max_log_files: 7,
        };
        let config = CaptureConfig::from_core(&core);
        assert_eq!(config.log_dir, "/tmp/debugtap");
        assert_eq!(config.max_log_files, 7);
        assert!(!config.format.timestamps);
        assert!(config.format.source_locations);
        // 확장 필드는 기본값
        assert_eq!(config.flood_threshold, 100);
        assert_eq!(config.dedup_window_ms, 500);
    }

    #[test]
    fn validate_rejects_zero_flood_threshold() {
        let config = CaptureConfig {
            flood_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_log_dir_when_enabled() {
        let config = CaptureConfig {
            log_dir: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_allows_zero_dedup_window() {
        // 윈도우 0은 중복 제거 비활성과 같음
        let config = CaptureConfig {
            dedup_window_ms: 0,
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = CaptureConfigBuilder::new()
            .log_dir("/tmp/x")
            .max_lines(500)
            .flood_threshold(10)
            .build()
            .unwrap();
        assert_eq!(config.log_dir, "/tmp/x");
        assert_eq!(config.max_lines, 500);
        assert_eq!(config.flood_threshold, 10);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = CaptureConfigBuilder::new().flood_threshold(0).build();
        assert!(result.is_err());
    }
}
