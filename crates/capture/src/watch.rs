//! 키워드 워치 -- 설정된 패턴에 매칭되는 라인을 집계합니다.
//!
//! [`KeywordWatcher`]는 브로드캐스트 경로에 도달한 라인만 평가합니다
//! (플러드 가드가 거부한 라인은 평가되지 않습니다). 레이블별 누적
//! 카운터는 워처가 재생성될 때까지 유지됩니다.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use debugtap_core::metrics as m;
use debugtap_core::types::{AlertKind, WatchHit};

use crate::pattern::LinePattern;

/// 워치 패턴 설정 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSpec {
    /// 패턴 (리터럴 또는 `/정규식/플래그`)
    pub pattern: String,
    /// 레이블 (생략 시 패턴 문자열 사용)
    #[serde(default)]
    pub label: Option<String>,
    /// 알림 종류
    #[serde(default)]
    pub kind: AlertKind,
}

impl WatchSpec {
    /// 패턴만으로 워치 항목을 생성합니다.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            label: None,
            kind: AlertKind::default(),
        }
    }

    /// 레이블을 설정합니다.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// 알림 종류를 설정합니다.
    pub fn with_kind(mut self, kind: AlertKind) -> Self {
        self.kind = kind;
        self
    }
}

/// 해석이 끝난 워치 규칙
#[derive(Debug)]
struct WatchRule {
    /// 규칙 레이블
    label: String,
    /// 알림 종류
    kind: AlertKind,
    /// 컴파일된 패턴
    pattern: LinePattern,
}

/// 키워드 워처
///
/// 생성 시점에 패턴을 모두 컴파일하는 불변 규칙 집합입니다.
/// 유효하지 않은 정규식은 경고 로그와 함께 드롭됩니다.
#[derive(Debug, Default)]
pub struct KeywordWatcher {
    /// 활성 규칙 목록
    rules: Vec<WatchRule>,
    /// 레이블 -> 누적 매칭 횟수
    counts: HashMap<String, u64>,
}

impl KeywordWatcher {
    /// 워치 설정 목록에서 워처를 생성합니다.
    pub fn new(specs: &[WatchSpec]) -> Self {
        let rules: Vec<WatchRule> = specs
            .iter()
            .filter_map(|spec| {
                let pattern = LinePattern::parse(&spec.pattern)?;
                let label = spec
                    .label
                    .clone()
                    .unwrap_or_else(|| spec.pattern.clone());
                Some(WatchRule {
                    label,
                    kind: spec.kind,
                    pattern,
                })
            })
            .collect();

        if rules.len() < specs.len() {
            tracing::warn!(
                configured = specs.len(),
                active = rules.len(),
                "some watch patterns were invalid and dropped"
            );
        }

        Self {
            rules,
            counts: HashMap::new(),
        }
    }

    /// 라인을 모든 규칙에 대해 평가합니다.
    ///
    /// 한 라인이 여러 규칙에 매칭될 수 있으며, 매칭마다 해당 레이블의
    /// 누적 카운터가 증가합니다.
    pub fn test_line(&mut self, text: &str) -> Vec<WatchHit> {
        let mut hits = Vec::new();
        for rule in &self.rules {
            if rule.pattern.is_match(text) {
                *self.counts.entry(rule.label.clone()).or_insert(0) += 1;
                metrics::counter!(m::CAPTURE_WATCH_HITS_TOTAL, m::LABEL_WATCH => rule.label.clone())
                    .increment(1);
                hits.push(WatchHit {
                    label: rule.label.clone(),
                    kind: rule.kind,
                });
            }
        }
        hits
    }

    /// 레이블별 누적 매칭 횟수를 반환합니다.
    pub fn counts(&self) -> &HashMap<String, u64> {
        &self.counts
    }

    /// 누적 카운터를 모두 초기화합니다.
    pub fn reset_counts(&mut self) {
        self.counts.clear();
    }

    /// 활성 규칙 수를 반환합니다.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
