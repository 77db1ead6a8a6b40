//! 플러드 가드 -- 동일 메시지 폭주를 슬라이딩 윈도우로 억제합니다.
//!
//! 세션당 하나씩 존재하는 단일 스레드 상태 기계로, `normal`과
//! `suppressing` 두 상태를 가집니다. 억제 중에도 샘플 간격마다 정확히
//! 한 라인을 통과시켜 폭주 사실이 로그에서 보이도록 보장합니다.
//!
//! 절대 에러를 반환하지 않고, 절대 블로킹하지 않습니다.

use std::time::{Duration, Instant};

/// `check()` 호출 한 번의 판정 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloodVerdict {
    /// 이 라인을 통과시킬지 여부
    pub allow: bool,
    /// 직전 샘플 이후 억제된 라인 수 (억제 윈도우가 닫힌 경우에만 Some)
    pub suppressed: Option<u64>,
}

impl FloodVerdict {
    fn allow() -> Self {
        Self {
            allow: true,
            suppressed: None,
        }
    }

    fn deny() -> Self {
        Self {
            allow: false,
            suppressed: None,
        }
    }
}

/// 플러드 가드
///
/// 고정 윈도우 내에서 동일 메시지의 반복 횟수를 추적하고,
/// 임계값을 초과하면 억제 상태로 전환합니다.
#[derive(Debug)]
pub struct FloodGuard {
    /// 억제 진입 임계값 — 정확히 이 횟수까지는 허용됩니다
    threshold: u32,
    /// 반복 추적 윈도우
    window: Duration,
    /// 억제 중 샘플 라인 통과 간격
    sample_interval: Duration,
    /// 마지막으로 본 메시지
    last_message: Option<String>,
    /// 윈도우 내 반복 횟수
    repeats: u32,
    /// 윈도우 시작 시각
    window_start: Instant,
    /// 억제 중 여부
    suppressing: bool,
    /// 직전 샘플 이후 억제된 라인 수
    suppressed_since_sample: u64,
    /// 마지막 샘플 시각
    last_sample: Instant,
    /// 누적 억제 라인 수 (통계용)
    total_suppressed: u64,
}

impl FloodGuard {
    /// 새 플러드 가드를 생성합니다.
    pub fn new(threshold: u32, window: Duration, sample_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            threshold,
            window,
            sample_interval,
            last_message: None,
            repeats: 0,
            window_start: now,
            suppressing: false,
            suppressed_since_sample: 0,
            last_sample: now,
            total_suppressed: 0,
        }
    }

    /// 메시지를 평가하고 통과 여부를 판정합니다.
    pub fn check(&mut self, text: &str) -> FloodVerdict {
        let now = Instant::now();

        // 다른 메시지: 열려 있던 억제를 닫고 윈도우를 새로 시작
        if self.last_message.as_deref() != Some(text) {
            let closed = self.close_suppression();
            self.last_message = Some(text.to_owned());
            self.repeats = 1;
            self.window_start = now;
            return FloodVerdict {
                allow: true,
                suppressed: closed,
            };
        }

        // 동일 메시지인데 윈도우가 만료됨: 카운터 리셋.
        // 억제 중이었다면 만료가 억제도 종료시키고 누적치를 보고합니다.
        if now.duration_since(self.window_start) > self.window {
            let closed = self.close_suppression();
            self.repeats = 1;
            self.window_start = now;
            return FloodVerdict {
                allow: true,
                suppressed: closed,
            };
        }

        self.repeats = self.repeats.saturating_add(1);

        if !self.suppressing && self.repeats > self.threshold {
            self.suppressing = true;
            self.last_sample = now;
            self.suppressed_since_sample = 0;
            tracing::debug!(threshold = self.threshold, "flood suppression started");
        }

        if self.suppressing {
            // 샘플 간격마다 정확히 한 라인을 통과시켜 가시성을 보장
            if now.duration_since(self.last_sample) >= self.sample_interval
                && self.suppressed_since_sample > 0
            {
                let count = self.suppressed_since_sample;
                self.suppressed_since_sample = 0;
                self.last_sample = now;
                return FloodVerdict {
                    allow: true,
                    suppressed: Some(count),
                };
            }
            self.suppressed_since_sample += 1;
            self.total_suppressed += 1;
            return FloodVerdict::deny();
        }

        FloodVerdict::allow()
    }

    /// 열려 있는 억제 윈도우를 닫고 보고할 누적치를 반환합니다.
    fn close_suppression(&mut self) -> Option<u64> {
        if !self.suppressing {
            return None;
        }
        self.suppressing = false;
        let count = self.suppressed_since_sample;
        self.suppressed_since_sample = 0;
        tracing::debug!(suppressed = count, "flood suppression ended");
        (count > 0).then_some(count)
    }

    /// 모든 상태를 초기화합니다.
    ///
    /// 새 레코딩 세션이 시작될 때 호출합니다.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_message = None;
        self.repeats = 0;
        self.window_start = now;
        self.suppressing = false;
        self.suppressed_since_sample = 0;
        self.last_sample = now;
    }

    /// 현재 억제 중인지 확인합니다.
    pub fn is_suppressing(&self) -> bool {
        self.suppressing
    }

    /// 누적 억제 라인 수를 반환합니다.
    pub fn total_suppressed(&self) -> u64 {
        self.total_suppressed
    }
}
