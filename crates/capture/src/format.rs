//! 라인/파일 포맷팅 -- 디스크 포맷 호환성의 기준점
//!
//! 포맷된 라인은 `[HH:MM:SS.mmm] [+S.mmms] [category] [source:line] text`
//! 형태이며, 각 대괄호 세그먼트는 설정으로 켜고 끌 수 있습니다
//! (순서는 고정).
//!
//! 세션 헤더는 `key: value` 라인 블록을 `====...====` 구분선으로 감싼
//! 형태이고, 분할 마커와 세션 종료 푸터도 여기에서 렌더링됩니다.

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use debugtap_core::types::SourceLocation;

use crate::split::SplitReason;

/// 헤더 블록 구분선
pub const HEADER_DELIMITER: &str =
    "============================================================";

/// 라인 프리픽스 구성 옵션
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// `[HH:MM:SS.mmm]` 타임스탬프 포함
    pub timestamps: bool,
    /// `[category]` 포함
    pub categories: bool,
    /// `[source:line]` 포함 (위치가 알려진 경우)
    pub source_locations: bool,
    /// `[+S.mmms]` 세션 시작 후 경과 시간 포함
    pub elapsed: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            timestamps: true,
            categories: true,
            source_locations: false,
            elapsed: false,
        }
    }
}

/// 라인 포매터
///
/// 세션 시작 시각을 기억하여 경과 시간 프리픽스를 계산합니다.
#[derive(Debug, Clone)]
pub struct LineFormatter {
    /// 프리픽스 구성
    opts: FormatOptions,
    /// 세션 시작 시각 (경과 시간 기준점)
    started_at: DateTime<Local>,
}

impl LineFormatter {
    /// 새 포매터를 생성합니다.
    pub fn new(opts: FormatOptions, started_at: DateTime<Local>) -> Self {
        Self { opts, started_at }
    }

    /// 한 라인을 포맷합니다.
    ///
    /// 세그먼트 순서는 고정입니다: 타임스탬프, 경과 시간, 카테고리,
    /// 소스 위치, 텍스트.
    pub fn format_line(
        &self,
        text: &str,
        category: &str,
        source: Option<&SourceLocation>,
        at: DateTime<Local>,
    ) -> String {
        let mut line = String::with_capacity(text.len() + 32);

        if self.opts.timestamps {
            line.push_str(&format!("[{}] ", at.format("%H:%M:%S%.3f")));
        }

        if self.opts.elapsed {
            let ms = at
                .signed_duration_since(self.started_at)
                .num_milliseconds()
                .max(0);
            line.push_str(&format!("[+{}.{:03}s] ", ms / 1000, ms % 1000));
        }

        if self.opts.categories {
            line.push_str(&format!("[{category}] "));
        }

        if self.opts.source_locations
            && let Some(source) = source
        {
            line.push_str(&format!("[{source}] "));
        }

        line.push_str(text);
        line
    }

    /// 파트 1 파일의 세션 헤더 블록을 렌더링합니다.
    pub fn header(&self, session_id: &str, file_name: &str) -> String {
        format!(
            "{delim}\nsession: {session_id}\nfile: {file_name}\npart: 1\nstarted: {started}\n{delim}\n",
            delim = HEADER_DELIMITER,
            started = rfc3339(self.started_at),
        )
    }

    /// 파트 2 이상 파일의 연속 헤더 블록을 렌더링합니다.
    pub fn continuation_header(
        &self,
        session_id: &str,
        base_file_name: &str,
        part: u32,
        reason: &SplitReason,
        at: DateTime<Local>,
    ) -> String {
        format!(
            "{delim}\nsession: {session_id}\ncontinues: {base_file_name}\npart: {part}\nreason: {reason}\ncontinued: {at}\n{delim}\n",
            delim = HEADER_DELIMITER,
            at = rfc3339(at),
        )
    }
}

/// 구 파일에 남기는 분할 마커를 렌더링합니다.
pub fn split_marker(reason: &SplitReason, next_part: u32) -> String {
    format!("=== SPLIT: {reason} — Continued in part {next_part} ===")
}

/// 세션 종료 푸터를 렌더링합니다.
pub fn footer(line_count: u64, at: DateTime<Local>) -> String {
    format!(
        "=== SESSION END — {} — {} lines ===",
        rfc3339(at),
        line_count
    )
}

/// 최대 라인 수 도달 마커를 렌더링합니다.
pub fn max_lines_marker(max_lines: u64) -> String {
    format!("=== MAX LINES REACHED — {max_lines} lines captured, further output suppressed ===")
}

/// 플러드 억제 보고 마커를 렌더링합니다.
pub fn flood_marker(suppressed: u64) -> String {
    format!("=== FLOOD — {suppressed} repeated lines suppressed ===")
}

fn rfc3339(at: DateTime<Local>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
