//! 라인 패턴 -- 리터럴/정규식 이중성의 단일 구현
//!
//! 제외 규칙, 워치 패턴, 스플릿 키워드가 모두 같은 패턴 문법을 공유합니다:
//! `/본문/플래그` 형태는 정규식으로 컴파일되고, 그 외에는 대소문자를
//! 구분하지 않는 리터럴 부분 문자열 매칭입니다.
//!
//! 유효하지 않은 정규식은 컴파일 시점에 경고 로그와 함께 드롭되며,
//! 매칭 시점에는 절대 에러가 발생하지 않습니다.

use regex::Regex;

/// 컴파일된 라인 패턴
///
/// 컴파일은 규칙 로딩 시 한 번만 수행되어 매칭 시 재컴파일 오버헤드가
/// 없습니다.
#[derive(Debug, Clone)]
pub enum LinePattern {
    /// 대소문자 무시 리터럴 부분 문자열 (소문자로 저장)
    Literal(String),
    /// `/본문/플래그` 형태에서 컴파일된 정규식
    Regex(Regex),
}

/// `/본문/플래그` 형태에서 허용되는 플래그 문자
const REGEX_FLAGS: &str = "imsxU";

impl LinePattern {
    /// 원시 패턴 문자열을 파싱합니다.
    ///
    /// - `/본문/플래그` 형태이면 정규식으로 컴파일합니다
    ///   (플래그는 `(?...)` 인라인 그룹으로 변환).
    /// - 그 외에는 대소문자 무시 리터럴로 취급합니다.
    /// - 빈 문자열과 유효하지 않은 정규식은 `None`을 반환합니다.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(stripped) = raw.strip_prefix('/')
            && let Some(slash) = stripped.rfind('/')
        {
            let body = &stripped[..slash];
            let flags = &stripped[slash + 1..];
            if !body.is_empty() && flags.chars().all(|c| REGEX_FLAGS.contains(c)) {
                let pattern = if flags.is_empty() {
                    body.to_owned()
                } else {
                    format!("(?{flags}){body}")
                };
                return match Regex::new(&pattern) {
                    Ok(regex) => Some(Self::Regex(regex)),
                    Err(e) => {
                        tracing::warn!(pattern = raw, error = %e, "invalid regex pattern, dropped");
                        None
                    }
                };
            }
        }

        Some(Self::Literal(raw.to_lowercase()))
    }

    /// 패턴이 텍스트에 매칭되는지 평가합니다.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Literal(needle) => text.to_lowercase().contains(needle.as_str()),
            Self::Regex(regex) => regex.is_match(text),
        }
    }

    /// 패턴 목록을 일괄 컴파일합니다.
    ///
    /// 유효하지 않은 패턴은 드롭되므로 결과 길이는 입력보다 짧을 수 있습니다.
    pub fn compile_list(raws: &[String]) -> Vec<Self> {
        raws.iter().filter_map(|raw| Self::parse(raw)).collect()
    }
}
