//! 설정 모듈 - 환경변수 기반 설정 로딩
//!
//! 외부 서비스(네이버 검색 API, Supabase, OpenAI) 접속 정보를
//! 환경변수에서 읽어옵니다. 모든 키는 실행 시점에 한 번 로드되며,
//! 이후 파이프라인에는 불변 설정으로 전달됩니다.

use anyhow::Result;

/// 유사도 인덱스 선택
///
/// 원격 RPC(`match_documents`)와 클라이언트 측 전체 스캔 중
/// 어느 쪽으로 검색할지 설정 시점에 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Supabase RPC 벡터 검색 (기본값)
    Remote,
    /// 전체 스캔 후 클라이언트 측 코사인 유사도 계산
    Client,
}

impl IndexMode {
    fn from_env() -> Self {
        match std::env::var("RAG_INDEX_MODE").as_deref() {
            Ok("client") => IndexMode::Client,
            Ok("remote") | Err(_) => IndexMode::Remote,
            Ok(other) => {
                tracing::warn!("Unknown RAG_INDEX_MODE '{}', using remote", other);
                IndexMode::Remote
            }
        }
    }
}

/// 네이버 검색 API 접속 정보
#[derive(Debug, Clone)]
pub struct NaverConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Supabase 접속 정보
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// 프로젝트 URL (예: https://xyz.supabase.co)
    pub url: String,
    /// 서비스 또는 anon 키
    pub key: String,
}

/// OpenAI 접속 정보
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// 답변 생성 모델
    pub chat_model: String,
    /// 임베딩 모델
    pub embed_model: String,
}

/// 전체 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub naver: NaverConfig,
    pub supabase: SupabaseConfig,
    pub openai: OpenAiConfig,
    pub index_mode: IndexMode,
}

impl Config {
    /// 환경변수에서 전체 설정 로드
    ///
    /// 필수 변수가 하나라도 없으면 설정 방법을 포함한 에러를 반환합니다.
    pub fn from_env() -> Result<Self> {
        let naver = NaverConfig {
            client_id: require_env("NAVER_CLIENT_ID")?,
            client_secret: require_env("NAVER_CLIENT_SECRET")?,
        };

        let supabase = SupabaseConfig {
            url: require_env("SUPABASE_URL")?,
            key: require_env("SUPABASE_KEY")?,
        };

        let openai = OpenAiConfig {
            api_key: require_env("OPENAI_API_KEY")?,
            chat_model: env_or("OPENAI_CHAT_MODEL", "gpt-4o-mini"),
            embed_model: env_or("OPENAI_EMBED_MODEL", "text-embedding-3-small"),
        };

        Ok(Self {
            naver,
            supabase,
            openai,
            index_mode: IndexMode::from_env(),
        })
    }
}

/// 필수 환경변수 로드
fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => anyhow::bail!(
            "{name} 환경변수가 설정되지 않았습니다.\n\
             설정: export {name}=your-value"
        ),
    }
}

/// 선택 환경변수 로드 (없으면 기본값)
fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

// ============================================================================
// Key Presence Helpers (status 명령어용)
// ============================================================================

fn is_set(name: &str) -> bool {
    std::env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// 네이버 API 키 설정 여부
pub fn has_naver_keys() -> bool {
    is_set("NAVER_CLIENT_ID") && is_set("NAVER_CLIENT_SECRET")
}

/// Supabase 키 설정 여부
pub fn has_supabase_keys() -> bool {
    is_set("SUPABASE_URL") && is_set("SUPABASE_KEY")
}

/// OpenAI 키 설정 여부
pub fn has_openai_key() -> bool {
    is_set("OPENAI_API_KEY")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_default() {
        std::env::remove_var("NAVER_RAG_TEST_MISSING");
        assert_eq!(env_or("NAVER_RAG_TEST_MISSING", "fallback"), "fallback");

        std::env::set_var("NAVER_RAG_TEST_PRESENT", "value");
        assert_eq!(env_or("NAVER_RAG_TEST_PRESENT", "fallback"), "value");
        std::env::remove_var("NAVER_RAG_TEST_PRESENT");
    }

    #[test]
    fn test_require_env_missing() {
        std::env::remove_var("NAVER_RAG_TEST_REQUIRED");
        let result = require_env("NAVER_RAG_TEST_REQUIRED");
        assert!(result.is_err());
    }

    #[test]
    fn test_require_env_blank_rejected() {
        std::env::set_var("NAVER_RAG_TEST_BLANK", "   ");
        assert!(require_env("NAVER_RAG_TEST_BLANK").is_err());
        std::env::remove_var("NAVER_RAG_TEST_BLANK");
    }
}
