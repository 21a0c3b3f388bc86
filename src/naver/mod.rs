//! 네이버 검색 API 클라이언트
//!
//! 블로그/뉴스/쇼핑 검색 결과를 가져옵니다.
//! ref: https://developers.naver.com/docs/serviceapi/search/blog/blog.md
//!
//! 응답 필드(title, description 등)에는 HTML 태그와 엔티티가 섞여
//! 있으므로 [`strip_tags`]로 정리한 뒤 사용합니다.

use std::time::Duration;

use scraper::Html;
use serde::Deserialize;
use thiserror::Error;

/// 네이버 검색 API 베이스 URL
const NAVER_SEARCH_URL: &str = "https://openapi.naver.com/v1/search";

/// 한 번에 요청 가능한 최대 결과 수 (API 제한)
pub const MAX_DISPLAY: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// 검색 미디어 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Media {
    Blog,
    News,
    Shop,
}

impl Media {
    /// API 엔드포인트 경로 세그먼트
    pub fn endpoint(&self) -> &'static str {
        match self {
            Media::Blog => "blog",
            Media::News => "news",
            Media::Shop => "shop",
        }
    }
}

/// 정렬 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sort {
    /// 정확도순 (기본값)
    #[default]
    Sim,
    /// 날짜순
    Date,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Sim => "sim",
            Sort::Date => "date",
        }
    }
}

/// 검색 응답
///
/// 미디어 타입과 무관하게 공통 구조(total/start/display/items)를 갖습니다.
#[derive(Debug, Clone, Deserialize)]
pub struct NaverSearchResponse {
    pub total: u64,
    pub start: u32,
    pub display: u32,
    #[serde(default)]
    pub items: Vec<NaverItem>,
}

/// 검색 결과 항목
///
/// 미디어별로 채워지는 필드가 다릅니다:
/// 블로그는 bloggername/postdate, 뉴스는 originallink/pub_date,
/// 쇼핑은 lprice/mall_name/maker/brand 계열이 옵니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NaverItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,

    // 블로그
    #[serde(default)]
    pub bloggername: String,
    #[serde(default)]
    pub bloggerlink: String,
    #[serde(default)]
    pub postdate: String,

    // 뉴스
    #[serde(default)]
    pub originallink: String,
    #[serde(default, rename = "pubDate")]
    pub pub_date: String,

    // 쇼핑
    #[serde(default)]
    pub lprice: String,
    #[serde(default)]
    pub hprice: String,
    #[serde(default, rename = "mallName")]
    pub mall_name: String,
    #[serde(default)]
    pub maker: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category3: String,
    #[serde(default, rename = "productId")]
    pub product_id: String,
    #[serde(default, rename = "productType")]
    pub product_type: String,
}

// ============================================================================
// Errors
// ============================================================================

/// 네이버 API 호출 에러
///
/// 전송 오류, 상태 코드 오류, 본문 형식 오류를 구분합니다.
#[derive(Debug, Error)]
pub enum NaverError {
    #[error("네이버 API 요청 실패: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("네이버 API HTTP 오류 ({code}): {hint}")]
    Status { code: u16, hint: &'static str },

    #[error("네이버 API에서 빈 응답을 받았습니다")]
    EmptyBody,

    #[error("네이버 API 응답 파싱 실패: {0}")]
    Format(#[from] serde_json::Error),
}

/// 상태 코드별 안내 메시지
fn status_hint(code: u16) -> &'static str {
    match code {
        400 => "잘못된 요청입니다. 검색어를 확인해주세요.",
        401 => "인증 오류입니다. API 키를 확인해주세요.",
        403 => "접근 거부되었습니다. API 사용 권한을 확인해주세요.",
        429 => "API 호출 한도를 초과했습니다. 잠시 후 다시 시도해주세요.",
        _ => "요청이 거부되었습니다.",
    }
}

// ============================================================================
// NaverClient
// ============================================================================

/// 네이버 검색 API 클라이언트
pub struct NaverClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl NaverClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `client_id` - 네이버 개발자센터 Client ID
    /// * `client_secret` - 네이버 개발자센터 Client Secret
    pub fn new(client_id: String, client_secret: String) -> Result<Self, NaverError> {
        let client = reqwest::Client::builder()
            .user_agent("naver-rag/0.1")
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            client_id,
            client_secret,
        })
    }

    /// 검색 실행
    ///
    /// # Arguments
    /// * `media` - 검색 미디어 (blog/news/shop)
    /// * `query` - 검색어
    /// * `display` - 결과 개수 (최대 100)
    /// * `start` - 시작 위치 (페이징용, 1-based)
    /// * `sort` - 정렬 방식
    pub async fn search(
        &self,
        media: Media,
        query: &str,
        display: usize,
        start: usize,
        sort: Sort,
    ) -> Result<NaverSearchResponse, NaverError> {
        let url = format!("{}/{}", NAVER_SEARCH_URL, media.endpoint());
        let display = display.clamp(1, MAX_DISPLAY).to_string();
        let start = start.max(1).to_string();

        let response = self
            .client
            .get(&url)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .query(&[
                ("query", query),
                ("display", display.as_str()),
                ("start", start.as_str()),
                ("sort", sort.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NaverError::Status {
                code: status.as_u16(),
                hint: status_hint(status.as_u16()),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(NaverError::EmptyBody);
        }

        let parsed: NaverSearchResponse = serde_json::from_str(&body)?;
        tracing::debug!(
            "Naver {} search: total={}, fetched={}",
            media.endpoint(),
            parsed.total,
            parsed.items.len()
        );

        Ok(parsed)
    }

    /// 블로그 검색 편의 메소드
    pub async fn get_blog(
        &self,
        query: &str,
        display: usize,
        start: usize,
        sort: Sort,
    ) -> Result<NaverSearchResponse, NaverError> {
        self.search(Media::Blog, query, display, start, sort).await
    }

    /// 뉴스 검색 편의 메소드
    pub async fn get_news(
        &self,
        query: &str,
        display: usize,
        start: usize,
        sort: Sort,
    ) -> Result<NaverSearchResponse, NaverError> {
        self.search(Media::News, query, display, start, sort).await
    }

    /// 쇼핑 검색 편의 메소드
    pub async fn get_shop(
        &self,
        query: &str,
        display: usize,
        start: usize,
        sort: Sort,
    ) -> Result<NaverSearchResponse, NaverError> {
        self.search(Media::Shop, query, display, start, sort).await
    }
}

// ============================================================================
// HTML Cleanup
// ============================================================================

/// HTML 태그 제거 및 엔티티 디코딩
///
/// 네이버 API는 검색어 하이라이트용 `<b>` 태그와 `&quot;` 같은
/// 엔티티를 섞어 보냅니다. 텍스트 노드만 모아 반환합니다.
pub fn strip_tags(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(text);
    let mut out = String::new();

    for node in fragment.root_element().text() {
        out.push_str(node);
    }

    out.trim().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags_basic() {
        assert_eq!(strip_tags("<b>전자담배</b> 추천"), "전자담배 추천");
        assert_eq!(strip_tags("no tags here"), "no tags here");
        assert_eq!(strip_tags(""), "");
    }

    #[test]
    fn test_strip_tags_entities() {
        assert_eq!(strip_tags("&quot;인용&quot; &amp; 테스트"), "\"인용\" & 테스트");
    }

    #[test]
    fn test_strip_tags_nested() {
        assert_eq!(
            strip_tags("<b>삼성</b> 노트북 <b>갤럭시북</b>"),
            "삼성 노트북 갤럭시북"
        );
    }

    #[test]
    fn test_media_endpoint() {
        assert_eq!(Media::Blog.endpoint(), "blog");
        assert_eq!(Media::News.endpoint(), "news");
        assert_eq!(Media::Shop.endpoint(), "shop");
    }

    #[test]
    fn test_status_hint_known_codes() {
        assert!(status_hint(401).contains("인증"));
        assert!(status_hint(429).contains("한도"));
        assert!(!status_hint(500).is_empty());
    }

    #[test]
    fn test_parse_blog_response() {
        let body = r#"{
            "lastBuildDate": "Mon, 01 Jan 2024 00:00:00 +0900",
            "total": 12345,
            "start": 1,
            "display": 2,
            "items": [
                {
                    "title": "<b>전자담배</b> 입문기",
                    "link": "https://blog.naver.com/a/1",
                    "description": "처음 <b>전자담배</b>를 샀다",
                    "bloggername": "니코",
                    "bloggerlink": "https://blog.naver.com/a",
                    "postdate": "20240101"
                },
                {
                    "title": "액상 리뷰",
                    "link": "https://blog.naver.com/b/2",
                    "description": "과일맛 액상",
                    "bloggername": "베이퍼",
                    "bloggerlink": "https://blog.naver.com/b",
                    "postdate": "20240102"
                }
            ]
        }"#;

        let parsed: NaverSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.total, 12345);
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].bloggername, "니코");
        assert_eq!(strip_tags(&parsed.items[0].title), "전자담배 입문기");
    }

    #[test]
    fn test_parse_shop_response_fields() {
        let body = r#"{
            "total": 1,
            "start": 1,
            "display": 1,
            "items": [
                {
                    "title": "갤럭시북4",
                    "link": "https://shopping.naver.com/p/1",
                    "lprice": "899000",
                    "hprice": "",
                    "mallName": "네이버",
                    "maker": "삼성전자",
                    "brand": "갤럭시북",
                    "category3": "노트북",
                    "productId": "123",
                    "productType": "1"
                }
            ]
        }"#;

        let parsed: NaverSearchResponse = serde_json::from_str(body).unwrap();
        let item = &parsed.items[0];
        assert_eq!(item.lprice, "899000");
        assert_eq!(item.mall_name, "네이버");
        assert_eq!(item.maker, "삼성전자");
        // 블로그 전용 필드는 비어 있음
        assert!(item.bloggername.is_empty());
    }

    #[test]
    fn test_parse_missing_items() {
        let body = r#"{"total": 0, "start": 1, "display": 0}"#;
        let parsed: NaverSearchResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.items.is_empty());
    }
}
