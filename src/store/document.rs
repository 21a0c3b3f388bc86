//! 문서 데이터 모델
//!
//! Supabase documents 테이블의 행(content / embedding / metadata)을
//! 타입으로 표현합니다. metadata는 수집 소스별 태그드 변형으로,
//! 수집 시점에 검증됩니다. 다운스트림에서 키 존재 여부를 매번
//! 방어적으로 확인하지 않기 위함입니다.

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// SourceType
// ============================================================================

/// 수집 소스 (컬렉션 태그)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SourceType {
    Blog,
    News,
    Shopping,
}

impl SourceType {
    /// 저장되는 컬렉션 태그 값
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Blog => "blog",
            SourceType::News => "news",
            SourceType::Shopping => "shopping",
        }
    }

    /// 화면 표시용 한국어 이름
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceType::Blog => "블로그",
            SourceType::News => "뉴스",
            SourceType::Shopping => "쇼핑",
        }
    }

    /// 네이버 검색 API 미디어 타입으로 변환
    pub fn media(&self) -> crate::naver::Media {
        match self {
            SourceType::Blog => crate::naver::Media::Blog,
            SourceType::News => crate::naver::Media::News,
            SourceType::Shopping => crate::naver::Media::Shop,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// 블로그 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogMeta {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub bloggername: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<String>,
}

/// 뉴스 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsMeta {
    pub title: String,
    pub url: String,
    /// 원문 링크의 호스트에서 추출한 언론사
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<String>,
}

/// 쇼핑 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingMeta {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub lprice: String,
    #[serde(default)]
    pub hprice: String,
    #[serde(default)]
    pub mallname: String,
    #[serde(default)]
    pub maker: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<String>,
}

/// 문서 메타데이터 - 컬렉션별 태그드 변형
///
/// `collection` 키가 태그로 직렬화됩니다. 알 수 없는 컬렉션의
/// 기존 행은 `Unknown`으로 읽히며 소스 필터에 걸리지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection")]
pub enum Metadata {
    #[serde(rename = "blog")]
    Blog(BlogMeta),
    #[serde(rename = "news")]
    News(NewsMeta),
    #[serde(rename = "shopping")]
    Shopping(ShoppingMeta),
    #[serde(other)]
    Unknown,
}

impl Metadata {
    /// 문서 제목
    pub fn title(&self) -> Option<&str> {
        match self {
            Metadata::Blog(m) => Some(&m.title),
            Metadata::News(m) => Some(&m.title),
            Metadata::Shopping(m) => Some(&m.title),
            Metadata::Unknown => None,
        }
    }

    /// 원본 URL (중복 체크 키)
    pub fn url(&self) -> Option<&str> {
        let url = match self {
            Metadata::Blog(m) => &m.url,
            Metadata::News(m) => &m.url,
            Metadata::Shopping(m) => &m.url,
            Metadata::Unknown => return None,
        };
        if url.is_empty() {
            None
        } else {
            Some(url)
        }
    }

    /// 날짜 필드 (있는 경우)
    pub fn date(&self) -> Option<&str> {
        let date = match self {
            Metadata::Blog(m) => &m.date,
            Metadata::News(m) => &m.date,
            _ => return None,
        };
        if date.is_empty() {
            None
        } else {
            Some(date)
        }
    }

    /// 컬렉션 태그
    pub fn source_type(&self) -> Option<SourceType> {
        match self {
            Metadata::Blog(_) => Some(SourceType::Blog),
            Metadata::News(_) => Some(SourceType::News),
            Metadata::Shopping(_) => Some(SourceType::Shopping),
            Metadata::Unknown => None,
        }
    }
}

// ============================================================================
// Document
// ============================================================================

/// 저장된 문서 행
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub id: i64,
    pub content: String,
    /// select 컬럼에 따라 없을 수 있음
    #[serde(default, deserialize_with = "deserialize_embedding")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default = "unknown_metadata", deserialize_with = "deserialize_metadata")]
    pub metadata: Metadata,
}

/// 삽입용 새 문서
#[derive(Debug, Clone, Serialize)]
pub struct NewDocument {
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

fn unknown_metadata() -> Metadata {
    Metadata::Unknown
}

/// embedding 컬럼 역직렬화
///
/// PostgREST는 vector 컬럼을 JSON 배열이 아닌 "[0.1,0.2,...]"
/// 문자열로 내려주는 경우가 있어 양쪽 표현을 모두 받습니다.
fn deserialize_embedding<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Array(items)) => {
            let mut vector = Vec::with_capacity(items.len());
            for item in items {
                let n = item
                    .as_f64()
                    .ok_or_else(|| D::Error::custom("embedding 배열에 숫자가 아닌 값"))?;
                vector.push(n as f32);
            }
            Ok(Some(vector))
        }
        Some(serde_json::Value::String(s)) => serde_json::from_str::<Vec<f32>>(&s)
            .map(Some)
            .map_err(|e| D::Error::custom(format!("embedding 문자열 파싱 실패: {}", e))),
        Some(other) => Err(D::Error::custom(format!(
            "embedding 컬럼의 예상치 못한 타입: {}",
            other
        ))),
    }
}

/// metadata 컬럼 역직렬화
///
/// jsonb 객체가 기본이지만 문자열로 이중 인코딩된 기존 행도
/// 있습니다. 형식이 깨진 행은 검색 전체를 실패시키는 대신
/// `Unknown`으로 읽습니다.
fn deserialize_metadata<'de, D>(deserializer: D) -> Result<Metadata, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;

    let object = match value {
        serde_json::Value::String(s) => match serde_json::from_str::<serde_json::Value>(&s) {
            Ok(v) => v,
            Err(_) => return Ok(Metadata::Unknown),
        },
        other => other,
    };

    Ok(serde_json::from_value::<Metadata>(object).unwrap_or(Metadata::Unknown))
}

// ============================================================================
// Tests
// ============================================================================
