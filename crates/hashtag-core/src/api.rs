//! Request/response contracts for transports.
//!
//! Numeric parameters arrive as strings (query-string style) or JSON numbers.
//! `limit` and `max` reject unparsable input; `page` and `page_size` fall back
//! to their defaults instead.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    errors::Error,
    paginator::{parse_param, Page},
    service::{HashtagReport, HashtagService, TaggedMessage},
    Result,
};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChannelHashtagsRequest {
    #[serde(default)]
    pub channel_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub limit: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TeamHashtagsRequest {
    #[serde(default)]
    pub team_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub max: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TagPostsRequest {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub page: Option<String>,
    #[serde(default, alias = "pageSize", deserialize_with = "lenient_string")]
    pub page_size: Option<String>,
}

impl TagPostsRequest {
    pub fn is_paged(&self) -> bool {
        self.page.is_some() || self.page_size.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PagedPosts {
    pub posts: Vec<TaggedMessage>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

impl From<Page<TaggedMessage>> for PagedPosts {
    fn from(p: Page<TaggedMessage>) -> Self {
        Self {
            posts: p.items,
            total_count: p.total_count,
            page: p.page,
            page_size: p.page_size,
            has_more: p.has_more,
        }
    }
}

/// Flat list unless the caller asked for a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TagPostsResponse {
    List(Vec<TaggedMessage>),
    Paged(PagedPosts),
}

pub fn channel_hashtags(
    svc: &HashtagService,
    req: &ChannelHashtagsRequest,
) -> Result<HashtagReport> {
    let limit = strict_int(req.limit.as_deref(), "limit")?;
    svc.get_channel_hashtags(&req.channel_id, limit)
}

pub fn team_hashtags(svc: &HashtagService, req: &TeamHashtagsRequest) -> Result<HashtagReport> {
    let max = strict_int(req.max.as_deref(), "max")?;
    svc.get_team_hashtags(&req.team_id, max)
}

pub fn tag_posts(svc: &HashtagService, req: &TagPostsRequest) -> Result<TagPostsResponse> {
    let channel = req.channel_id.as_deref();
    if !req.is_paged() {
        return Ok(TagPostsResponse::List(svc.get_messages_for_tag(&req.tag, channel)?));
    }
    let page = svc.get_messages_for_tag_page(
        &req.tag,
        channel,
        parse_param(req.page.as_deref()),
        parse_param(req.page_size.as_deref()),
    )?;
    Ok(TagPostsResponse::Paged(page.into()))
}

/// Absent or blank is `None`; anything else must be an integer.
fn strict_int(raw: Option<&str>, name: &str) -> Result<Option<i64>> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    s.parse::<i64>()
        .map(Some)
        .map_err(|_| Error::invalid(format!("invalid {name} parameter: {s:?}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_string<'de, D>(d: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(d)?.map(|v| match v {
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(s) => s,
    }))
}
