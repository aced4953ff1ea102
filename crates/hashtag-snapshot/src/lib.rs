//! Snapshot adapter: a `MessageStore` backed by an exported JSON file.
//!
//! The file mirrors the host platform's export shape (teams, channels, users,
//! posts). Pages are served newest first, like the platform's channel feed.

use std::{collections::HashMap, path::Path};

use chrono::DateTime;
use serde::Deserialize;

use hashtag_core::{
    domain::{Author, AuthorId, ChannelId, ChannelRef, Message, MessagePage, TeamId, TeamRef},
    errors::Error,
    ports::MessageStore,
    Result,
};

#[derive(Debug, Default, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    teams: Vec<TeamRecord>,
    #[serde(default)]
    channels: Vec<ChannelRecord>,
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    posts: Vec<PostRecord>,
}

#[derive(Debug, Deserialize)]
struct TeamRecord {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ChannelRecord {
    id: String,
    team_id: String,
    #[serde(default)]
    name: String,
    /// `O` = open (public), `P` = private.
    #[serde(default = "open_channel", rename = "type")]
    kind: String,
}

fn open_channel() -> String {
    "O".to_string()
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    is_bot: bool,
}

#[derive(Debug, Deserialize)]
struct PostRecord {
    id: String,
    channel_id: String,
    user_id: String,
    #[serde(default)]
    message: String,
    create_at: Timestamp,
    /// Non-empty for platform-generated posts.
    #[serde(default, rename = "type")]
    kind: String,
}

/// Epoch milliseconds or an RFC 3339 string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    fn to_millis(&self, post_id: &str) -> Result<i64> {
        match self {
            Self::Millis(ms) => Ok(*ms),
            Self::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.timestamp_millis())
                .map_err(|e| Error::Config(format!("post {post_id}: bad create_at {s:?}: {e}"))),
        }
    }
}

/// In-memory view of a snapshot, indexed for paged reads.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    teams: Vec<TeamRef>,
    /// In file order; listing preserves it.
    channels: Vec<ChannelRef>,
    public: HashMap<ChannelId, bool>,
    authors: HashMap<AuthorId, Author>,
    /// Per channel, newest first.
    feeds: HashMap<ChannelId, Vec<Message>>,
}

impl SnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path)?;
        let store = Self::from_json(&txt)?;
        tracing::info!(
            path = %path.display(),
            teams = store.teams.len(),
            channels = store.channels.len(),
            "snapshot loaded"
        );
        Ok(store)
    }

    pub fn from_json(txt: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(txt)?;
        Self::from_file(file)
    }

    fn from_file(file: SnapshotFile) -> Result<Self> {
        let mut store = Self::default();

        store.teams = file
            .teams
            .into_iter()
            .map(|t| TeamRef {
                id: TeamId(t.id),
                name: t.name,
            })
            .collect();

        for c in file.channels {
            let id = ChannelId(c.id);
            store.public.insert(id.clone(), c.kind == "O");
            store.channels.push(ChannelRef {
                id,
                team_id: TeamId(c.team_id),
                name: c.name,
            });
        }

        for u in file.users {
            let id = AuthorId(u.id);
            store.authors.insert(
                id.clone(),
                Author {
                    id,
                    display_name: u.username,
                    is_automated: u.is_bot,
                },
            );
        }

        for p in file.posts {
            let created_at = p.create_at.to_millis(&p.id)?;
            let channel_id = ChannelId(p.channel_id);
            store
                .feeds
                .entry(channel_id.clone())
                .or_default()
                .push(Message {
                    id: p.id,
                    text: p.message,
                    created_at,
                    author_id: AuthorId(p.user_id),
                    channel_id,
                    is_system_generated: !p.kind.is_empty(),
                });
        }

        for feed in store.feeds.values_mut() {
            feed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        }

        Ok(store)
    }
}

impl MessageStore for SnapshotStore {
    fn list_teams(&self) -> Result<Vec<TeamRef>> {
        Ok(self.teams.clone())
    }

    fn list_public_channels(
        &self,
        team: &TeamId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ChannelRef>> {
        if !self.teams.iter().any(|t| &t.id == team) {
            return Err(Error::upstream(format!("team {team} not found")));
        }
        Ok(self
            .channels
            .iter()
            .filter(|c| &c.team_id == team && self.public.get(&c.id).copied().unwrap_or(false))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get_channel(&self, channel: &ChannelId) -> Result<ChannelRef> {
        self.channels
            .iter()
            .find(|c| &c.id == channel)
            .cloned()
            .ok_or_else(|| Error::upstream(format!("channel {channel} not found")))
    }

    fn get_messages_page(
        &self,
        channel: &ChannelId,
        page: usize,
        per_page: usize,
    ) -> Result<MessagePage> {
        if !self.channels.iter().any(|c| &c.id == channel) {
            return Err(Error::upstream(format!("channel {channel} not found")));
        }
        let mut out = MessagePage::default();
        let Some(feed) = self.feeds.get(channel) else {
            return Ok(out);
        };
        for m in feed.iter().skip(page.saturating_mul(per_page)).take(per_page) {
            out.order.push(m.id.clone());
            out.messages.insert(m.id.clone(), m.clone());
        }
        Ok(out)
    }

    fn get_author(&self, author: &AuthorId) -> Result<Author> {
        self.authors
            .get(author)
            .cloned()
            .ok_or_else(|| Error::upstream(format!("user {author} not found")))
    }
}
