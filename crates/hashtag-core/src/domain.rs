use std::{collections::HashMap, fmt};

/// Team id as issued by the host platform.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TeamId(pub String);

/// Channel id as issued by the host platform.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

/// Author (user) id as issued by the host platform.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AuthorId(pub String);

macro_rules! id_display {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

id_display!(TeamId, ChannelId, AuthorId);

/// A message as read from the store. The core never mutates it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub author_id: AuthorId,
    pub channel_id: ChannelId,
    /// Join/leave notices, header changes and other platform-generated posts.
    pub is_system_generated: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub id: AuthorId,
    pub display_name: String,
    /// Bots, webhooks and integrations.
    pub is_automated: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub team_id: TeamId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeamRef {
    pub id: TeamId,
    pub name: String,
}

/// One page of a channel's messages.
///
/// `order` lists ids in the store's page order; an id missing from `messages`
/// is skipped. An empty `order` marks the end of the channel.
#[derive(Clone, Debug, Default)]
pub struct MessagePage {
    pub order: Vec<String>,
    pub messages: HashMap<String, Message>,
}

impl MessagePage {
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Messages in page order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.order.iter().filter_map(|id| self.messages.get(id))
    }
}
