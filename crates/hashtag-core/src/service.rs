//! Query service: the public entry point for count and lookup queries.

use std::{collections::HashSet, ops::ControlFlow, sync::Arc};

use serde::Serialize;

use crate::{
    aggregator::{Aggregator, AuthorFilter, Budget, Scope, TagCount},
    config::QueryConfig,
    domain::{ChannelId, ChannelRef, Message, TeamId},
    errors::Error,
    grouper::{group_by_prefix, TagGroup},
    paginator::{paginate, Page, PageLimits},
    ports::MessageStore,
    tokenizer::Tokenizer,
    Result,
};

/// Ranked counts plus their prefix groups.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HashtagReport {
    pub hashtags: Vec<TagCount>,
    pub groups: Vec<TagGroup>,
}

/// A message carrying the looked-up tag, with its author's display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaggedMessage {
    pub id: String,
    pub message: String,
    pub create_at: i64,
    pub username: String,
    pub channel_id: String,
}

/// Every query recomputes from the store; nothing is cached between calls.
pub struct HashtagService {
    store: Arc<dyn MessageStore>,
    tokenizer: Tokenizer,
    config: QueryConfig,
}

impl HashtagService {
    pub fn new(store: Arc<dyn MessageStore>, config: QueryConfig) -> Self {
        Self {
            store,
            tokenizer: Tokenizer::new(),
            config,
        }
    }

    fn aggregator(&self) -> Aggregator<'_> {
        Aggregator::new(self.store.as_ref(), &self.tokenizer, &self.config)
    }

    /// Counts for one channel under the configured scan budget.
    ///
    /// `limit`, when positive, keeps only the top `limit` tags (grouping runs
    /// on the truncated list).
    pub fn get_channel_hashtags(
        &self,
        channel_id: &str,
        limit: Option<i64>,
    ) -> Result<HashtagReport> {
        let channel = required(channel_id, "channel_id")?;
        tracing::debug!(channel_id = channel, "computing channel hashtags");

        let scope = Scope::Channel(ChannelId(channel.to_string()));
        let mut hashtags = self
            .aggregator()
            .compute_tag_counts(&scope, Budget::from_raw(self.config.channel_scan_budget))?;

        if let Some(n) = limit.filter(|n| *n > 0) {
            hashtags.truncate(usize::try_from(n).unwrap_or(usize::MAX));
        }

        Ok(report(hashtags))
    }

    /// Counts across every public channel of a team. `max` defaults to the
    /// configured team budget; `max <= 0` scans everything.
    pub fn get_team_hashtags(&self, team_id: &str, max: Option<i64>) -> Result<HashtagReport> {
        let team = required(team_id, "team_id")?;
        let max = max.unwrap_or(self.config.team_default_max);
        tracing::debug!(team_id = team, max, "computing team hashtags");

        let scope = Scope::Team(TeamId(team.to_string()));
        let hashtags = self
            .aggregator()
            .compute_tag_counts(&scope, Budget::from_raw(max))?;

        Ok(report(hashtags))
    }

    /// Messages containing exactly `tag` (case-sensitive), newest first.
    ///
    /// Without `channel_id` every public channel of every team is scanned.
    pub fn get_messages_for_tag(
        &self,
        tag: &str,
        channel_id: Option<&str>,
    ) -> Result<Vec<TaggedMessage>> {
        let tag = required(tag, "tag")?;
        let channel_id = channel_id.map(str::trim).filter(|c| !c.is_empty());
        tracing::debug!(tag, channel_id, "looking up messages for tag");

        let mut found = match channel_id {
            Some(channel) => self.tagged_in_channel(tag, &ChannelId(channel.to_string()))?,
            None => self.tagged_everywhere(tag)?,
        };

        found.sort_by(|a, b| b.create_at.cmp(&a.create_at).then_with(|| a.id.cmp(&b.id)));
        tracing::debug!(tag, count = found.len(), "tag lookup finished");
        Ok(found)
    }

    /// Paged variant of [`Self::get_messages_for_tag`]. The full match list is
    /// always computed so `total_count` is exact.
    pub fn get_messages_for_tag_page(
        &self,
        tag: &str,
        channel_id: Option<&str>,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<Page<TaggedMessage>> {
        let all = self.get_messages_for_tag(tag, channel_id)?;
        Ok(paginate(all, page, page_size, PageLimits::from(&self.config)))
    }

    fn tagged_in_channel(&self, tag: &str, channel: &ChannelId) -> Result<Vec<TaggedMessage>> {
        match self.store.get_channel(channel) {
            Ok(info) => tracing::debug!(
                channel_id = %channel,
                name = %info.name,
                team_id = %info.team_id,
                "channel info"
            ),
            Err(e) => {
                tracing::warn!(channel_id = %channel, error = %e, "failed to get channel info")
            }
        }

        let mut authors = AuthorFilter::new(self.store.as_ref());
        let mut out = Vec::new();
        self.collect_tagged(tag, channel, &mut authors, &mut out)
            .map_err(|e| {
                tracing::error!(channel_id = %channel, error = %e, "failed to read channel");
                e
            })?;
        Ok(out)
    }

    fn tagged_everywhere(&self, tag: &str) -> Result<Vec<TaggedMessage>> {
        let teams = self.store.list_teams().map_err(|e| {
            tracing::error!(error = %e, "failed to list teams");
            e
        })?;

        let mut authors = AuthorFilter::new(self.store.as_ref());
        let mut visited: HashSet<ChannelId> = HashSet::new();
        let mut out = Vec::new();

        for team in &teams {
            let channels: Vec<ChannelRef> = match self
                .store
                .list_all_public_channels(&team.id, self.config.channel_page_size)
            {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(
                        team_id = %team.id,
                        team = %team.name,
                        error = %e,
                        "skipping team"
                    );
                    continue;
                }
            };
            tracing::debug!(
                team_id = %team.id,
                team = %team.name,
                channels = channels.len(),
                "scanning team for tag"
            );

            for channel in channels {
                if !visited.insert(channel.id.clone()) {
                    continue;
                }
                if let Err(e) = self.collect_tagged(tag, &channel.id, &mut authors, &mut out) {
                    tracing::warn!(channel_id = %channel.id, error = %e, "skipping channel");
                }
            }
        }
        Ok(out)
    }

    fn collect_tagged(
        &self,
        tag: &str,
        channel: &ChannelId,
        authors: &mut AuthorFilter<'_>,
        out: &mut Vec<TaggedMessage>,
    ) -> Result<()> {
        let mut matched = Vec::new();
        let _ = self
            .store
            .walk_channel(channel, self.config.message_page_size, &mut |msg: &Message| {
                if msg.is_system_generated || !self.tokenizer.contains(&msg.text, tag) {
                    return ControlFlow::Continue(());
                }
                if let Some(author) = authors.human(&msg.author_id) {
                    matched.push(TaggedMessage {
                        id: msg.id.clone(),
                        message: msg.text.clone(),
                        create_at: msg.created_at,
                        username: author.display_name.clone(),
                        channel_id: msg.channel_id.0.clone(),
                    });
                }
                ControlFlow::Continue(())
            })?;
        // A channel that fails mid-walk contributes nothing.
        out.append(&mut matched);
        Ok(())
    }
}

fn report(hashtags: Vec<TagCount>) -> HashtagReport {
    let groups = group_by_prefix(&hashtags);
    HashtagReport { hashtags, groups }
}

fn required<'a>(value: &'a str, name: &str) -> Result<&'a str> {
    let v = value.trim();
    if v.is_empty() {
        return Err(Error::invalid(format!("{name} is required")));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::fake::FakeStore;

    fn service(store: FakeStore) -> HashtagService {
        HashtagService::new(
            Arc::new(store),
            QueryConfig {
                message_page_size: 2,
                ..QueryConfig::default()
            },
        )
    }

    fn ids(msgs: &[TaggedMessage]) -> Vec<&str> {
        msgs.iter().map(|m| m.id.as_str()).collect()
    }

    fn two_teams() -> FakeStore {
        FakeStore::new()
            .team("t1")
            .team("t2")
            .channel("t1", "c1")
            .channel("t1", "c2")
            .channel("t2", "c3")
            .author("u", "alice", false)
            .author("v", "bob", false)
            .author("bot", "ci", true)
            .message("c1", "m1", "u", "#Foo release", 10)
            .message("c1", "m2", "bot", "#Foo deployed", 40)
            .message("c1", "m3", "v", "about #foo", 30)
            .message("c2", "m4", "v", "more #Foo and #Foo", 50)
            .message("c3", "m5", "u", "#Foo from team two", 20)
            .message("c3", "m6", "ghost", "#Foo from nobody", 60)
    }

    #[test]
    fn channel_hashtags_count_and_group() {
        let store = FakeStore::new()
            .author("u", "alice", false)
            .message("c", "1", "u", "#db-read #cache", 3)
            .message("c", "2", "u", "#db-write #db-read", 2)
            .message("c", "3", "u", "#solo", 1);

        let r = service(store).get_channel_hashtags("c", None).unwrap();
        let tags: Vec<(&str, u64)> = r.hashtags.iter().map(|t| (t.tag.as_str(), t.count)).collect();
        assert_eq!(
            tags,
            vec![("db-read", 2), ("cache", 1), ("db-write", 1), ("solo", 1)]
        );
        let prefixes: Vec<&str> = r.groups.iter().map(|g| g.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["cache", "db", "solo"]);
    }

    #[test]
    fn channel_limit_truncates_ranking() {
        let store = FakeStore::new()
            .author("u", "alice", false)
            .message("c", "1", "u", "#a #a #b #c", 1);

        let svc = service(store);
        let r = svc.get_channel_hashtags("c", Some(2)).unwrap();
        assert_eq!(r.hashtags.len(), 2);
        assert_eq!(r.hashtags[0].tag, "a");

        let all = svc.get_channel_hashtags("c", Some(0)).unwrap();
        assert_eq!(all.hashtags.len(), 3);
    }

    #[test]
    fn channel_budget_comes_from_config() {
        let store = FakeStore::new()
            .author("u", "alice", false)
            .message("c", "1", "u", "#a #b #c #d", 1);
        let svc = HashtagService::new(
            Arc::new(store),
            QueryConfig {
                channel_scan_budget: 2,
                ..QueryConfig::default()
            },
        );
        let r = svc.get_channel_hashtags("c", None).unwrap();
        assert_eq!(r.hashtags.iter().map(|t| t.count).sum::<u64>(), 2);
    }

    #[test]
    fn missing_ids_are_invalid_arguments() {
        let svc = service(FakeStore::new());
        assert!(svc.get_channel_hashtags("", None).unwrap_err().is_client_error());
        assert!(svc.get_team_hashtags("  ", None).unwrap_err().is_client_error());
        assert!(svc.get_messages_for_tag("", None).unwrap_err().is_client_error());
    }

    #[test]
    fn team_hashtags_default_max() {
        let mut store = FakeStore::new().team("t").channel("t", "c").author("u", "alice", false);
        for i in 0..3 {
            store = store.message("c", &format!("m{i}"), "u", "#x #x #x #x #x", i);
        }
        let svc = HashtagService::new(
            Arc::new(store),
            QueryConfig {
                team_default_max: 7,
                ..QueryConfig::default()
            },
        );
        let r = svc.get_team_hashtags("t", None).unwrap();
        assert_eq!(r.hashtags[0].count, 7);

        let r = svc.get_team_hashtags("t", Some(0)).unwrap();
        assert_eq!(r.hashtags[0].count, 15);
    }

    #[test]
    fn empty_results_serialize_as_arrays() {
        let r = service(FakeStore::new()).get_channel_hashtags("c", None).unwrap();
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, serde_json::json!({"hashtags": [], "groups": []}));
    }

    #[test]
    fn lookup_in_channel_is_case_sensitive_and_newest_first() {
        let svc = service(two_teams());

        let upper = svc.get_messages_for_tag("Foo", Some("c1")).unwrap();
        assert_eq!(ids(&upper), vec!["m1"]);
        assert_eq!(upper[0].username, "alice");
        assert_eq!(upper[0].channel_id, "c1");

        let lower = svc.get_messages_for_tag("foo", Some("c1")).unwrap();
        assert_eq!(ids(&lower), vec!["m3"]);
    }

    #[test]
    fn lookup_everywhere_skips_bots_and_unknown_authors() {
        let found = service(two_teams()).get_messages_for_tag("Foo", None).unwrap();
        assert_eq!(ids(&found), vec!["m4", "m5", "m1"]);
    }

    #[test]
    fn lookup_everywhere_skips_failing_team_and_channel() {
        let store = two_teams().fail_team("t2").fail_channel("c1");
        let found = service(store).get_messages_for_tag("Foo", None).unwrap();
        assert_eq!(ids(&found), vec!["m4"]);
    }

    #[test]
    fn lookup_drops_channel_that_fails_mid_walk() {
        // Pages of 2: c2 serves m4 then fails on the next page.
        let store = two_teams()
            .message("c2", "m7", "v", "#Foo again", 45)
            .message("c2", "m8", "v", "#Foo late", 5)
            .fail_channel_page("c2", 1);
        let found = service(store).get_messages_for_tag("Foo", None).unwrap();
        assert_eq!(ids(&found), vec!["m5", "m1"]);
    }

    #[test]
    fn lookup_everywhere_fails_when_teams_unavailable() {
        let err = service(two_teams().fail_list_teams())
            .get_messages_for_tag("Foo", None)
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn lookup_in_failing_channel_is_fatal() {
        let err = service(two_teams().fail_channel("c1"))
            .get_messages_for_tag("Foo", Some("c1"))
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[test]
    fn lookup_in_unknown_channel_still_scans() {
        let store = FakeStore::new()
            .author("u", "alice", false)
            .message("orphan", "m1", "u", "#x", 1);
        let found = service(store).get_messages_for_tag("x", Some("orphan")).unwrap();
        assert_eq!(ids(&found), vec!["m1"]);
    }

    #[test]
    fn paged_lookup_reports_exact_totals() {
        let mut store = FakeStore::new().author("u", "alice", false);
        for i in 0..25 {
            store = store.message("c", &format!("m{i:02}"), "u", "#x", i);
        }
        let svc = service(store);

        let p = svc.get_messages_for_tag_page("x", Some("c"), Some(3), Some(10)).unwrap();
        assert_eq!(p.total_count, 25);
        assert_eq!(p.items.len(), 5);
        assert!(!p.has_more);
        // Newest first: page 3 holds the five oldest.
        assert_eq!(ids(&p.items), vec!["m04", "m03", "m02", "m01", "m00"]);

        let beyond = svc.get_messages_for_tag_page("x", Some("c"), Some(10), Some(10)).unwrap();
        assert!(beyond.items.is_empty());
        assert!(!beyond.has_more);
    }
}
