//! Tag frequency counting over a channel or a whole team.

use std::{
    collections::{hash_map::Entry, HashMap},
    ops::ControlFlow,
};

use serde::Serialize;

use crate::{
    config::QueryConfig,
    domain::{Author, AuthorId, ChannelId, ChannelRef, Message, TeamId},
    ports::MessageStore,
    tokenizer::Tokenizer,
    Result,
};

/// How often one tag was used within a scanned scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
    /// `created_at` of the earliest counted occurrence.
    #[serde(rename = "createAt")]
    pub create_at: i64,
    /// `created_at` of the latest counted occurrence.
    #[serde(rename = "lastUsed")]
    pub last_used: i64,
}

/// Soft cap on tag occurrences examined by one scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Budget {
    Limited(u64),
    Unbounded,
}

impl Budget {
    /// Any value `<= 0` means "no cap".
    pub fn from_raw(n: i64) -> Self {
        if n <= 0 {
            Self::Unbounded
        } else {
            Self::Limited(n as u64)
        }
    }

    fn reached(self, total: u64) -> bool {
        match self {
            Self::Limited(cap) => total >= cap,
            Self::Unbounded => false,
        }
    }

    fn remaining(self, spent: u64) -> Self {
        match self {
            Self::Limited(cap) => Self::Limited(cap.saturating_sub(spent)),
            Self::Unbounded => Self::Unbounded,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    Channel(ChannelId),
    Team(TeamId),
}

/// Request-local author resolution.
///
/// Each id hits the store once per query. Lookup failures are remembered as
/// exclusions, the same as automated accounts.
pub(crate) struct AuthorFilter<'a> {
    store: &'a dyn MessageStore,
    seen: HashMap<AuthorId, Option<Author>>,
}

impl<'a> AuthorFilter<'a> {
    pub(crate) fn new(store: &'a dyn MessageStore) -> Self {
        Self {
            store,
            seen: HashMap::new(),
        }
    }

    /// The author if it resolves to a human account.
    pub(crate) fn human(&mut self, id: &AuthorId) -> Option<&Author> {
        let entry = match self.seen.entry(id.clone()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let resolved = match self.store.get_author(id) {
                    Ok(author) if author.is_automated => None,
                    Ok(author) => Some(author),
                    Err(e) => {
                        tracing::debug!(
                            author_id = %id,
                            error = %e,
                            "author lookup failed; excluding"
                        );
                        None
                    }
                };
                e.insert(resolved)
            }
        };
        entry.as_ref()
    }
}

#[derive(Debug)]
struct TagStats {
    count: u64,
    first: i64,
    last: i64,
}

/// Per-query accumulator.
struct Tally {
    budget: Budget,
    total: u64,
    stats: HashMap<String, TagStats>,
}

impl Tally {
    fn new(budget: Budget) -> Self {
        Self {
            budget,
            total: 0,
            stats: HashMap::new(),
        }
    }

    fn exhausted(&self) -> bool {
        self.budget.reached(self.total)
    }

    /// Empty tally holding whatever budget is left, for one channel.
    fn scratch(&self) -> Self {
        Self::new(self.budget.remaining(self.total))
    }

    fn merge(&mut self, other: Tally) {
        self.total += other.total;
        for (tag, s) in other.stats {
            match self.stats.entry(tag) {
                Entry::Occupied(mut e) => {
                    let mine = e.get_mut();
                    mine.count += s.count;
                    mine.first = mine.first.min(s.first);
                    mine.last = mine.last.max(s.last);
                }
                Entry::Vacant(e) => {
                    e.insert(s);
                }
            }
        }
    }

    /// Count every tag occurrence in `msg`, stopping at the budget.
    fn record(&mut self, tokenizer: &Tokenizer, msg: &Message) -> ControlFlow<()> {
        for tag in tokenizer.extract(&msg.text) {
            if self.exhausted() {
                return ControlFlow::Break(());
            }
            self.total += 1;
            match self.stats.get_mut(tag) {
                Some(s) => {
                    s.count += 1;
                    s.first = s.first.min(msg.created_at);
                    s.last = s.last.max(msg.created_at);
                }
                None => {
                    self.stats.insert(
                        tag.to_string(),
                        TagStats {
                            count: 1,
                            first: msg.created_at,
                            last: msg.created_at,
                        },
                    );
                }
            }
        }
        if self.exhausted() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn into_counts(self) -> Vec<TagCount> {
        let mut out: Vec<TagCount> = self
            .stats
            .into_iter()
            .map(|(tag, s)| TagCount {
                tag,
                count: s.count,
                create_at: s.first,
                last_used: s.last,
            })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        out
    }
}

/// Walks the store for one scope and counts tags.
pub struct Aggregator<'a> {
    store: &'a dyn MessageStore,
    tokenizer: &'a Tokenizer,
    config: &'a QueryConfig,
}

impl<'a> Aggregator<'a> {
    pub fn new(
        store: &'a dyn MessageStore,
        tokenizer: &'a Tokenizer,
        config: &'a QueryConfig,
    ) -> Self {
        Self {
            store,
            tokenizer,
            config,
        }
    }

    /// Counts sorted by count descending, then tag ascending.
    pub fn compute_tag_counts(&self, scope: &Scope, budget: Budget) -> Result<Vec<TagCount>> {
        let mut tally = Tally::new(budget);
        let mut authors = AuthorFilter::new(self.store);

        match scope {
            Scope::Channel(channel) => {
                let _ = self.scan_channel(channel, &mut tally, &mut authors)?;
            }
            Scope::Team(team) => {
                let channels = self
                    .store
                    .list_all_public_channels(team, self.config.channel_page_size)
                    .map_err(|e| {
                        tracing::error!(team_id = %team, error = %e, "failed to list channels");
                        e
                    })?;
                tracing::debug!(team_id = %team, channels = channels.len(), "scanning team");
                self.scan_team(&channels, &mut tally, &mut authors)?;
            }
        }

        tracing::debug!(
            occurrences = tally.total,
            distinct = tally.stats.len(),
            budget_reached = tally.exhausted(),
            "tag count finished"
        );
        Ok(tally.into_counts())
    }

    fn scan_team(
        &self,
        channels: &[ChannelRef],
        tally: &mut Tally,
        authors: &mut AuthorFilter<'_>,
    ) -> Result<()> {
        for (idx, channel) in channels.iter().enumerate() {
            match self.scan_channel(&channel.id, tally, authors) {
                Ok(ControlFlow::Break(())) => break,
                Ok(ControlFlow::Continue(())) => {}
                Err(e) if idx == 0 => {
                    tracing::error!(
                        channel_id = %channel.id,
                        error = %e,
                        "failed to read first channel"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(channel_id = %channel.id, error = %e, "skipping channel");
                }
            }
        }
        Ok(())
    }

    /// `Break` once the budget is spent. A channel that fails mid-walk leaves
    /// `tally` untouched.
    fn scan_channel(
        &self,
        channel: &ChannelId,
        tally: &mut Tally,
        authors: &mut AuthorFilter<'_>,
    ) -> Result<ControlFlow<()>> {
        if tally.exhausted() {
            return Ok(ControlFlow::Break(()));
        }
        let mut scratch = tally.scratch();
        let flow = self.store.walk_channel(
            channel,
            self.config.message_page_size,
            &mut |msg: &Message| {
                if msg.is_system_generated || authors.human(&msg.author_id).is_none() {
                    return ControlFlow::Continue(());
                }
                scratch.record(self.tokenizer, msg)
            },
        )?;
        tally.merge(scratch);
        Ok(flow)
    }
}
