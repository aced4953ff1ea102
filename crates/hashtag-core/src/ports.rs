use std::ops::ControlFlow;

use crate::{domain::*, Result};

/// Read-only port onto the host platform's message store.
///
/// Calls are blocking and are never retried by the core; adapters own any retry
/// policy. Implementations must be safe to call from concurrent queries.
pub trait MessageStore: Send + Sync {
    fn list_teams(&self) -> Result<Vec<TeamRef>>;

    /// Public channels of `team`, `limit` at a time starting at `offset`.
    fn list_public_channels(
        &self,
        team: &TeamId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ChannelRef>>;

    fn get_channel(&self, channel: &ChannelId) -> Result<ChannelRef>;

    /// Page `page` (0-based) of a channel's messages. An empty page ends the channel.
    fn get_messages_page(
        &self,
        channel: &ChannelId,
        page: usize,
        per_page: usize,
    ) -> Result<MessagePage>;

    fn get_author(&self, author: &AuthorId) -> Result<Author>;

    /// Every public channel of `team`, walking the listing `page_size` at a time
    /// until a short page comes back.
    fn list_all_public_channels(&self, team: &TeamId, page_size: usize) -> Result<Vec<ChannelRef>> {
        let page_size = page_size.max(1);
        let mut out = Vec::new();
        let mut offset = 0;
        loop {
            let batch = self.list_public_channels(team, offset, page_size)?;
            let n = batch.len();
            out.extend(batch);
            if n < page_size {
                break;
            }
            offset += n;
        }
        Ok(out)
    }

    /// Walk a channel page by page (page 0 first), handing each message to
    /// `on_message` until the pages run out or the callback breaks.
    ///
    /// Returns `Break` when the callback stopped the walk.
    fn walk_channel(
        &self,
        channel: &ChannelId,
        per_page: usize,
        on_message: &mut dyn FnMut(&Message) -> ControlFlow<()>,
    ) -> Result<ControlFlow<()>> {
        let per_page = per_page.max(1);
        let mut page = 0;
        loop {
            let batch = self.get_messages_page(channel, page, per_page)?;
            if batch.is_empty() {
                return Ok(ControlFlow::Continue(()));
            }
            for msg in batch.iter() {
                if on_message(msg).is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
            page += 1;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeStore;
    use super::*;

    #[test]
    fn lists_channels_across_listing_pages() {
        let mut store = FakeStore::new().team("t").channel("other", "x");
        for i in 0..5 {
            store = store.channel("t", &format!("c{i}"));
        }
        let all = store
            .list_all_public_channels(&TeamId("t".to_string()), 2)
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|c| c.id.0.as_str()).collect();
        assert_eq!(ids, vec!["c0", "c1", "c2", "c3", "c4"]);
    }

    #[test]
    fn walk_stops_when_callback_breaks() {
        let store = FakeStore::new()
            .message("c", "1", "u", "a", 3)
            .message("c", "2", "u", "b", 2)
            .message("c", "3", "u", "c", 1);

        let mut seen = Vec::new();
        let flow = store
            .walk_channel(&ChannelId("c".to_string()), 1, &mut |m: &Message| {
                seen.push(m.id.clone());
                if seen.len() == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert!(flow.is_break());
        assert_eq!(seen, vec!["1", "2"]);
        assert_eq!(store.page_fetches(), 2);
    }

    #[test]
    fn walk_visits_every_page_in_order() {
        let store = FakeStore::new()
            .message("c", "1", "u", "a", 3)
            .message("c", "2", "u", "b", 2)
            .message("c", "3", "u", "c", 1);

        let mut seen = Vec::new();
        let flow = store
            .walk_channel(&ChannelId("c".to_string()), 2, &mut |m: &Message| {
                seen.push(m.id.clone());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert!(flow.is_continue());
        assert_eq!(seen, vec!["1", "2", "3"]);
        // Two full-or-partial pages plus the empty terminator.
        assert_eq!(store.page_fetches(), 3);
    }
}
