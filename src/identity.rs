use std::collections::HashMap;

use slack_morphism::prelude::{SlackBotId, SlackUserId};
use tracing::debug;

use crate::Result;
use crate::slack::{SlackApi, UserRecord};

/// A user or bot id to resolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdentityId<'a> {
    User(&'a SlackUserId),
    Bot(&'a SlackBotId),
}

impl IdentityId<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            IdentityId::User(user) => &user.0,
            IdentityId::Bot(bot) => &bot.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityRecord {
    pub real_name: Option<String>,
    pub display_name: Option<String>,
}

/// Names looked up during this run, keyed by user or bot id.
///
/// An empty cached name counts as unresolved, so it is fetched again on the
/// next request. A user whose names really are empty costs one lookup per
/// request.
#[derive(Debug, Default)]
pub struct IdentityCache {
    records: HashMap<String, IdentityRecord>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|name| !name.is_empty())
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn get(&self, id: &str) -> Option<&IdentityRecord> {
        self.records.get(id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn real_name(&self, id: &str) -> Option<&str> {
        self.records.get(id).and_then(|r| non_empty(&r.real_name))
    }

    fn display_name(&self, id: &str) -> Option<&str> {
        self.records.get(id).and_then(|r| non_empty(&r.display_name))
    }

    fn record_mut(&mut self, id: &str) -> &mut IdentityRecord {
        self.records.entry(id.to_string()).or_default()
    }
}

/// Full name: top-level `real_name`, else the profile's.
fn user_full_name(user: &UserRecord) -> String {
    user.real_name
        .clone()
        .or_else(|| user.profile.real_name.clone())
        .unwrap_or_default()
}

/// Display name: the profile's, else the full name.
fn user_display_name(user: &UserRecord) -> String {
    match non_empty(&user.profile.display_name) {
        Some(name) => name.to_string(),
        None => user_full_name(user),
    }
}

pub struct IdentityResolver<'a, A> {
    api: &'a A,
    cache: IdentityCache,
}

impl<'a, A: SlackApi> IdentityResolver<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self::with_cache(api, IdentityCache::new())
    }

    fn with_cache(api: &'a A, cache: IdentityCache) -> Self {
        Self { api, cache }
    }

    #[cfg(test)]
    fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub fn resolve_full_name(&mut self, id: IdentityId<'_>) -> Result<String> {
        if let Some(name) = self.cache.real_name(id.as_str()) {
            return Ok(name.to_string());
        }

        match id {
            IdentityId::User(user) => {
                let record = self.lookup_user(user)?;
                Ok(record.real_name.unwrap_or_default())
            }
            IdentityId::Bot(bot) => {
                debug!(bot = %bot.0, "looking up bot");
                let name = self.api.bot_info(bot)?.name.unwrap_or_default();
                self.cache.record_mut(&bot.0).real_name = Some(name.clone());
                Ok(name)
            }
        }
    }

    pub fn resolve_display_name(&mut self, user: &SlackUserId) -> Result<String> {
        if let Some(name) = self.cache.display_name(&user.0) {
            return Ok(name.to_string());
        }

        let record = self.lookup_user(user)?;
        Ok(record.display_name.unwrap_or_default())
    }

    /// Fetch a user and refresh both cached names from the response.
    fn lookup_user(&mut self, user: &SlackUserId) -> Result<IdentityRecord> {
        debug!(user = %user.0, "looking up user");
        let info = self.api.user_info(user)?;

        let record = self.cache.record_mut(&user.0);
        record.real_name = Some(user_full_name(&info));
        record.display_name = Some(user_display_name(&info));
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{user, Call, FakeSlack};

    fn user_id(id: &str) -> SlackUserId {
        SlackUserId(id.to_string())
    }

    fn user_lookups(api: &FakeSlack) -> usize {
        api.count_calls(|call| matches!(call, Call::UserInfo(_)))
    }

    #[test]
    fn test_full_name_prefers_top_level_real_name() {
        let api = FakeSlack::new().with_user(serde_json::json!({
            "id": "U1234567",
            "real_name": "Alice Liddell",
            "profile": {"real_name": "Alice L.", "display_name": "alice"}
        }));
        let mut resolver = IdentityResolver::new(&api);

        let id = user_id("U1234567");
        let name = resolver.resolve_full_name(IdentityId::User(&id)).unwrap();

        assert_eq!(name, "Alice Liddell");
    }

    #[test]
    fn test_full_name_falls_back_to_profile() {
        let api = FakeSlack::new().with_user(serde_json::json!({
            "id": "U1234567",
            "profile": {"real_name": "Alice L.", "display_name": ""}
        }));
        let mut resolver = IdentityResolver::new(&api);

        let id = user_id("U1234567");
        let name = resolver.resolve_full_name(IdentityId::User(&id)).unwrap();

        assert_eq!(name, "Alice L.");
    }

    #[test]
    fn test_bot_full_name() {
        let api = FakeSlack::new().with_bot("B0001", "deploybot");
        let mut resolver = IdentityResolver::new(&api);

        let bot = SlackBotId("B0001".to_string());
        let first = resolver.resolve_full_name(IdentityId::Bot(&bot)).unwrap();
        let second = resolver.resolve_full_name(IdentityId::Bot(&bot)).unwrap();

        assert_eq!(first, "deploybot");
        assert_eq!(second, "deploybot");
        assert_eq!(
            api.count_calls(|call| matches!(call, Call::BotInfo(_))),
            1
        );
    }

    #[test]
    fn test_display_name_prefers_profile() {
        let api = FakeSlack::new().with_user(user("U1234567", "Alice Liddell", "alice"));
        let mut resolver = IdentityResolver::new(&api);

        let name = resolver.resolve_display_name(&user_id("U1234567")).unwrap();

        assert_eq!(name, "alice");
    }

    #[test]
    fn test_display_name_falls_back_to_real_name() {
        let api = FakeSlack::new().with_user(user("U1234567", "Alice Liddell", ""));
        let mut resolver = IdentityResolver::new(&api);

        let name = resolver.resolve_display_name(&user_id("U1234567")).unwrap();

        assert_eq!(name, "Alice Liddell");
    }

    #[test]
    fn test_cache_avoids_repeat_lookups() {
        let api = FakeSlack::new().with_user(user("U1234567", "Alice Liddell", "alice"));
        let mut resolver = IdentityResolver::new(&api);
        let id = user_id("U1234567");

        resolver.resolve_full_name(IdentityId::User(&id)).unwrap();
        resolver.resolve_full_name(IdentityId::User(&id)).unwrap();
        resolver.resolve_display_name(&id).unwrap();
        resolver.resolve_display_name(&id).unwrap();

        assert_eq!(user_lookups(&api), 1);
        assert_eq!(
            resolver.cache().get("U1234567"),
            Some(&IdentityRecord {
                real_name: Some("Alice Liddell".to_string()),
                display_name: Some("alice".to_string()),
            })
        );
    }

    #[test]
    fn test_empty_cached_name_is_fetched_again() {
        let api = FakeSlack::new().with_user(user("U1234567", "", ""));
        let mut resolver = IdentityResolver::new(&api);
        let id = user_id("U1234567");

        let first = resolver.resolve_display_name(&id).unwrap();
        assert_eq!(first, "");

        api.set_user(user("U1234567", "", "alice"));
        let second = resolver.resolve_display_name(&id).unwrap();

        assert_eq!(second, "alice");
        assert_eq!(user_lookups(&api), 2);
        assert_eq!(resolver.cache().len(), 1);
    }

    #[test]
    fn test_prefilled_cache_is_used() {
        let api = FakeSlack::new();
        let mut cache = IdentityCache::new();
        cache.record_mut("U7654321").display_name = Some("bob".to_string());
        let mut resolver = IdentityResolver::with_cache(&api, cache);

        let name = resolver.resolve_display_name(&user_id("U7654321")).unwrap();

        assert_eq!(name, "bob");
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_lookup_failure_propagates() {
        let api = FakeSlack::new();
        let mut resolver = IdentityResolver::new(&api);

        let result = resolver.resolve_display_name(&user_id("U0000000"));

        assert!(result.is_err());
        assert!(resolver.cache().is_empty());
    }
}
