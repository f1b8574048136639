use crate::api::types::{Rule, RuleDraft, RuleMutationResponse};
use crate::api::{ApiClient, ApiError};
use crate::domain::GarbageKind;

/// Client-side cache of the full rule set. Mutations go through the API and
/// always refetch the whole list afterwards; nothing is patched locally.
pub struct RuleManager {
    all: Vec<Rule>,
    editing: Option<String>,
}

impl RuleManager {
    pub fn new() -> Self {
        Self {
            all: Vec::new(),
            editing: None,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.all
    }

    pub async fn refresh(&mut self, api: &ApiClient) -> Result<usize, ApiError> {
        self.all = api.list_rules().await?;
        Ok(self.all.len())
    }

    /// Pure, case-insensitive substring filter over item name and reason,
    /// intersected with an optional exact kind match. Never refetches.
    pub fn filter(&self, search: &str, kind: Option<GarbageKind>) -> Vec<&Rule> {
        let needle = search.trim().to_lowercase();
        self.all
            .iter()
            .filter(|rule| {
                let matches_search = needle.is_empty()
                    || rule.item_name.to_lowercase().contains(&needle)
                    || rule.reason.to_lowercase().contains(&needle);
                let matches_kind = kind.map_or(true, |wanted| rule.kind() == wanted);
                matches_search && matches_kind
            })
            .collect()
    }

    /// Marks `item_name` as the update target. Returns the cached rule so
    /// the caller can prefill a draft; None leaves create-intent in place.
    pub fn begin_edit(&mut self, item_name: &str) -> Option<&Rule> {
        let found = self.all.iter().find(|rule| rule.item_name == item_name)?;
        self.editing = Some(item_name.to_string());
        Some(found)
    }

    pub fn begin_create(&mut self) {
        self.editing = None;
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// Create or update, decided by the editing target. The edit intent is
    /// cleared and the cache refetched only after the server confirms.
    pub async fn save(
        &mut self,
        api: &ApiClient,
        draft: &RuleDraft,
    ) -> Result<RuleMutationResponse, ApiError> {
        let confirmation = if self.editing.is_some() {
            api.update_rule(draft).await?
        } else {
            api.create_rule(draft).await?
        };
        self.editing = None;
        self.refresh(api).await?;
        Ok(confirmation)
    }

    pub async fn delete(
        &mut self,
        api: &ApiClient,
        item_name: &str,
    ) -> Result<RuleMutationResponse, ApiError> {
        let confirmation = api.delete_rule(item_name).await?;
        self.refresh(api).await?;
        Ok(confirmation)
    }
}
