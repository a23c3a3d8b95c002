use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use super::{as_strs, Index};
use crate::config::paths;
use crate::error::Result;
use crate::http::HttpRequest;

impl Index {
    fn settings_path(&self) -> String {
        self.sub_path(paths::SETTINGS)
    }

    fn setting_path(&self, name: &str) -> String {
        format!("{}/{name}", self.settings_path())
    }

    async fn get_setting(&self, name: &str) -> Result<Value> {
        self.transport
            .send(HttpRequest::get(self.setting_path(name)))
            .await
    }

    async fn update_setting<B: Serialize + ?Sized>(&self, name: &str, body: &B) -> Result<Value> {
        self.transport
            .send(HttpRequest::post_json(self.setting_path(name), body)?)
            .await
    }

    async fn reset_setting(&self, name: &str) -> Result<Value> {
        self.transport
            .send(HttpRequest::delete(self.setting_path(name)))
            .await
    }

    /// All settings of the index in one object.
    pub async fn get_settings(&self) -> Result<Value> {
        self.transport
            .send(HttpRequest::get(self.settings_path()))
            .await
    }

    /// Update any subset of the settings, e.g. `{"rankingRules": [...]}`.
    pub async fn update_settings<B: Serialize + ?Sized>(&self, body: &B) -> Result<Value> {
        self.transport
            .send(HttpRequest::post_json(self.settings_path(), body)?)
            .await
    }

    pub async fn reset_settings(&self) -> Result<Value> {
        self.transport
            .send(HttpRequest::delete(self.settings_path()))
            .await
    }

    pub async fn get_ranking_rules(&self) -> Result<Value> {
        self.get_setting(paths::RANKING_RULES).await
    }

    pub async fn update_ranking_rules<S: AsRef<str>>(&self, rules: &[S]) -> Result<Value> {
        self.update_setting(paths::RANKING_RULES, &as_strs(rules)).await
    }

    pub async fn reset_ranking_rules(&self) -> Result<Value> {
        self.reset_setting(paths::RANKING_RULES).await
    }

    pub async fn get_distinct_attribute(&self) -> Result<Value> {
        self.get_setting(paths::DISTINCT_ATTRIBUTE).await
    }

    pub async fn update_distinct_attribute(&self, attribute: &str) -> Result<Value> {
        self.update_setting(paths::DISTINCT_ATTRIBUTE, attribute).await
    }

    pub async fn reset_distinct_attribute(&self) -> Result<Value> {
        self.reset_setting(paths::DISTINCT_ATTRIBUTE).await
    }

    pub async fn get_searchable_attributes(&self) -> Result<Value> {
        self.get_setting(paths::SEARCHABLE_ATTRIBUTES).await
    }

    pub async fn update_searchable_attributes<S: AsRef<str>>(&self, attributes: &[S]) -> Result<Value> {
        self.update_setting(paths::SEARCHABLE_ATTRIBUTES, &as_strs(attributes))
            .await
    }

    pub async fn reset_searchable_attributes(&self) -> Result<Value> {
        self.reset_setting(paths::SEARCHABLE_ATTRIBUTES).await
    }

    pub async fn get_displayed_attributes(&self) -> Result<Value> {
        self.get_setting(paths::DISPLAYED_ATTRIBUTES).await
    }

    pub async fn update_displayed_attributes<S: AsRef<str>>(&self, attributes: &[S]) -> Result<Value> {
        self.update_setting(paths::DISPLAYED_ATTRIBUTES, &as_strs(attributes))
            .await
    }

    pub async fn reset_displayed_attributes(&self) -> Result<Value> {
        self.reset_setting(paths::DISPLAYED_ATTRIBUTES).await
    }

    pub async fn get_stop_words(&self) -> Result<Value> {
        self.get_setting(paths::STOP_WORDS).await
    }

    pub async fn update_stop_words<S: AsRef<str>>(&self, words: &[S]) -> Result<Value> {
        self.update_setting(paths::STOP_WORDS, &as_strs(words)).await
    }

    pub async fn reset_stop_words(&self) -> Result<Value> {
        self.reset_setting(paths::STOP_WORDS).await
    }

    pub async fn get_synonyms(&self) -> Result<Value> {
        self.get_setting(paths::SYNONYMS).await
    }

    /// Replace the synonym map, e.g. `{"wolverine": ["logan", "xmen"]}`.
    pub async fn update_synonyms(&self, synonyms: &HashMap<String, Vec<String>>) -> Result<Value> {
        self.update_setting(paths::SYNONYMS, synonyms).await
    }

    pub async fn reset_synonyms(&self) -> Result<Value> {
        self.reset_setting(paths::SYNONYMS).await
    }

    pub async fn get_filterable_attributes(&self) -> Result<Value> {
        self.get_setting(paths::FILTERABLE_ATTRIBUTES).await
    }

    pub async fn update_filterable_attributes<S: AsRef<str>>(&self, attributes: &[S]) -> Result<Value> {
        self.update_setting(paths::FILTERABLE_ATTRIBUTES, &as_strs(attributes))
            .await
    }

    pub async fn reset_filterable_attributes(&self) -> Result<Value> {
        self.reset_setting(paths::FILTERABLE_ATTRIBUTES).await
    }

    pub async fn get_sortable_attributes(&self) -> Result<Value> {
        self.get_setting(paths::SORTABLE_ATTRIBUTES).await
    }

    pub async fn update_sortable_attributes<S: AsRef<str>>(&self, attributes: &[S]) -> Result<Value> {
        self.update_setting(paths::SORTABLE_ATTRIBUTES, &as_strs(attributes))
            .await
    }

    pub async fn reset_sortable_attributes(&self) -> Result<Value> {
        self.reset_setting(paths::SORTABLE_ATTRIBUTES).await
    }
}
