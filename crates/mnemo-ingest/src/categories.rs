//! Repository category preferences
//!
//! A persisted map from repositories to categories with a deterministic
//! lookup order: exact `owner/repo` match, then owner default, then the
//! global `*` default.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mnemo_core::Category;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Persisted category assignments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryMap {
    /// Keys are `owner/repo`, `owner`, or `*`
    #[serde(flatten)]
    entries: BTreeMap<String, Category>,
}

/// Manages repository category preferences, persisted as JSON
#[derive(Debug, Clone)]
pub struct CategoryManager {
    path: PathBuf,
    map: CategoryMap,
}

impl CategoryManager {
    /// Load the map from `path`, starting empty when absent
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let map = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            CategoryMap::default()
        };
        Ok(Self { path, map })
    }

    /// Resolve a category: exact match, owner default, global default
    pub fn get(&self, repo_full_name: &str) -> Option<Category> {
        if let Some(category) = self.map.entries.get(repo_full_name) {
            return Some(*category);
        }

        if let Some(owner) = repo_full_name.split('/').next() {
            if let Some(category) = self.map.entries.get(owner) {
                return Some(*category);
            }
        }

        self.map.entries.get("*").copied()
    }

    /// Set the category for one repository
    pub fn set(&mut self, repo_full_name: &str, category: Category) -> Result<()> {
        self.map
            .entries
            .insert(repo_full_name.to_string(), category);
        self.save()
    }

    /// Set the default category for all of an owner's repositories
    pub fn set_owner_default(&mut self, owner: &str, category: Category) -> Result<()> {
        self.map.entries.insert(owner.to_string(), category);
        self.save()
    }

    /// Set the global default category
    pub fn set_global_default(&mut self, category: Category) -> Result<()> {
        self.map.entries.insert("*".to_string(), category);
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.map)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, CategoryManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = CategoryManager::load(dir.path().join("categories.json")).unwrap();
        (dir, manager)
    }

    #[test]
    fn test_lookup_order() {
        let (_dir, mut manager) = manager();
        manager.set_global_default(Category::Personal).unwrap();
        manager.set_owner_default("acme", Category::Trabajo).unwrap();
        manager.set("acme/special", Category::Opensource).unwrap();

        // Exact beats owner beats global
        assert_eq!(manager.get("acme/special"), Some(Category::Opensource));
        assert_eq!(manager.get("acme/other"), Some(Category::Trabajo));
        assert_eq!(manager.get("stranger/repo"), Some(Category::Personal));
    }

    #[test]
    fn test_empty_map_yields_none() {
        let (_dir, manager) = manager();
        assert_eq!(manager.get("any/repo"), None);
    }

    #[test]
    fn test_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");

        let mut manager = CategoryManager::load(&path).unwrap();
        manager.set("acme/widget", Category::Hobby).unwrap();

        let reloaded = CategoryManager::load(&path).unwrap();
        assert_eq!(reloaded.get("acme/widget"), Some(Category::Hobby));
    }
}
