use crate::error::SynonymError;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynonymDictionary {
    path: Option<PathBuf>,
    groups: BTreeMap<String, Vec<String>>,
}

impl SynonymDictionary {
    /// Loads the dictionary at `path`. A missing file yields an empty dictionary, which is
    /// written back as `{}`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SynonymError> {
        let path = path.into();
        let existed = path.exists();
        let groups = if existed {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };

        let dictionary = Self {
            path: Some(path),
            groups,
        };
        if !existed {
            dictionary.persist()?;
        }
        Ok(dictionary)
    }

    pub fn groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The first of the comma-separated words becomes the key.
    pub fn add_group(&mut self, input: &str) -> Result<String, SynonymError> {
        if input.trim().is_empty() {
            return Err(SynonymError::EmptyInput);
        }

        let mut words = Vec::new();
        for word in input.split(',').map(|word| word.trim().to_lowercase()) {
            if !word.is_empty() && !words.contains(&word) {
                words.push(word);
            }
        }
        if words.len() < 2 {
            return Err(SynonymError::TooFewWords(words.len()));
        }

        let key = words[0].clone();
        let previous = self.groups.insert(key.clone(), words);
        if let Err(error) = self.persist() {
            match previous {
                Some(previous) => self.groups.insert(key, previous),
                None => self.groups.remove(&key),
            };
            return Err(error);
        }

        info!(key = %key, "synonym group saved");
        Ok(key)
    }

    pub fn remove_group(&mut self, key: &str) -> Result<bool, SynonymError> {
        let key = key.trim().to_lowercase();
        let Some(previous) = self.groups.remove(&key) else {
            return Ok(false);
        };

        if let Err(error) = self.persist() {
            self.groups.insert(key, previous);
            return Err(error);
        }

        info!(key = %key, "synonym group removed");
        Ok(true)
    }

    pub fn expand(&self, query: &str) -> BTreeSet<String> {
        let words = query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>();

        let mut expanded = words.iter().cloned().collect::<BTreeSet<_>>();
        for word in &words {
            for (key, members) in &self.groups {
                if word == key || members.contains(word) {
                    expanded.insert(key.clone());
                    expanded.extend(members.iter().cloned());
                }
            }
        }
        expanded
    }

    fn persist(&self) -> Result<(), SynonymError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.groups)?)?;
        Ok(())
    }
}
