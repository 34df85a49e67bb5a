use crate::error::FaqError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaqEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
}

/// Stored question/answer pairs, kept in a JSON array and rewritten on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqBook {
    path: PathBuf,
    entries: Vec<FaqEntry>,
}

impl FaqBook {
    /// A missing file yields an empty book, which is written back as `[]`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, FaqError> {
        let path = path.into();
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let entries = if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw)?
            };
            return Ok(Self { path, entries });
        }

        let book = Self {
            path,
            entries: Vec::new(),
        };
        persist(&book.path, &book.entries)?;
        Ok(book)
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&FaqEntry> {
        self.entries.iter().find(|entry| entry.id == id.trim())
    }

    /// Returns the id of the new entry.
    pub fn add(&mut self, question: &str, answer: &str) -> Result<String, FaqError> {
        let (question, answer) = required(question, answer)?;
        let id = Uuid::new_v4().to_string();
        self.change(|entries| {
            entries.push(FaqEntry {
                id: id.clone(),
                question,
                answer,
            })
        })?;

        info!(id = %id, "faq added");
        Ok(id)
    }

    /// Returns whether an entry with `id` existed.
    pub fn edit(&mut self, id: &str, question: &str, answer: &str) -> Result<bool, FaqError> {
        let (question, answer) = required(question, answer)?;
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        self.change(|entries| {
            entries[index].question = question;
            entries[index].answer = answer;
        })?;
        info!(id = %id.trim(), "faq updated");
        Ok(true)
    }

    pub fn remove(&mut self, id: &str) -> Result<bool, FaqError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        self.change(|entries| {
            entries.remove(index);
        })?;
        info!(id = %id.trim(), "faq removed");
        Ok(true)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id.trim())
    }

    fn change(&mut self, edit: impl FnOnce(&mut Vec<FaqEntry>)) -> Result<(), FaqError> {
        let mut next = self.entries.clone();
        edit(&mut next);
        persist(&self.path, &next)?;
        self.entries = next;
        Ok(())
    }
}

fn required(question: &str, answer: &str) -> Result<(String, String), FaqError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(FaqError::EmptyField("question"));
    }
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(FaqError::EmptyField("answer"));
    }
    Ok((question.to_string(), answer.to_string()))
}

fn persist(path: &Path, entries: &[FaqEntry]) -> Result<(), FaqError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, serde_json::to_vec_pretty(entries)?)?;
    fs::rename(&staging, path)?;
    Ok(())
}
