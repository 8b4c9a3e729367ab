//! Game status registry
//!
//! Tracks which configured games are still in rotation and keeps a
//! completion history so the most recent mark-done can be undone.

use thiserror::Error;

/// Whether a game is still in rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Active,
    Completed,
}

/// A configured game and its current status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEntry {
    pub title: String,
    pub status: GameStatus,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("game '{0}' is not in the registry")]
    NotFound(String),

    #[error("game '{0}' is already completed")]
    AlreadyCompleted(String),

    #[error("no completed games to undo")]
    EmptyHistory,
}

/// Ordered set of games plus the LIFO completion history.
///
/// Entries keep their configured order for display and export. They move
/// between `Active` and `Completed` but are never added or removed.
#[derive(Debug, Clone)]
pub struct GameRegistry {
    entries: Vec<GameEntry>,
    history: Vec<String>,
}

impl GameRegistry {
    /// Create a registry with every title active
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = titles
            .into_iter()
            .map(|title| GameEntry {
                title: title.into(),
                status: GameStatus::Active,
            })
            .collect();

        Self {
            entries,
            history: Vec::new(),
        }
    }

    /// Active titles in registry order
    pub fn list_active(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.status == GameStatus::Active)
            .map(|e| e.title.clone())
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == GameStatus::Active)
            .count()
    }

    pub fn completed(&self) -> usize {
        self.entries.len() - self.remaining()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Completed titles, oldest first
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Move a game out of rotation and push it onto the history
    pub fn mark_done(&mut self, title: &str) -> Result<(), RegistryError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.title == title)
            .ok_or_else(|| RegistryError::NotFound(title.to_string()))?;

        if entry.status == GameStatus::Completed {
            return Err(RegistryError::AlreadyCompleted(title.to_string()));
        }

        entry.status = GameStatus::Completed;
        self.history.push(title.to_string());
        Ok(())
    }

    /// Restore the most recently completed game and return its title
    pub fn undo_last(&mut self) -> Result<String, RegistryError> {
        let title = self.history.pop().ok_or(RegistryError::EmptyHistory)?;

        match self.entries.iter_mut().find(|e| e.title == title) {
            Some(entry) => {
                entry.status = GameStatus::Active;
                Ok(title)
            }
            // History only ever holds titles taken from entries
            None => Err(RegistryError::NotFound(title)),
        }
    }
}
