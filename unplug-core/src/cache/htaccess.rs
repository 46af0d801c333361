//! The rewrite configuration file and its managed section
//!
//! [`RewriteConfig`] is the pure line model: parse, splice, render.
//! [`RewriteFile`] does the IO around it under an exclusive lock so that
//! concurrent workers inserting rules never clobber each other.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::debug;

use super::rule::Rule;
use crate::{Error, Result};

pub const SECTION_BEGIN: &str = "# BEGIN Unplug";
pub const SECTION_END: &str = "# END Unplug";
pub const RULES_BEGIN: &str = "# BEGIN Unplug rules";
pub const RULES_END: &str = "# END Unplug rules";

/// Used when the file carries no `RewriteBase` directive
pub const DEFAULT_REWRITE_BASE: &str = "RewriteBase /";

const REWRITE_BASE_PREFIX: &str = "RewriteBase ";

/// Lines of a rewrite configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteConfig {
    lines: Vec<String>,
}

impl RewriteConfig {
    pub fn parse(text: &str) -> Self {
        Self { lines: text.split('\n').map(str::to_string).collect() }
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The managed section, synthesized in front of existing content when
    /// the file has none yet
    pub fn section_template(rewrite_base: &str) -> Vec<String> {
        [
            SECTION_BEGIN,
            "<IfModule mod_rewrite.c>",
            "RewriteEngine On",
            rewrite_base,
            RULES_BEGIN,
            RULES_END,
            "</IfModule>",
            SECTION_END,
            "",
        ]
        .iter()
        .map(|line| line.to_string())
        .collect()
    }

    /// The first `RewriteBase` line, or `RewriteBase /`
    pub fn rewrite_base(&self) -> &str {
        self.lines
            .iter()
            .find(|line| line.starts_with(REWRITE_BASE_PREFIX))
            .map(|line| line.trim_end_matches('\r'))
            .unwrap_or(DEFAULT_REWRITE_BASE)
    }

    fn position(&self, marker: &str) -> Option<usize> {
        self.lines.iter().position(|line| line.trim_end() == marker)
    }

    pub fn has_section(&self) -> bool {
        self.position(SECTION_BEGIN).is_some() && self.position(SECTION_END).is_some()
    }

    /// Indices of the lines strictly between the rules markers
    pub fn rules_range(&self) -> Option<Range<usize>> {
        let begin = self.position(RULES_BEGIN)?;
        let end = self.position(RULES_END)?;
        (begin < end).then_some(begin + 1..end)
    }

    pub fn rules(&self) -> &[String] {
        match self.rules_range() {
            Some(range) => &self.lines[range],
            None => &[],
        }
    }

    /// True when `rule` occurs in the rules section at a stride boundary
    pub fn rule_exists(&self, rule: &Rule) -> bool {
        if rule.is_empty() {
            return false;
        }
        self.rules().chunks_exact(rule.len()).any(|window| window == rule.lines())
    }

    /// Append `rule` at the end of the rules section, creating the managed
    /// section first if it is missing
    pub fn insert_rule(&mut self, rule: &Rule) {
        let end = match self.position(RULES_END) {
            Some(end) => end,
            None => {
                let mut lines = Self::section_template(self.rewrite_base());
                let end = lines.len() - 4;
                lines.append(&mut self.lines);
                self.lines = lines;
                end
            }
        };

        let tail = self.lines.split_off(end);
        self.lines.extend(rule.lines().iter().cloned());
        self.lines.extend(tail);
    }

    /// Drop every line between the rules markers, keeping the markers.
    /// Returns the number of lines removed.
    pub fn remove_all_rules(&mut self) -> usize {
        match self.rules_range() {
            Some(range) => self.lines.drain(range).count(),
            None => 0,
        }
    }
}

/// Locked access to a rewrite configuration file on disk
#[derive(Debug, Clone)]
pub struct RewriteFile {
    path: PathBuf,
}

impl RewriteFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Find `name` in `start` or the nearest parent directory holding one
    pub fn locate(start: &Path, name: &str) -> Result<Self> {
        let found = start.ancestors().map(|dir| dir.join(name)).find(|path| path.is_file());

        match found {
            Some(path) => {
                debug!("Using rewrite file {}", path.display());
                Ok(Self::new(path))
            }
            None => Err(Error::RewriteFileNotFound {
                name: name.to_string(),
                start: start.to_path_buf(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the rewrite file lives in
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// Read without locking
    pub fn read(&self) -> Result<RewriteConfig> {
        let text = fs::read_to_string(&self.path)
            .map_err(|source| Error::Read { path: self.path.clone(), source })?;
        Ok(RewriteConfig::parse(&text))
    }

    /// Read, modify and write back while holding an exclusive lock.
    ///
    /// The file is only rewritten when `change` actually altered the lines.
    pub fn update<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut RewriteConfig) -> T,
    {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|source| Error::Read { path: self.path.clone(), source })?;

        file.lock().map_err(|source| Error::Lock { path: self.path.clone(), source })?;
        let result = self.update_locked(&mut file, change);
        file.unlock().map_err(|source| Error::Lock { path: self.path.clone(), source })?;

        result
    }

    fn update_locked<T, F>(&self, file: &mut File, change: F) -> Result<T>
    where
        F: FnOnce(&mut RewriteConfig) -> T,
    {
        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|source| Error::Read { path: self.path.clone(), source })?;

        let before = RewriteConfig::parse(&text);
        let mut config = before.clone();
        let outcome = change(&mut config);

        if config != before {
            let write = |file: &mut File| -> std::io::Result<()> {
                file.set_len(0)?;
                file.seek(SeekFrom::Start(0))?;
                file.write_all(config.render().as_bytes())?;
                file.sync_all()
            };
            write(file).map_err(|source| Error::Write { path: self.path.clone(), source })?;
        }

        Ok(outcome)
    }
}
