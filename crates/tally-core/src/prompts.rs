//! Prompt library for the LLM-backed features
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tally/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Users can tune wording without rebuilding, and still pick up new default
//! prompts on upgrade.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const CATEGORIZE_TRANSACTION: &str =
        include_str!("../../../prompts/categorize_transaction.md");
    pub const FINANCIAL_INSIGHTS: &str = include_str!("../../../prompts/financial_insights.md");
    pub const ANSWER_QUERY: &str = include_str!("../../../prompts/answer_query.md");
    pub const FINANCIAL_SUMMARY: &str = include_str!("../../../prompts/financial_summary.md");
    pub const DETECT_ANOMALIES: &str = include_str!("../../../prompts/detect_anomalies.md");
    pub const PREDICT_TRANSACTIONS: &str =
        include_str!("../../../prompts/predict_transactions.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    CategorizeTransaction,
    FinancialInsights,
    AnswerQuery,
    FinancialSummary,
    DetectAnomalies,
    PredictTransactions,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CategorizeTransaction => "categorize_transaction",
            Self::FinancialInsights => "financial_insights",
            Self::AnswerQuery => "answer_query",
            Self::FinancialSummary => "financial_summary",
            Self::DetectAnomalies => "detect_anomalies",
            Self::PredictTransactions => "predict_transactions",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[
            Self::CategorizeTransaction,
            Self::FinancialInsights,
            Self::AnswerQuery,
            Self::FinancialSummary,
            Self::DetectAnomalies,
            Self::PredictTransactions,
        ]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::CategorizeTransaction => defaults::CATEGORIZE_TRANSACTION,
            Self::FinancialInsights => defaults::FINANCIAL_INSIGHTS,
            Self::AnswerQuery => defaults::ANSWER_QUERY,
            Self::FinancialSummary => defaults::FINANCIAL_SUMMARY,
            Self::DetectAnomalies => defaults::DETECT_ANOMALIES,
            Self::PredictTransactions => defaults::PREDICT_TRANSACTIONS,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown prompt: {}", s))
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    /// Bumped whenever the wording changes
    pub version: u32,
    /// Kind of work the prompt asks for (classification, reasoning, narrative, ...)
    pub task_type: String,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// The prompt content (system + user sections)
    pub content: String,
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

/// A prompt with its variables substituted, ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the whole prompt with template variables replaced
    pub fn render(&self, vars: &HashMap<&str, &str>) -> String {
        render_template(&self.content, vars)
    }

    /// Render just the user section (or the whole prompt if it has no sections)
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        match self.user_section() {
            Some(user) => render_template(user, vars),
            None => self.render(vars),
        }
    }

    /// Render both sections
    pub fn render_parts(&self, vars: &HashMap<&str, &str>) -> RenderedPrompt {
        RenderedPrompt {
            system: self
                .system_section()
                .map(|s| render_template(s, vars))
                .filter(|s| !s.trim().is_empty()),
            user: self.render_user(vars),
        }
    }
}

/// Conditionals first, so `{{var}}` inside a dropped block never leaks
fn render_template(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = resolve_conditionals(template, vars);
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}

/// Prompt library for loading and caching prompts
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Create a prompt library with the default override directory
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        if !self.cache.contains_key(&id) {
            let prompt = self.load(id)?;
            self.cache.insert(id, prompt);
        }
        self.cache
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Prompt {}", id.as_str())))
    }

    /// Render a prompt's system and user sections in one step
    pub fn render(&mut self, id: PromptId, vars: &HashMap<&str, &str>) -> Result<RenderedPrompt> {
        Ok(self.get(id)?.render_parts(vars))
    }

    fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(ref override_dir) = self.override_dir {
            let override_path = override_dir.join(format!("{}.md", id.as_str()));
            if override_path.exists() {
                let content = fs::read_to_string(&override_path).map_err(|e| {
                    Error::InvalidData(format!("Failed to read prompt override: {}", e))
                })?;
                let (metadata, body) = parse_prompt(&content)?;
                return Ok(Prompt {
                    metadata,
                    content: body,
                    is_override: true,
                    override_path: Some(override_path),
                });
            }
        }

        let (metadata, body) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        })
    }

    /// List all prompts with their override status
    pub fn list(&mut self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let has_override = self.has_override(id);
                let override_path = if has_override {
                    self.override_dir
                        .as_ref()
                        .map(|d| d.join(format!("{}.md", id.as_str())))
                } else {
                    None
                };
                let prompt = self.get(id).ok();
                PromptInfo {
                    id: id.as_str().to_string(),
                    version: prompt.map(|p| p.metadata.version).unwrap_or(0),
                    task_type: prompt
                        .map(|p| p.metadata.task_type.clone())
                        .unwrap_or_default(),
                    has_override,
                    override_path,
                }
            })
            .collect()
    }

    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_dir
            .as_ref()
            .is_some_and(|dir| dir.join(format!("{}.md", id.as_str())).exists())
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Clear the cache (useful after editing override files)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: String,
    pub version: u32,
    pub task_type: String,
    pub has_override: bool,
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("prompts").join("overrides"))
}

/// Split `---` YAML frontmatter from the markdown body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let rest = content
        .trim()
        .strip_prefix("---")
        .ok_or_else(|| Error::InvalidData("Prompt has no YAML frontmatter".into()))?;
    let (frontmatter, body) = rest
        .split_once("---")
        .ok_or_else(|| Error::InvalidData("Prompt frontmatter is never closed".into()))?;

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter.trim())
        .map_err(|e| Error::InvalidData(format!("Bad prompt frontmatter: {}", e)))?;
    Ok((metadata, body.trim().to_string()))
}

/// Text under a `# Heading`, up to the next top-level heading
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let (_, tail) = content.split_once(header)?;
    let section = match tail.find("\n# ") {
        Some(next) => &tail[..next],
        None => tail,
    };
    Some(section.trim())
}

/// Resolve `{{#if var}}...{{/if}}` blocks: keep the body when `var` is non-empty
fn resolve_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    const OPEN: &str = "{{#if ";
    const CLOSE: &str = "{{/if}}";

    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(at) = rest.find(OPEN) {
        let after_open = &rest[at + OPEN.len()..];
        let Some((name, block_and_tail)) = after_open.split_once("}}") else {
            break;
        };
        let Some((block, tail)) = block_and_tail.split_once(CLOSE) else {
            break;
        };

        out.push_str(&rest[..at]);
        if vars.get(name.trim()).is_some_and(|v| !v.trim().is_empty()) {
            out.push_str(block);
        }
        rest = tail;
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt() {
        let content = r#"---
id: test_prompt
version: 1
task_type: classification
---

# System
Test system prompt.

# User
Test user prompt with {{variable}}.
"#;

        let (metadata, body) = parse_prompt(content).unwrap();
        assert_eq!(metadata.id, "test_prompt");
        assert_eq!(metadata.version, 1);
        assert_eq!(metadata.task_type, "classification");
        assert!(body.contains("# System"));
        assert!(body.contains("# User"));
    }

    #[test]
    fn test_parse_prompt_requires_frontmatter() {
        assert!(parse_prompt("# System\nhi").is_err());
        assert!(parse_prompt("---\nid: x\n# System").is_err());
    }

    #[test]
    fn test_extract_section() {
        let content = "# System\nSystem content here.\n\n# User\nUser content here.";

        assert_eq!(
            extract_section(content, "# System"),
            Some("System content here.")
        );
        assert_eq!(extract_section(content, "# User"), Some("User content here."));
        assert_eq!(extract_section(content, "# Examples"), None);
    }

    #[test]
    fn test_render_parts() {
        let content = "---\nid: t\nversion: 1\ntask_type: t\n---\n# System\nYou are {{role}}.\n\n# User\nHello {{name}}{{#if extra}}, {{extra}}{{/if}}!";
        let (metadata, body) = parse_prompt(content).unwrap();
        let prompt = Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        };

        let mut vars = HashMap::new();
        vars.insert("role", "helpful");
        vars.insert("name", "World");

        let rendered = prompt.render_parts(&vars);
        assert_eq!(rendered.system.as_deref(), Some("You are helpful."));
        assert_eq!(rendered.user, "Hello World!");

        vars.insert("extra", "friend");
        assert_eq!(prompt.render_user(&vars), "Hello World, friend!");
    }

    #[test]
    fn test_conditional_blocks() {
        let content = "Start{{#if category}}\nCategory: {{category}}{{/if}}\nEnd";

        let mut vars = HashMap::new();
        vars.insert("category", "Groceries");
        let result = resolve_conditionals(content, &vars);
        assert!(result.contains("Category: {{category}}"));

        let empty_vars: HashMap<&str, &str> = HashMap::new();
        let result = resolve_conditionals(content, &empty_vars);
        assert!(!result.contains("Category:"));
        assert!(result.contains("Start"));
        assert!(result.contains("End"));
    }

    #[test]
    fn test_prompt_library_embedded() {
        let mut lib = PromptLibrary::embedded_only();
        for id in PromptId::all() {
            let prompt = lib.get(*id).unwrap();
            assert!(!prompt.is_override);
            assert!(prompt.system_section().is_some(), "{} has no system", id.as_str());
            assert!(prompt.user_section().is_some(), "{} has no user", id.as_str());
        }
        assert_eq!(lib.list().len(), 6);
    }

    #[test]
    fn test_override_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("financial_summary.md"),
            "---\nid: financial_summary\nversion: 9\ntask_type: narrative\n---\n# System\nBe brief.\n\n# User\nSummarize {{period}}.",
        )
        .unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        assert!(lib.has_override(PromptId::FinancialSummary));
        assert!(!lib.has_override(PromptId::AnswerQuery));

        let mut vars = HashMap::new();
        vars.insert("period", "all time");
        let rendered = lib.render(PromptId::FinancialSummary, &vars).unwrap();
        assert_eq!(rendered.user, "Summarize all time.");

        let info = lib
            .list()
            .into_iter()
            .find(|p| p.id == "financial_summary")
            .unwrap();
        assert_eq!(info.version, 9);
        assert!(info.override_path.is_some());
    }

    #[test]
    fn test_prompt_id_from_str() {
        assert_eq!("answer_query".parse::<PromptId>(), Ok(PromptId::AnswerQuery));
        assert!("explore_agent".parse::<PromptId>().is_err());
    }

    #[test]
    fn test_default_prompts_parse() {
        for id in PromptId::all() {
            let (metadata, _) = parse_prompt(id.default_content())
                .unwrap_or_else(|e| panic!("Failed to parse {}: {}", id.as_str(), e));
            assert_eq!(metadata.id, id.as_str(), "Prompt ID mismatch");
        }
    }
}
