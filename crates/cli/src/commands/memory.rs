//! Seed and inspect the agent memory store.
//!
//! # Environment Variables
//!
//! - `SQLAGENT_MEMORY_DIR` - Directory holding `agent_memory.sqlite3` (default: cwd)
//! - `SQLAGENT_MEMORY_COLLECTION` - Collection name (default: `tool_memories`)
//!
//! # Import file format
//!
//! ```yaml
//! - category: business_rules
//!   content: Revenue excludes refunded orders
//! - content: The orders table is partitioned by month
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use sqlagent_server::agent::SqliteAgentMemory;
use sqlagent_server::config::MemoryConfig;

/// One entry of an import file.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct MemorySeed {
    /// Optional grouping label.
    #[serde(default)]
    pub category: Option<String>,
    /// Memory text.
    pub content: String,
}

/// Parse an import file, rejecting entries with blank content.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or an entry is blank.
pub fn parse_seeds(yaml: &str) -> Result<Vec<MemorySeed>, Box<dyn std::error::Error>> {
    let seeds: Vec<MemorySeed> = serde_yaml::from_str(yaml)?;
    if let Some(index) = seeds.iter().position(|s| s.content.trim().is_empty()) {
        return Err(format!("entry {} has empty content", index + 1).into());
    }
    Ok(seeds)
}

async fn open() -> Result<SqliteAgentMemory, Box<dyn std::error::Error>> {
    let config = MemoryConfig::from_env()?;
    let memory = SqliteAgentMemory::open(&config).await?;
    Ok(memory)
}

/// Save one text memory.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or written.
pub async fn add(text: &str, category: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let text = text.trim();
    if text.is_empty() {
        return Err("memory text cannot be empty".into());
    }

    let memory = open().await?;
    let record = memory.save_text_memory(text, category).await?;
    info!(id = record.id, collection = %record.collection, "Memory saved");
    memory.close().await;
    Ok(())
}

/// Save every memory listed in a YAML file.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or the store fails.
pub async fn import(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading memories from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seeds = parse_seeds(&content)?;
    info!(entries = seeds.len(), "Parsed file");

    let memory = open().await?;
    for seed in &seeds {
        memory
            .save_text_memory(seed.content.trim(), seed.category.as_deref())
            .await?;
    }
    info!("Import complete: {} memories saved to '{}'", seeds.len(), memory.collection());
    memory.close().await;
    Ok(())
}

/// Show the most recent memories.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or read.
pub async fn list(limit: u32) -> Result<(), Box<dyn std::error::Error>> {
    let memory = open().await?;
    let records = memory.list(None, limit).await?;

    info!("Agent memories ({})", memory.collection());
    info!("========================");
    for record in &records {
        info!(
            "#{} [{}{}] {}: {}",
            record.id,
            record.kind.as_str(),
            record
                .category
                .as_deref()
                .map(|c| format!("/{c}"))
                .unwrap_or_default(),
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.content
        );
    }
    info!("{} shown", records.len());

    memory.close().await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seeds() {
        let yaml = "- category: business_rules\n  content: Revenue excludes refunds\n- content: Orders are partitioned by month\n";
        let seeds = parse_seeds(yaml).unwrap();
        assert_eq!(
            seeds,
            vec![
                MemorySeed {
                    category: Some("business_rules".to_string()),
                    content: "Revenue excludes refunds".to_string(),
                },
                MemorySeed {
                    category: None,
                    content: "Orders are partitioned by month".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_seeds_rejects_blank_content() {
        let err = parse_seeds("- content: ok\n- content: '  '\n").unwrap_err();
        assert!(err.to_string().contains("entry 2"));
    }

    #[test]
    fn test_parse_seeds_rejects_malformed_yaml() {
        assert!(parse_seeds("content: not-a-list").is_err());
    }

    #[tokio::test]
    async fn test_seeds_land_in_store() {
        let dir = tempfile::tempdir().unwrap();
        let memory = SqliteAgentMemory::open_in(dir.path(), "tool_memories")
            .await
            .unwrap();
        for seed in parse_seeds("- content: a\n- category: c\n  content: b\n").unwrap() {
            memory
                .save_text_memory(&seed.content, seed.category.as_deref())
                .await
                .unwrap();
        }
        assert_eq!(memory.list(None, 10).await.unwrap().len(), 2);
    }
}
