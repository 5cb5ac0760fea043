//! Application state shared across handlers.
//!
//! Built once at startup and handed to axum; every collaborator a handler
//! needs is reachable from here, so there is no global wiring.

use std::sync::Arc;

use thiserror::Error;

use crate::agent::{
    Agent, CookieUserResolver, MemoryError, MySqlRunner, SqliteAgentMemory, ToolRegistry,
};
use crate::config::ServerConfig;
use crate::db::{AdminStore, MySqlAdminStore, RepositoryError};
use crate::llm::{AnthropicLlmService, LlmError};

/// Errors that can occur while wiring the application at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A database URL could not be turned into connection options.
    #[error("database configuration error: {0}")]
    Database(#[from] RepositoryError),

    /// The LLM client could not be built.
    #[error("LLM configuration error: {0}")]
    Llm(#[from] LlmError),

    /// The agent memory store could not be opened.
    #[error("agent memory error: {0}")]
    Memory(#[from] MemoryError),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    admins: Arc<dyn AdminStore>,
    agent: Arc<Agent>,
    sql: Option<MySqlRunner>,
}

impl AppState {
    /// Create state from already-built collaborators.
    ///
    /// `sql` is the query database checked by readiness, if any.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        admins: Arc<dyn AdminStore>,
        agent: Arc<Agent>,
        sql: Option<MySqlRunner>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                admins,
                agent,
                sql,
            }),
        }
    }

    /// Wire every collaborator from configuration.
    ///
    /// No database connection is opened here; the credential store and the
    /// query database connect lazily per call.
    ///
    /// # Errors
    ///
    /// Returns `StartupError` if a URL is malformed, the LLM client cannot be
    /// built, or the memory store cannot be opened.
    pub async fn from_config(config: ServerConfig) -> Result<Self, StartupError> {
        let admins = Arc::new(MySqlAdminStore::new(&config.auth_database_url)?);
        let sql = MySqlRunner::new(&config.sql_database_url)?;
        let llm = Arc::new(AnthropicLlmService::new(&config.llm)?);
        let memory = SqliteAgentMemory::open(&config.memory).await?;
        let resolver = Arc::new(CookieUserResolver::new(config.cookie.name.clone()));
        let tools = ToolRegistry::with_default_tools();

        tracing::info!(
            model = %config.llm.model,
            tools = tools.len(),
            memory = %memory.path().display(),
            "Agent wired"
        );
        let agent = Agent::new(llm, tools, resolver, memory, config.agent);

        Ok(Self::new(config, admins, Arc::new(agent), Some(sql)))
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Admin credential store.
    #[must_use]
    pub fn admins(&self) -> &dyn AdminStore {
        self.inner.admins.as_ref()
    }

    /// The SQL agent.
    #[must_use]
    pub fn agent(&self) -> &Arc<Agent> {
        &self.inner.agent
    }

    /// Query database handle, if configured.
    #[must_use]
    pub fn sql_runner(&self) -> Option<&MySqlRunner> {
        self.inner.sql.as_ref()
    }
}
