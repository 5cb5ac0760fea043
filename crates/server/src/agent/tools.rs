//! Tool registry with group-based access control.
//!
//! Each tool is registered together with the capability groups allowed to
//! use it. A user sees, and may invoke, exactly the tools whose groups
//! intersect its memberships.

use serde_json::json;

use sqlagent_core::{ADMIN_GROUP, User};

use crate::llm::ToolSpec;

/// Tool names registered by [`ToolRegistry::with_default_tools`].
pub mod names {
    /// Execute SQL against the query database.
    pub const RUN_SQL: &str = "run_sql";
    /// Render a chart from a query result.
    pub const VISUALIZE_DATA: &str = "visualize_data";
    /// Remember a question and the tool arguments that answered it.
    pub const SAVE_QUESTION_TOOL_ARGS: &str = "save_question_tool_args";
    /// Look up previously saved question/tool-argument pairs.
    pub const SEARCH_SAVED_CORRECT_TOOL_USES: &str = "search_saved_correct_tool_uses";
    /// Store free-form domain knowledge.
    pub const SAVE_TEXT_MEMORY: &str = "save_text_memory";
}

#[derive(Debug, Clone)]
struct RegisteredTool {
    spec: ToolSpec,
    access_groups: Vec<String>,
}

impl RegisteredTool {
    fn allows(&self, user: &User) -> bool {
        user.is_member_of_any(self.access_groups.as_slice())
    }
}

/// Registry of tools the agent can advertise.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the standard SQL agent tools, each
    /// restricted to the `admin` group.
    #[must_use]
    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();
        for spec in default_tool_specs() {
            registry.register_local_tool(spec, [ADMIN_GROUP]);
        }
        registry
    }

    /// Register a tool usable by members of any of `access_groups`.
    ///
    /// Registering a name twice replaces the earlier entry.
    pub fn register_local_tool<I, S>(&mut self, spec: ToolSpec, access_groups: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tool = RegisteredTool {
            spec,
            access_groups: access_groups.into_iter().map(Into::into).collect(),
        };
        match self.tools.iter_mut().find(|t| t.spec.name == tool.spec.name) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    /// Tools the user may use, in registration order.
    #[must_use]
    pub fn tools_for(&self, user: &User) -> Vec<&ToolSpec> {
        self.tools
            .iter()
            .filter(|t| t.allows(user))
            .map(|t| &t.spec)
            .collect()
    }

    /// Whether the user may invoke the named tool. Unknown tools are denied.
    #[must_use]
    pub fn authorize(&self, user: &User, tool_name: &str) -> bool {
        self.tools
            .iter()
            .find(|t| t.spec.name == tool_name)
            .is_some_and(|t| t.allows(user))
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn default_tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: names::RUN_SQL.to_string(),
            description: "Run a read-only SQL query against the reporting database and return the rows.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sql": { "type": "string", "description": "The SQL statement to execute" }
                },
                "required": ["sql"]
            }),
        },
        ToolSpec {
            name: names::VISUALIZE_DATA.to_string(),
            description: "Render a chart from the result of a previous query.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": { "type": "string", "description": "Result file produced by run_sql" },
                    "title": { "type": "string", "description": "Chart title" }
                },
                "required": ["filename"]
            }),
        },
        ToolSpec {
            name: names::SAVE_QUESTION_TOOL_ARGS.to_string(),
            description: "Remember a question together with the tool arguments that answered it correctly.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "question": { "type": "string" },
                    "tool_name": { "type": "string" },
                    "args": { "type": "object" }
                },
                "required": ["question", "tool_name", "args"]
            }),
        },
        ToolSpec {
            name: names::SEARCH_SAVED_CORRECT_TOOL_USES.to_string(),
            description: "Search previously saved questions for tool usages that worked.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "question": { "type": "string" },
                    "limit": { "type": "integer", "minimum": 1, "maximum": 100 }
                },
                "required": ["question"]
            }),
        },
        ToolSpec {
            name: names::SAVE_TEXT_MEMORY.to_string(),
            description: "Store a piece of domain knowledge, such as a business rule or schema note.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": { "type": "string" }
                },
                "required": ["content"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> ToolSpec {
        ToolSpec {
            name: name.to_string(),
            description: String::new(),
            input_schema: json!({"type": "object"}),
        }
    }

    fn user_in(groups: &[&str]) -> User {
        User {
            id: "u".to_string(),
            email: "u".to_string(),
            group_memberships: groups.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_default_tools_visible_to_admin() {
        let registry = ToolRegistry::with_default_tools();
        let visible: Vec<_> = registry
            .tools_for(&User::admin("a@x.com"))
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(
            visible,
            vec![
                names::RUN_SQL,
                names::VISUALIZE_DATA,
                names::SAVE_QUESTION_TOOL_ARGS,
                names::SEARCH_SAVED_CORRECT_TOOL_USES,
                names::SAVE_TEXT_MEMORY,
            ]
        );
    }

    #[test]
    fn test_default_tools_hidden_from_non_admin() {
        let registry = ToolRegistry::with_default_tools();
        let viewer = user_in(&["viewer"]);
        assert!(registry.tools_for(&viewer).is_empty());
        assert!(!registry.authorize(&viewer, names::RUN_SQL));
        assert!(registry.authorize(&User::admin("a@x.com"), names::RUN_SQL));
    }

    #[test]
    fn test_filtering_by_group_intersection() {
        let mut registry = ToolRegistry::new();
        registry.register_local_tool(spec("read"), ["viewer", "admin"]);
        registry.register_local_tool(spec("write"), ["admin"]);
        registry.register_local_tool(spec("nobody"), Vec::<String>::new());

        let viewer = user_in(&["viewer"]);
        let visible: Vec<_> = registry.tools_for(&viewer).iter().map(|t| t.name.clone()).collect();
        assert_eq!(visible, vec!["read".to_string()]);
        assert!(!registry.authorize(&viewer, "write"));
        assert!(!registry.authorize(&User::admin("a"), "nobody"));
    }

    #[test]
    fn test_unknown_tool_is_denied() {
        let registry = ToolRegistry::with_default_tools();
        assert!(!registry.authorize(&User::admin("a@x.com"), "drop_database"));
    }

    #[test]
    fn test_reregistering_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register_local_tool(spec("t"), ["admin"]);
        registry.register_local_tool(spec("t"), ["viewer"]);
        assert_eq!(registry.len(), 1);
        assert!(!registry.authorize(&User::admin("a"), "t"));
        assert!(registry.authorize(&user_in(&["viewer"]), "t"));
    }
}
