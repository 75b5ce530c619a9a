use serde_json::Value;

/// MCP metadata derived from a tool name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct McpInfo {
    pub is_mcp: bool,
    pub server: Option<String>,
    pub function: Option<String>,
}

/// Parse MCP tool names into server and function.
///
/// Standard tools use `mcp__<server>__<function>`; IDE-style tools use a
/// single underscore, `mcp_<server>_<function>`, split on the first `_`
/// after the prefix.
pub fn classify_mcp(tool_name: &str) -> McpInfo {
    let parts: Vec<&str> = if let Some(rest) = tool_name.strip_prefix("mcp__") {
        rest.splitn(2, "__").collect()
    } else if let Some(rest) = tool_name.strip_prefix("mcp_") {
        rest.splitn(2, '_').collect()
    } else {
        return McpInfo::default();
    };

    match parts.as_slice() {
        [server, function] => McpInfo {
            is_mcp: true,
            server: Some((*server).to_string()),
            function: Some((*function).to_string()),
        },
        [server] if !server.is_empty() => McpInfo {
            is_mcp: true,
            server: Some((*server).to_string()),
            function: None,
        },
        _ => McpInfo {
            is_mcp: true,
            server: None,
            function: None,
        },
    }
}

/// Skill metadata derived from a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SkillInfo {
    pub is_skill: bool,
    pub name: Option<String>,
    pub args: Option<String>,
}

/// Skills arrive as the `Skill` tool with a `skill` input field (namespace
/// separators like `bmad:bmm:dev-story` are preserved verbatim) and an
/// optional `args` string.
pub fn classify_skill(tool_name: &str, tool_input: &Value) -> SkillInfo {
    if tool_name != "Skill" {
        return SkillInfo::default();
    }
    let Some(map) = tool_input.as_object() else {
        return SkillInfo {
            is_skill: true,
            name: None,
            args: None,
        };
    };
    SkillInfo {
        is_skill: true,
        name: map.get("skill").and_then(Value::as_str).map(str::to_string),
        args: map.get("args").and_then(Value::as_str).map(str::to_string),
    }
}
