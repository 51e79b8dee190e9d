use serde_json::json;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ToolDescriptor {
    pub(crate) name: &'static str,
    pub(crate) summary: &'static str,
}

pub(crate) const TOOL_CATALOG: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "search_services",
        summary: "Keyword search over the service catalog (best first call).",
    },
    ToolDescriptor {
        name: "get_service_schema",
        summary: "Input schema for one service: fields, defaults, options, units.",
    },
    ToolDescriptor {
        name: "configure_service",
        summary: "Normalize inputs and compute a service's monthly/upfront cost.",
    },
    ToolDescriptor {
        name: "create_estimate",
        summary: "Persist a multi-service estimate and return the shareable link.",
    },
    ToolDescriptor {
        name: "load_estimate",
        summary: "Fetch a stored estimate by id or share link.",
    },
];

pub(crate) fn tool_inventory_json(version: &str) -> serde_json::Value {
    let tools: Vec<serde_json::Value> = TOOL_CATALOG
        .iter()
        .map(|tool| json!({ "name": tool.name, "summary": tool.summary }))
        .collect();

    json!({
        "binary": "calc-mcp",
        "version": version,
        "count": tools.len(),
        "tools": tools,
    })
}

pub(crate) fn tool_instructions() -> String {
    let mut lines = vec![
        "Calculator exposes AWS Pricing Calculator estimates to AI agents.".to_string(),
        "Recommended flow: search_services → get_service_schema → configure_service → create_estimate."
            .to_string(),
        "Costs come from the same definitions and price tables the calculator web UI uses."
            .to_string(),
        "Tools:".to_string(),
    ];
    for tool in TOOL_CATALOG {
        lines.push(format!("- {}: {}", tool.name, tool.summary));
    }
    lines.join("\n")
}
