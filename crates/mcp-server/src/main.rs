//! Calculator MCP Server
//!
//! Exposes the AWS Pricing Calculator's public catalog, configuration and
//! estimate stores as agent-callable tools via the MCP protocol.
//!
//! ## Tools
//!
//! - `search_services` - Keyword search over the service catalog
//! - `get_service_schema` - Input schema for one service (types, defaults, options)
//! - `configure_service` - Normalize inputs and compute a service's monthly/upfront cost
//! - `create_estimate` - Persist a multi-service estimate and return the shareable link
//! - `load_estimate` - Fetch a stored estimate by id or share link
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "calculator": {
//!       "command": "calc-mcp"
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use std::env;

mod tools;

use tools::catalog;
use tools::CalculatorService;

fn print_help() {
    println!("Calculator MCP server");
    println!();
    println!("Usage: calc-mcp [--print-tools|--version|--help]");
    println!();
    println!("Flags:");
    println!("  --print-tools  Print tool inventory as JSON and exit");
    println!("  --version      Print version and exit");
    println!("  --help         Print this help and exit");
    println!();
    println!("Env:");
    println!("  CALC_MCP_LOG=1  Enable logging to stderr (stdout stays protocol-only)");
}

fn handle_cli_args() -> Option<i32> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        return None;
    }

    if args.len() == 1 {
        match args[0].as_str() {
            "--stdio" | "stdio" => {
                // Compatibility: some MCP clients unconditionally pass `--stdio`.
                return None;
            }
            "--print-tools" => {
                let payload = catalog::tool_inventory_json(env!("CARGO_PKG_VERSION"));
                println!("{}", payload);
                return Some(0);
            }
            "--version" | "-V" => {
                println!("calc-mcp {}", env!("CARGO_PKG_VERSION"));
                return Some(0);
            }
            "--help" | "-h" => {
                print_help();
                return Some(0);
            }
            _ => {}
        }
    }

    // Be permissive: when launched under agent tooling, extra args can appear
    // (wrappers, transport selectors, etc). Starting the server is better than
    // failing the toolchain.
    if logging_enabled() {
        log::warn!("Ignoring unknown arguments: {}", args.join(" "));
    }
    None
}

fn logging_enabled() -> bool {
    // Protocol purity: any non-MCP bytes on stdout will break clients, and some
    // MCP clients may merge stderr into stdout. Default to silent unless
    // explicitly enabled.
    std::env::var("CALC_MCP_LOG")
        .ok()
        .map(|v| {
            let v = v.trim();
            !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false"))
        })
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(code) = handle_cli_args() {
        std::process::exit(code);
    }

    if logging_enabled() {
        // Logging goes to stderr only (stdout is for MCP protocol).
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .target(env_logger::Target::Stderr)
            .init();
        log::info!("Starting calculator MCP server");
    }

    let service = CalculatorService::new();
    let server = service.serve(stdio()).await?;

    // Wait for shutdown
    server.waiting().await?;

    if logging_enabled() {
        log::info!("Calculator MCP server stopped");
    }
    Ok(())
}
