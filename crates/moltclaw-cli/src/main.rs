use std::io::Write;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio_stream::StreamExt;

use moltclaw_agent::{Agent, StreamEvent, ToolCallLogger};
use moltclaw_core::config::Config;
use moltclaw_core::types::AgentConfig;
use moltclaw_tools::moltbook::MoltbookClient;
use moltclaw_tools::{ToolContext, ToolRegistry, register_builtin_tools};

mod logging;

#[derive(Parser)]
#[command(
    name = "moltclaw",
    about = "Streaming agent harness with travel tools and Moltbook posting",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream an agent run, printing events as they arrive
    Stream {
        #[command(flatten)]
        prompt: PromptArgs,

        /// Print every event as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Run the agent to completion and print the final result as JSON
    Run {
        #[command(flatten)]
        prompt: PromptArgs,
    },

    /// Tool management
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Create a Moltbook post
    Post {
        #[arg(long)]
        submolt: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },

    /// Comment on a Moltbook post
    Comment {
        #[arg(long)]
        post_id: String,
        #[arg(long)]
        content: String,
        /// Reply to this comment
        #[arg(long)]
        parent_id: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show effective settings
    Status,
}

#[derive(Args)]
struct PromptArgs {
    /// Prompt to send
    #[arg(short, long)]
    message: String,

    /// Model to use
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f64>,

    /// Completion token cap
    #[arg(long)]
    max_tokens: Option<u32>,
}

impl PromptArgs {
    fn agent_config(&self, config: &Config) -> AgentConfig {
        let mut agent = config.agent_config();
        if let Some(model) = &self.model {
            agent.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            agent.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            agent.max_tokens = max_tokens;
        }
        agent
    }
}

#[derive(Subcommand)]
enum ToolsAction {
    /// List available tools
    List,
    /// Call a tool with JSON parameters
    Call {
        name: String,
        #[arg(default_value = "{}")]
        params: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Check configuration for problems
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::config_path);
    let config = Config::load(&config_path)?;

    logging::init(cli.verbose, config.logging.as_ref())?;

    match cli.command {
        Commands::Stream { prompt, json } => {
            let agent = Agent::new(Some(prompt.agent_config(&config)));
            stream_agent(&agent, &prompt.message, json).await?;
        }
        Commands::Run { prompt } => {
            let agent = Agent::new(Some(prompt.agent_config(&config)));
            let result = match agent.run(&prompt.message).await? {
                Some(result) => serde_json::to_value(result)?,
                None => serde_json::json!({}),
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Tools { action } => {
            let mut registry = ToolRegistry::new();
            register_builtin_tools(&mut registry, &config)?;
            match action {
                ToolsAction::List => {
                    for name in registry.list() {
                        let description = registry
                            .get(name)
                            .map(|t| t.description())
                            .unwrap_or_default();
                        println!("{name:<24} {description}");
                    }
                }
                ToolsAction::Call { name, params } => {
                    let Some(tool) = registry.get(&name) else {
                        anyhow::bail!("Unknown tool: {name}");
                    };
                    let params: serde_json::Value = serde_json::from_str(&params)?;
                    let context = ToolContext {
                        config: Arc::new(config.clone()),
                    };
                    let output = tool.execute(params, &context).await?;
                    if output.is_error {
                        anyhow::bail!("{}", output.content);
                    }
                    println!("{}", output.content);
                }
            }
        }
        Commands::Post {
            submolt,
            title,
            content,
        } => {
            let client = MoltbookClient::new(&config.moltbook())?;
            let resp = client.create_post(&submolt, &title, &content).await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Commands::Comment {
            post_id,
            content,
            parent_id,
        } => {
            let client = MoltbookClient::new(&config.moltbook())?;
            let resp = client
                .add_comment(&post_id, &content, parent_id.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Validate => {
                let (warnings, errors) = config.validate();
                for w in &warnings {
                    println!("warning: {w}");
                }
                for e in &errors {
                    println!("error: {e}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} config error(s)", errors.len());
                }
                println!("Config OK");
            }
        },
        Commands::Status => {
            let agent = config.agent_config();
            let moltbook = config.moltbook();
            println!("moltclaw v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            println!(
                "Agent: {} (temperature {}, max_tokens {})",
                agent.model, agent.temperature, agent.max_tokens
            );
            println!("Moltbook: {}", moltbook.base_url());
            println!(
                "Moltbook key: {}",
                if moltbook.resolve_api_key().is_some() {
                    "configured"
                } else {
                    "missing"
                }
            );
            println!("Attractions file: {}", config.attractions_file().display());
        }
    }

    Ok(())
}

/// Print a run as it streams: token text inline, or one JSON line per event.
async fn stream_agent(agent: &Agent, prompt: &str, json: bool) -> anyhow::Result<()> {
    let mut stream = agent.stream(prompt)?;
    let mut tool_log = ToolCallLogger::new();
    let mut stdout = std::io::stdout();

    while let Some(event) = stream.next().await {
        tool_log.on_event(&event);
        if json {
            writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
            continue;
        }
        match &event {
            StreamEvent::Start { config } => {
                tracing::info!(model = %config.model, "run started");
            }
            StreamEvent::Token { text } => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            StreamEvent::Tool { .. } => {}
            StreamEvent::Final(result) => {
                writeln!(stdout)?;
                writeln!(stdout, "{}", result.answer)?;
            }
            StreamEvent::Error { message } => {
                tracing::warn!(%message, "agent reported an error");
            }
        }
    }

    if stream.final_result().is_none() {
        tracing::warn!("stream ended without a final result");
    }
    tracing::debug!(tools = tool_log.tool_count(), "stream complete");
    Ok(())
}
