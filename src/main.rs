//! agentdeck: console client for the agent platform.
//!
//! REST CRUD under `api`, streaming chat sessions under `chat`, prompt
//! optimization under `prompt`, share-token redemption under `share`.
//! Streamed replies print incrementally; a reply that terminates without
//! output renders as a placeholder instead of an empty line.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use client::panels::{
    AgentChatPanel, AgentDraft, ClusterChatPanel, CompareColumn, ConversationPanel,
    ModelComparePanel, PanelEvent, PromptAssistantPanel, PromptEvent,
};
use client::state::chat::ChatThread;
use client::state::share::ShareTokenCache;
use client::{ApiClient, ClientError};
use serde_json::Value;

const REPLY_PLACEHOLDER: &str = "[no reply received]";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to read {}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        source: io::Error,
    },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "agentdeck", about = "Agent platform console CLI")]
struct Cli {
    #[arg(long, env = "AGENTDECK_BASE_URL", default_value = "http://127.0.0.1:8000")]
    base_url: String,

    #[arg(long, env = "AGENTDECK_API_TOKEN")]
    api_token: Option<String>,

    #[arg(long, env = "AGENTDECK_SHARE_CACHE", default_value = ".agentdeck/share_tokens.json")]
    share_cache: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Api(ApiCommand),
    Chat(ChatCommand),
    Prompt(PromptCommand),
    Share(ShareCommand),
}

#[derive(Args, Debug)]
struct ApiCommand {
    #[command(subcommand)]
    command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
enum ApiSubcommand {
    Agent(AgentCommand),
    Cluster(ClusterCommand),
    Model(ModelCommand),
    Workspace(WorkspaceCommand),
    Kb(KbCommand),
    Prompt(PromptTemplateCommand),
    Conversation(ConversationCommand),
}

#[derive(Args, Debug)]
struct AgentCommand {
    #[command(subcommand)]
    command: AgentSubcommand,
}

#[derive(Subcommand, Debug)]
enum AgentSubcommand {
    List,
    Read {
        agent_id: String,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        agent_id: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        agent_id: String,
    },
}

#[derive(Args, Debug)]
struct ClusterCommand {
    #[command(subcommand)]
    command: ClusterSubcommand,
}

#[derive(Subcommand, Debug)]
enum ClusterSubcommand {
    List,
    Read {
        cluster_id: String,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        cluster_id: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        cluster_id: String,
    },
}

#[derive(Args, Debug)]
struct ModelCommand {
    #[command(subcommand)]
    command: ModelSubcommand,
}

#[derive(Subcommand, Debug)]
enum ModelSubcommand {
    List,
}

#[derive(Args, Debug)]
struct WorkspaceCommand {
    #[command(subcommand)]
    command: WorkspaceSubcommand,
}

#[derive(Subcommand, Debug)]
enum WorkspaceSubcommand {
    List,
    Switch { workspace_id: String },
}

#[derive(Args, Debug)]
struct KbCommand {
    #[command(subcommand)]
    command: KbSubcommand,
}

#[derive(Subcommand, Debug)]
enum KbSubcommand {
    List,
    Create {
        #[arg(long)]
        name: String,
    },
    Delete {
        kb_id: String,
    },
    Upload {
        kb_id: String,
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct PromptTemplateCommand {
    #[command(subcommand)]
    command: PromptTemplateSubcommand,
}

#[derive(Subcommand, Debug)]
enum PromptTemplateSubcommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        content: String,
    },
    Update {
        prompt_id: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        prompt_id: String,
    },
}

#[derive(Args, Debug)]
struct ConversationCommand {
    #[command(subcommand)]
    command: ConversationSubcommand,
}

#[derive(Subcommand, Debug)]
enum ConversationSubcommand {
    List { agent_id: String },
    Messages { conversation_id: String },
    Delete { conversation_id: String },
}

#[derive(Args, Debug)]
struct ChatCommand {
    #[command(subcommand)]
    command: ChatSubcommand,
}

#[derive(Subcommand, Debug)]
enum ChatSubcommand {
    /// Test an agent's draft configuration with one message.
    Agent {
        agent_id: String,
        message: String,
        #[arg(long, default_value = "")]
        prompt: String,
        #[arg(long)]
        model_config_id: Option<String>,
        #[arg(long = "kb")]
        knowledge_base_ids: Vec<String>,
    },
    /// Fan one message out across up to four model configs.
    Compare {
        agent_id: String,
        message: String,
        #[arg(long = "model", required = true)]
        model_config_ids: Vec<String>,
    },
    /// Run a cluster draft with one message.
    Cluster {
        cluster_id: String,
        message: String,
        #[arg(long, default_value = "{}")]
        draft: String,
    },
    /// Chat as an end user, optionally resuming a conversation.
    Conversation {
        agent_id: String,
        message: String,
        #[arg(long)]
        conversation_id: Option<String>,
    },
}

#[derive(Args, Debug)]
struct PromptCommand {
    #[command(subcommand)]
    command: PromptSubcommand,
}

#[derive(Subcommand, Debug)]
enum PromptSubcommand {
    /// Rewrite a system prompt per an instruction.
    Optimize { prompt: String, instruction: String },
}

#[derive(Args, Debug)]
struct ShareCommand {
    #[command(subcommand)]
    command: ShareSubcommand,
}

#[derive(Subcommand, Debug)]
enum ShareSubcommand {
    /// Exchange a share token for an access token, caching the result.
    Redeem { token: String },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let api = ApiClient::new(&cli.base_url, cli.api_token.clone())?;

    match cli.command {
        Command::Api(command) => run_api(&api, command).await,
        Command::Chat(command) => run_chat(&api, command).await,
        Command::Prompt(command) => run_prompt(&api, command).await,
        Command::Share(command) => run_share(&api, &cli.share_cache, command).await,
    }
}

// =============================================================================
// API COMMANDS
// =============================================================================

async fn run_api(api: &ApiClient, command: ApiCommand) -> Result<(), CliError> {
    match command.command {
        ApiSubcommand::Agent(agent) => run_api_agent(api, agent).await,
        ApiSubcommand::Cluster(cluster) => match cluster.command {
            ClusterSubcommand::List => print_serialized(&api.list_clusters().await?),
            ClusterSubcommand::Read { cluster_id } => {
                print_json(&api.get_cluster(&cluster_id).await?)
            }
            ClusterSubcommand::Create { data } => {
                let body = serde_json::from_str::<Value>(&data)?;
                print_json(&api.create_cluster(&body).await?)
            }
            ClusterSubcommand::Update { cluster_id, data } => {
                let body = serde_json::from_str::<Value>(&data)?;
                print_json(&api.update_cluster(&cluster_id, &body).await?)
            }
            ClusterSubcommand::Delete { cluster_id } => {
                api.delete_cluster(&cluster_id).await?;
                eprintln!("deleted cluster {cluster_id}");
                Ok(())
            }
        },
        ApiSubcommand::Model(model) => match model.command {
            ModelSubcommand::List => print_serialized(&api.list_models().await?),
        },
        ApiSubcommand::Workspace(workspace) => match workspace.command {
            WorkspaceSubcommand::List => print_serialized(&api.list_workspaces().await?),
            WorkspaceSubcommand::Switch { workspace_id } => {
                api.switch_workspace(&workspace_id).await?;
                eprintln!("switched to workspace {workspace_id}");
                Ok(())
            }
        },
        ApiSubcommand::Kb(kb) => run_api_kb(api, kb).await,
        ApiSubcommand::Prompt(prompt) => match prompt.command {
            PromptTemplateSubcommand::List => print_serialized(&api.list_prompts().await?),
            PromptTemplateSubcommand::Create { name, content } => {
                print_json(&api.create_prompt(&name, &content).await?)
            }
            PromptTemplateSubcommand::Update { prompt_id, data } => {
                let body = serde_json::from_str::<Value>(&data)?;
                print_json(&api.update_prompt(&prompt_id, &body).await?)
            }
            PromptTemplateSubcommand::Delete { prompt_id } => {
                api.delete_prompt(&prompt_id).await?;
                eprintln!("deleted prompt {prompt_id}");
                Ok(())
            }
        },
        ApiSubcommand::Conversation(conversation) => match conversation.command {
            ConversationSubcommand::List { agent_id } => {
                print_serialized(&api.list_conversations(&agent_id).await?)
            }
            ConversationSubcommand::Messages { conversation_id } => {
                print_serialized(&api.conversation_messages(&conversation_id).await?)
            }
            ConversationSubcommand::Delete { conversation_id } => {
                api.delete_conversation(&conversation_id).await?;
                eprintln!("deleted conversation {conversation_id}");
                Ok(())
            }
        },
    }
}

async fn run_api_agent(api: &ApiClient, agent: AgentCommand) -> Result<(), CliError> {
    match agent.command {
        AgentSubcommand::List => print_serialized(&api.list_agents().await?),
        AgentSubcommand::Read { agent_id } => print_json(&api.get_agent(&agent_id).await?),
        AgentSubcommand::Create { data } => {
            let body = serde_json::from_str::<Value>(&data)?;
            print_json(&api.create_agent(&body).await?)
        }
        AgentSubcommand::Update { agent_id, data } => {
            let body = serde_json::from_str::<Value>(&data)?;
            print_json(&api.update_agent(&agent_id, &body).await?)
        }
        AgentSubcommand::Delete { agent_id } => {
            api.delete_agent(&agent_id).await?;
            eprintln!("deleted agent {agent_id}");
            Ok(())
        }
    }
}

async fn run_api_kb(api: &ApiClient, kb: KbCommand) -> Result<(), CliError> {
    match kb.command {
        KbSubcommand::List => print_serialized(&api.list_knowledge_bases().await?),
        KbSubcommand::Create { name } => print_json(&api.create_knowledge_base(&name).await?),
        KbSubcommand::Delete { kb_id } => {
            api.delete_knowledge_base(&kb_id).await?;
            eprintln!("deleted knowledge base {kb_id}");
            Ok(())
        }
        KbSubcommand::Upload { kb_id, file } => {
            let bytes = std::fs::read(&file)
                .map_err(|source| CliError::ReadInput { path: file.clone(), source })?;
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_owned());
            print_json(&api.upload_document(&kb_id, &file_name, bytes).await?)
        }
    }
}

// =============================================================================
// CHAT COMMANDS
// =============================================================================

async fn run_chat(api: &ApiClient, command: ChatCommand) -> Result<(), CliError> {
    match command.command {
        ChatSubcommand::Agent {
            agent_id,
            message,
            prompt,
            model_config_id,
            knowledge_base_ids,
        } => {
            let draft = AgentDraft {
                prompt,
                model_config_id,
                model_parameters: None,
                knowledge_base_ids,
            };
            let mut panel = AgentChatPanel::new(api.clone(), agent_id);
            panel
                .send(&draft, &message, Vec::new(), &mut print_stream_event)
                .await?;
            Ok(())
        }
        ChatSubcommand::Compare { agent_id, message, model_config_ids } => {
            let columns: Vec<CompareColumn> = model_config_ids
                .into_iter()
                .map(|id| CompareColumn {
                    label: Some(id.clone()),
                    model_config_id: id,
                    model_parameters: None,
                })
                .collect();
            let mut panel = ModelComparePanel::new(api.clone(), agent_id, columns)?;
            // Columns interleave on the shared stream, so print them whole at
            // the end instead of live.
            panel.send(&message, &mut |_| {}).await?;
            for thread in panel.session().threads() {
                print_thread(thread);
            }
            Ok(())
        }
        ChatSubcommand::Cluster { cluster_id, message, draft } => {
            let draft = serde_json::from_str::<Value>(&draft)?;
            let mut panel = ClusterChatPanel::new(api.clone(), cluster_id);
            panel.send(&draft, &message, &mut print_stream_event).await?;
            Ok(())
        }
        ChatSubcommand::Conversation { agent_id, message, conversation_id } => {
            let mut panel = ConversationPanel::new(api.clone(), agent_id.clone());
            if let Some(conversation_id) = conversation_id {
                panel.resume(conversation_id);
            }
            panel.send(&message, Vec::new(), &mut print_stream_event).await?;
            if panel.take_history_stale() {
                let conversations = api.list_conversations(&agent_id).await?;
                eprintln!("history refreshed: {} conversations", conversations.len());
            }
            Ok(())
        }
    }
}

async fn run_prompt(api: &ApiClient, command: PromptCommand) -> Result<(), CliError> {
    match command.command {
        PromptSubcommand::Optimize { prompt, instruction } => {
            let mut panel = PromptAssistantPanel::new(api.clone());
            let optimized = panel
                .optimize(&prompt, &instruction, &mut |event| {
                    if let PromptEvent::Delta(delta) = event {
                        print!("{delta}");
                        let _ = io::stdout().flush();
                    }
                })
                .await?;
            if !optimized.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}

async fn run_share(
    api: &ApiClient,
    cache_path: &Path,
    command: ShareCommand,
) -> Result<(), CliError> {
    match command.command {
        ShareSubcommand::Redeem { token } => {
            let mut cache = ShareTokenCache::load(cache_path)?;
            if let Some(access_token) = cache.get(&token) {
                println!("{access_token}");
                return Ok(());
            }
            let access_token = api.redeem_share_token(&token).await?;
            cache.put(&token, &access_token)?;
            println!("{access_token}");
            Ok(())
        }
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_stream_event(event: PanelEvent) {
    match event {
        PanelEvent::Delta { delta, .. } => {
            print!("{delta}");
            let _ = io::stdout().flush();
        }
        PanelEvent::ReplyError { .. } => println!("{REPLY_PLACEHOLDER}"),
        PanelEvent::ConversationMinted(conversation_id) => {
            eprintln!("conversation: {conversation_id}");
        }
        PanelEvent::Finished => println!(),
    }
}

fn print_thread(thread: &ChatThread) {
    let label = thread
        .label
        .as_deref()
        .or(thread.model_config_id.as_deref())
        .unwrap_or("reply");
    println!("=== {label} ===");
    match thread.list.last().and_then(|message| message.content.as_deref()) {
        Some(content) => println!("{content}"),
        None => println!("{REPLY_PLACEHOLDER}"),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn print_serialized<T: serde::Serialize>(items: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(items)?;
    println!("{rendered}");
    Ok(())
}
