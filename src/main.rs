use cursor_agent_sdk::agent::{AgentConfig, ProviderAdapter};
use cursor_agent_sdk::cli::Console;
use cursor_agent_sdk::llm::OllamaAgent;
use cursor_agent_sdk::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    tracing::info!("=== Cursor Agent Starting ===");

    let console = Console::new();

    let config = AgentConfig::from_env()?;
    let mut agent = match OllamaAgent::connect(config).await {
        Ok(agent) => agent,
        Err(e) => {
            console.print_error(&e.to_string());
            return Err(e.into());
        }
    };

    let registered = agent.base_mut().register_default_tools();
    tracing::info!("Registered {} tools", registered);

    console.print_banner(agent.model());

    loop {
        let Some(input) = console.read_input()? else {
            break;
        };
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        let outcome = agent.chat(input, None).await;
        console.print_outcome(&outcome);
        console.print_separator();
    }

    console.print_system("Goodbye!");
    tracing::info!("=== Cursor Agent Shutting Down ===");

    Ok(())
}
