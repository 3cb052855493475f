#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = task_server::config::Config::from_env()?;
    tracing_subscriber::fmt()
        .with_max_level(config.environment.log_level())
        .init();
    task_server::web::start_web_server(config).await
}
