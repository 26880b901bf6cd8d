use logsnag::{ClientConfig, Insight, InsightMutation, LogEvent, Parser};

pub fn main() -> logsnag::Result<()> {
    env_logger::init();

    let token = std::env::var("LOGSNAG_TOKEN").expect("LOGSNAG_TOKEN must be set");
    let project = std::env::var("LOGSNAG_PROJECT").expect("LOGSNAG_PROJECT must be set");

    let client = ClientConfig::new(token, project)
        .channel("demo")
        .to_client()?;

    let response = client.log_event(
        LogEvent::in_default_channel("Demo started")
            .description("Sent from the **simple** example")
            .icon("🦀")
            .parser(Parser::Markdown)
            .tag("runtime", "rust"),
    )?;
    println!("Logged event: {:?}", response);

    client.identify("demo-user", [("plan", "free")])?;

    client.insight(Insight::new("Demo runs", 1).icon("📈"))?;
    client.insight_mutate(InsightMutation::new("Demo runs").inc(1))?;

    Ok(())
}
