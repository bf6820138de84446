use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pdf_qa_svc::client::chat::{ChatDashboard, Controls};
use pdf_qa_svc::client::health::{HEALTH_POLL_INTERVAL, HealthState, HealthWidget, Indicator};
use pdf_qa_svc::client::{ApiClient, PdfUpload, QaForm};
use std::io::Write;
use std::path::PathBuf;

/// Terminal front end for the PDF question-answering proxy
#[derive(Debug, Parser)]
#[command(name = "pdf-ask", version)]
struct Cli {
    /// Base URL of the running proxy
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask one question and print the answer with its context
    Ask {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        question: String,
        #[arg(long)]
        top_k: Option<u32>,
    },
    /// Chat view: one question per PDF, answer typed out as it is shown
    Chat {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        question: String,
        /// Print the final transcript as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show backend health; with --watch keep polling every 30 seconds
    Health {
        #[arg(long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_qa_svc=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api = ApiClient::new(&cli.server);

    match cli.command {
        Command::Ask {
            file,
            question,
            top_k,
        } => ask(api, file, question, top_k).await,
        Command::Chat {
            file,
            question,
            json,
        } => chat(api, file, question, json).await,
        Command::Health { watch } => health(api, watch).await,
    }
}

fn print_notice() {
    eprintln!("Note: this is only the front end. The question-answering backend must be");
    eprintln!("running separately and reachable from the proxy.\n");
}

async fn ask(api: ApiClient, file: PathBuf, question: String, top_k: Option<u32>) -> Result<()> {
    print_notice();
    let upload = PdfUpload::from_path(&file).await?;

    let mut form = QaForm::new(api);
    form.select_file(Some(upload));
    form.set_question(question);
    form.set_top_k(top_k);

    if !form.submit().await {
        bail!("Both a PDF file and a question are required");
    }

    let state = form.state();
    if let Some(banner) = state.error_banner() {
        bail!(banner);
    }
    let view = state
        .answer_view()
        .context("Server returned no answer")?;

    println!("Answer:\n{}\n", view.answer);
    println!("Processing Details:");
    println!("  Time taken:    {}", view.processing_time);
    println!("  Document hash: {}\n", view.document_hash);
    println!("Relevant Context:");
    for (i, chunk) in view.context_chunks.iter().enumerate() {
        println!("  [{}] {}", i + 1, chunk);
    }
    Ok(())
}

async fn chat(api: ApiClient, file: PathBuf, question: String, json: bool) -> Result<()> {
    print_notice();
    let upload = PdfUpload::from_path(&file).await?;

    let mut dashboard = ChatDashboard::new(api);
    dashboard.select_file(upload)?;
    dashboard.set_input(question.clone());

    println!("you [{}]: {}", file.display(), question);
    dashboard.ask().await?;

    let mut stdout = std::io::stdout();
    print!("assistant: ");
    let mut shown = 0;
    loop {
        if let Some(message) = dashboard.state().messages.last() {
            let text: String = message.content.chars().skip(shown).collect();
            shown += text.chars().count();
            print!("{}", text);
            stdout.flush()?;
        }
        if !dashboard.next_frame().await {
            break;
        }
    }
    println!();

    if dashboard.state().controls() == Controls::ResetOnly {
        println!("\nWant to ask another question? Upload a new PDF to continue.");
    }
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&dashboard.state().messages)?
        );
    }
    Ok(())
}

async fn health(api: ApiClient, watch: bool) -> Result<()> {
    let mut widget = HealthWidget::mount(api, HEALTH_POLL_INTERVAL);

    loop {
        let state = widget
            .settled()
            .await
            .context("Health polling stopped unexpectedly")?;
        print_health(&state);

        if !watch {
            return Ok(());
        }
        widget.changed().await;
    }
}

fn print_health(state: &HealthState) {
    let dot = match state.indicator() {
        Indicator::Grey => "○",
        Indicator::Red => "✗",
        Indicator::Green => "●",
    };
    println!("{} {}", dot, state.label());
    if let Some(error) = &state.error {
        println!("  {}", error);
    }
    for (service, active) in state.services() {
        println!(
            "  {:<16} {}",
            service,
            if active { "active" } else { "inactive" }
        );
    }
    if let Some(checked_at) = state.checked_at() {
        println!("  checked at {}", checked_at);
    }
}
