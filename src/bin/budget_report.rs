use std::{process::ExitCode, sync::Arc, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use budgetwatch_rs::{
    AlertCenter, BudgetOverview, BudgetStore, ClientConfig, HttpClient, Month, Session,
    format_currency,
};

/// Print the budget overview and active alerts of a month.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The origin of the finance backend, or of the proxy in front of it.
    #[arg(long, env = "BACKEND_URL", default_value = "http://127.0.0.1:8000")]
    backend_url: String,

    /// The bearer token of the user to report on.
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    token: String,

    /// The month to report on as YYYY-MM. Defaults to the current month.
    #[arg(short, long)]
    month: Option<Month>,

    /// Seconds to wait for the backend.
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ClientConfig {
        base_url: args.backend_url,
        request_timeout: Duration::from_secs(args.timeout),
        ..Default::default()
    };

    let client = match HttpClient::new(&config, Session::with_token(args.token)) {
        Ok(client) => client,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let month = args.month.unwrap_or_else(Month::current);
    let store = BudgetStore::new(Arc::new(client), month);

    match store.fetch_budget_overview(month).await {
        Ok(overview) => {
            print_report(&overview);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Could not load budgets for {}: {error}", month.query_value());
            ExitCode::FAILURE
        }
    }
}

fn print_report(overview: &BudgetOverview) {
    println!("Budgets for {}", overview.month.query_value());
    println!();

    if overview.budgets.is_empty() {
        println!("No budgets set for this month.");
        return;
    }

    for status in &overview.budgets {
        println!(
            "{:<24} {:>12} of {:>12} {:>7.2}%{}",
            status.budget.category.name,
            format_currency(status.spent),
            format_currency(status.budget.amount),
            status.percentage,
            if status.is_exceeded { "  OVER" } else { "" }
        );
    }

    println!();
    println!(
        "Total: {} spent of {}, {} remaining",
        format_currency(overview.total_spent),
        format_currency(overview.total_budgeted),
        format_currency(overview.total_remaining)
    );

    let alerts = AlertCenter::new().grouped(overview);
    if alerts.critical.is_empty() && alerts.warning.is_empty() {
        return;
    }

    println!();
    for alert in alerts.critical.iter().chain(&alerts.warning) {
        println!("[{}] {}", alert.title, alert.message);
    }
}
