use std::{fmt::Display, str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dashboard_core::{
    load_settings,
    resources::{BlogForm, CashflowForm, HomestayForm, PositionForm},
    Blogs, Cashflows, DashboardError, DashboardSession, FetchOutcome, Homestays,
    ListOrchestrator, ListStatus, MutationKind, NotificationEvent, NotificationStatus, Periods,
    Positions, Resource, SubmitOutcome,
};
use futures::StreamExt;
use serde::Serialize;
use shared::domain::{CashflowType, RecordId};

#[derive(Parser, Debug)]
struct Args {
    /// Overrides the API base URL from settings.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResourceArg {
    Cashflows,
    Positions,
    Periods,
    Blogs,
    Homestays,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print records as JSON lines.
    List {
        resource: ResourceArg,
        /// Pages to load before printing.
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// Tab filter: cashflow type, position level, active/archived, or text search.
        #[arg(long)]
        filter: Option<String>,
    },
    AddCashflow {
        #[arg(long)]
        date: String,
        #[arg(long)]
        amount: String,
        #[arg(long, value_name = "income|outcome")]
        kind: String,
        #[arg(long, default_value = "")]
        note: String,
    },
    AddPosition {
        #[arg(long)]
        name: String,
        #[arg(long)]
        level: String,
    },
    EditPosition {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        level: Option<String>,
    },
    AddBlog {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        summary: String,
        #[arg(long)]
        body: String,
    },
    AddHomestay {
        #[arg(long)]
        name: String,
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "")]
        thumbnail_url: String,
    },
    /// Make a period the current one.
    ActivatePeriod {
        #[arg(long)]
        id: i64,
    },
    Remove {
        resource: ResourceArg,
        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = args.api_url {
        settings.api_base_url = api_url;
    }
    let session = DashboardSession::new(settings)?;

    let mut events = Box::pin(session.registry().event_stream());
    let mut printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            render_event(&event);
        }
    });

    let result = run(&session, args.command).await;

    session.close().await;
    // Let the printer flush what was already published before stopping it.
    let _ = tokio::time::timeout(Duration::from_millis(100), &mut printer).await;
    printer.abort();
    result
}

async fn run(session: &DashboardSession, command: Command) -> Result<()> {
    match command {
        Command::List {
            resource,
            pages,
            filter,
        } => match resource {
            ResourceArg::Cashflows => list(session.board::<Cashflows>(), pages, filter).await,
            ResourceArg::Positions => list(session.board::<Positions>(), pages, filter).await,
            ResourceArg::Periods => list(session.board::<Periods>(), pages, filter).await,
            ResourceArg::Blogs => list(session.board::<Blogs>(), pages, filter).await,
            ResourceArg::Homestays => list(session.board::<Homestays>(), pages, filter).await,
        },
        Command::AddCashflow {
            date,
            amount,
            kind,
            note,
        } => {
            let kind = CashflowType::from_str(&kind).map_err(|err| anyhow!(err))?;
            let form = CashflowForm {
                date,
                idr_amount: amount,
                note,
                kind: Some(kind),
            };
            add(session.board::<Cashflows>(), form).await
        }
        Command::AddPosition { name, level } => {
            add(session.board::<Positions>(), PositionForm { name, level }).await
        }
        Command::EditPosition { id, name, level } => {
            let board = session.board::<Positions>();
            open_record(&board, RecordId(id)).await?;
            board.make_editable().await?;
            board
                .update_draft(move |form| {
                    if let Some(name) = name {
                        form.name = name;
                    }
                    if let Some(level) = level {
                        form.level = level;
                    }
                })
                .await?;
            let outcome = board.submit().await;
            report(MutationKind::Edit, outcome)
        }
        Command::AddBlog {
            title,
            summary,
            body,
        } => {
            let form = BlogForm {
                title,
                summary,
                body,
            };
            add(session.board::<Blogs>(), form).await
        }
        Command::AddHomestay {
            name,
            address,
            thumbnail_url,
        } => {
            let form = HomestayForm {
                name,
                address,
                thumbnail_url,
            };
            add(session.board::<Homestays>(), form).await
        }
        Command::ActivatePeriod { id } => {
            let board = session.board::<Periods>();
            open_record(&board, RecordId(id)).await?;
            let outcome = board.activate().await;
            report(MutationKind::Activate, outcome)
        }
        Command::Remove { resource, id } => match resource {
            ResourceArg::Cashflows => remove(session.board::<Cashflows>(), RecordId(id)).await,
            ResourceArg::Positions => remove(session.board::<Positions>(), RecordId(id)).await,
            ResourceArg::Periods => remove(session.board::<Periods>(), RecordId(id)).await,
            ResourceArg::Blogs => remove(session.board::<Blogs>(), RecordId(id)).await,
            ResourceArg::Homestays => remove(session.board::<Homestays>(), RecordId(id)).await,
        },
    }
}

async fn list<R>(board: Arc<ListOrchestrator<R>>, pages: usize, filter: Option<String>) -> Result<()>
where
    R: Resource,
    R::Record: Serialize,
    R::Filter: FromStr,
    <R::Filter as FromStr>::Err: Display,
{
    board.load().await?;
    for _ in 1..pages {
        match board.pager().fetch_next().await? {
            FetchOutcome::Appended { .. } => {}
            _ => break,
        }
    }
    let filter = filter
        .map(|raw| raw.parse::<R::Filter>())
        .transpose()
        .map_err(|err| anyhow!("invalid filter for {}: {err}", R::PATH))?;
    board.select_filter(filter).await;

    let view = board.list_view().await;
    match view.status {
        ListStatus::Failed(message) => bail!("failed to load {}: {message}", R::PATH),
        ListStatus::Empty => println!("no {} to show", R::PATH),
        ListStatus::Loading | ListStatus::Ready => {
            for item in &view.items {
                println!("{}", serde_json::to_string(item)?);
            }
        }
    }
    if !view.summary.is_empty() {
        println!("{}", serde_json::to_string(&view.summary)?);
    }
    if view.has_next_page {
        tracing::info!(resource = R::PATH, "more pages available; raise --pages to load them");
    }
    Ok(())
}

async fn add<R: Resource>(board: Arc<ListOrchestrator<R>>, form: R::Form) -> Result<()>
where
    R::Record: Serialize,
{
    board.open_add().await;
    board.update_draft(move |draft| *draft = form).await?;
    let outcome = board.submit().await;
    report(MutationKind::Add, outcome)
}

async fn remove<R: Resource>(board: Arc<ListOrchestrator<R>>, id: RecordId) -> Result<()>
where
    R::Record: Serialize,
{
    open_record(&board, id).await?;
    board.request_delete().await?;
    let outcome = board.confirm_delete().await;
    report(MutationKind::Delete, outcome)
}

/// Pages through the list until `id` is loaded, then opens it.
async fn open_record<R: Resource>(board: &ListOrchestrator<R>, id: RecordId) -> Result<()> {
    board.load().await?;
    loop {
        if board.open_edit_by_id(id).await.is_ok() {
            return Ok(());
        }
        match board.pager().fetch_next().await? {
            FetchOutcome::Appended { .. } => {}
            _ => bail!("no {} with id {id}", R::LABEL),
        }
    }
}

fn report<T: Serialize>(
    kind: MutationKind,
    outcome: Result<SubmitOutcome<T>, DashboardError>,
) -> Result<()> {
    let outcome = outcome.inspect_err(|err| {
        if let DashboardError::Transport(err) = err {
            if err.requires_reauth() {
                tracing::warn!("the API rejected this session; sign in again");
            }
        }
    })?;
    match outcome {
        SubmitOutcome::Committed(Some(record)) => {
            println!("{}", serde_json::to_string(&record)?);
            Ok(())
        }
        SubmitOutcome::Committed(None) => Ok(()),
        SubmitOutcome::Ignored(reason) => bail!("{kind} not submitted: {reason}"),
    }
}

fn render_event(event: &NotificationEvent) {
    match event {
        NotificationEvent::Shown(notification) | NotificationEvent::Updated(notification) => {
            let marker = match notification.status {
                NotificationStatus::Loading => "..",
                NotificationStatus::Success => "ok",
                NotificationStatus::Error => "!!",
            };
            match &notification.message {
                Some(message) => eprintln!("[{marker}] {}: {message}", notification.title),
                None => eprintln!("[{marker}] {}", notification.title),
            }
        }
        NotificationEvent::Dismissed(_) => {}
    }
}
