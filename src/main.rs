use anyhow::Context;
use dotenvy::dotenv;
use purchase_approval::{
    config,
    projection::{self, RequestRow},
    store::SledStore,
    types::PersonelId,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // .env is optional, variables may come from the environment
    dotenv().ok();

    let config_path = config::config_path();
    let app_config = config::load_config(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_config.log.filter)),
        )
        .init();
    info!(path = %config_path.display(), "configuration loaded");

    let personel_id = std::env::args()
        .nth(1)
        .context("usage: satinalma <personel-id>")?
        .parse::<u64>()
        .map(PersonelId)
        .context("personel id must be a number")?;

    let store = SledStore::open(&app_config.store.path)?;
    let requests = store
        .list_requests()
        .inspect_err(|e| error!("failed to list purchase requests: {}", e))?;

    let rows = projection::project_rows(&requests, personel_id, &app_config.offers);
    for (row, request) in rows.iter().zip(&requests) {
        print_row(row);
        for line in request.history_lines() {
            println!("    {line}");
        }
        if let Some(link) = app_config
            .share
            .base_url
            .as_deref()
            .and_then(|base| request.share_link(base))
        {
            println!("    paylaşım: {link}");
        }
    }

    info!(
        total = rows.len(),
        awaiting = projection::awaiting(&rows).count(),
        "listed purchase requests"
    );
    Ok(())
}

fn print_row(row: &RequestRow) {
    let badge = if row.pending_for_me { " [ONAY BEKLİYOR]" } else { "" };
    println!(
        "#{} {} - {} | onay {}/{} | satın alma {} | süreç {}{}",
        row.seri_no,
        row.talep_cinsi,
        if row.fully_approved { "onaylandı" } else { "onay sürecinde" },
        row.approvals.approved,
        row.approvals.approved + row.approvals.rejected + row.approvals.pending,
        row.purchase_status,
        row.process_status,
        badge
    );
    if !row.offer_summary.is_empty() {
        println!("    teklifler: {}", row.offer_summary);
    }
}
