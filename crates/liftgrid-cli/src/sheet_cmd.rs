use anyhow::{Context, Result};

use liftgrid_core::sheets::{extract_document_id, parse_document_url};
use liftgrid_store::models::keys;
use liftgrid_store::queries::settings;

use crate::SheetCommands;
use crate::app::App;

pub async fn run_sheet_command(command: SheetCommands, app: &App) -> Result<()> {
    match command {
        SheetCommands::Set { url } => set_sheet(app, &url).await,
        SheetCommands::Show => show_sheet(app).await,
    }
}

async fn set_sheet(app: &App, url: &str) -> Result<()> {
    let url = url.trim();
    let document_id = parse_document_url(url)?;
    settings::put_setting(&app.pool, keys::DOCUMENT_URL, url)
        .await
        .context("failed to save document URL")?;
    println!("Sheet set: {document_id}");
    Ok(())
}

async fn show_sheet(app: &App) -> Result<()> {
    match settings::get_setting(&app.pool, keys::DOCUMENT_URL).await? {
        Some(url) => {
            let id = extract_document_id(&url).unwrap_or_else(|| "<invalid>".to_string());
            println!("URL:      {url}");
            println!("Document: {id}");
            if let Some(sheet) = &app.config.sheet_name {
                println!("Tab:      {sheet}");
            }
            println!("Range:    {}", app.config.range);
        }
        None => println!("No sheet configured. Run `liftgrid sheet set <URL>`."),
    }
    Ok(())
}
