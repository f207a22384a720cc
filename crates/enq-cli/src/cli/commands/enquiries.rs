//! Enquiry command handlers: list, show, status updates, delete, export,
//! and the public submission form.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use enq_core::api::ApiClient;
use enq_core::config::Config;
use enq_core::enquiries::{
    self, Dashboard, Enquiry, Status, StatusFilter, export_filename,
};
use enq_core::session::SessionStore;

use super::{build_client, fail_protected, require_session};

/// Opens the dashboard behind the route guard.
fn open_dashboard(config: &Config) -> Result<(Dashboard, ApiClient, SessionStore)> {
    let store = SessionStore::open_default();
    let session = require_session(&store)?;
    let client = build_client(config, Some(session.token))?;
    Ok((Dashboard::new(client.clone()), client, store))
}

pub async fn list(config: &Config, search: &str, status: &str) -> Result<()> {
    let status_filter: StatusFilter = status.parse().map_err(|e: String| anyhow!(e))?;
    let (mut dashboard, client, store) = open_dashboard(config)?;

    if let Err(err) = dashboard.refresh().await {
        return Err(fail_protected(err, &client, &store)
            .await
            .context("Failed to load enquiries"));
    }

    let stats = dashboard.stats();
    let filtered = dashboard.filtered(search, status_filter);

    if filtered.is_empty() {
        if stats.total == 0 {
            println!("No enquiries have been submitted yet.");
        } else {
            println!("No enquiries match your search criteria.");
        }
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(["ID", "Name", "Company", "Email", "Phone", "Date", "Status"]);
        for enquiry in &filtered {
            let date = format_date(enquiry);
            table.add_row([
                enquiry.id.as_str(),
                enquiry.name.as_str(),
                enquiry.company.as_deref().unwrap_or("-"),
                enquiry.email.as_str(),
                enquiry.phone.as_str(),
                date.as_str(),
                enquiry.status.as_str(),
            ]);
        }
        println!("{table}");
    }

    println!(
        "{} shown | {} total, {} pending, {} contacted, {} resolved",
        filtered.len(),
        stats.total,
        stats.pending,
        stats.contacted,
        stats.resolved
    );
    Ok(())
}

pub async fn show(config: &Config, id: &str) -> Result<()> {
    let (mut dashboard, client, store) = open_dashboard(config)?;

    if let Err(err) = dashboard.refresh().await {
        return Err(fail_protected(err, &client, &store)
            .await
            .context("Failed to load enquiries"));
    }

    dashboard.select(id);
    let Some(enquiry) = dashboard.selected() else {
        bail!("No enquiry with ID '{id}'");
    };

    println!("ID:       {}", enquiry.id);
    println!("Name:     {}", enquiry.name);
    println!("Company:  {}", enquiry.company.as_deref().unwrap_or("Not provided"));
    println!("Email:    {}", enquiry.email);
    println!("Phone:    {}", enquiry.phone);
    println!("Date:     {}", format_date(enquiry));
    println!("Status:   {}", enquiry.status);
    println!();
    println!("{}", enquiry.enquiry);
    Ok(())
}

pub async fn set_status(config: &Config, id: &str, status: &str) -> Result<()> {
    let new_status: Status = status.parse().map_err(|e: String| anyhow!(e))?;
    let (mut dashboard, client, store) = open_dashboard(config)?;

    if let Err(err) = dashboard.update_status(id, new_status).await {
        return Err(fail_protected(err, &client, &store)
            .await
            .context("Failed to update status"));
    }

    println!("Status updated to {new_status}");
    Ok(())
}

pub async fn delete(config: &Config, id: &str, yes: bool) -> Result<()> {
    let (mut dashboard, client, store) = open_dashboard(config)?;

    // Destructive action: explicit confirmation before the request is
    // even issued.
    if !yes && !confirm("Are you sure you want to delete this enquiry?")? {
        println!("Aborted.");
        return Ok(());
    }

    if let Err(err) = dashboard.delete(id).await {
        return Err(fail_protected(err, &client, &store)
            .await
            .context("Failed to delete enquiry"));
    }

    println!("Enquiry deleted successfully");
    Ok(())
}

pub async fn export(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let (dashboard, client, store) = open_dashboard(config)?;

    let bytes = match dashboard.export_csv().await {
        Ok(bytes) => bytes,
        Err(err) => {
            return Err(fail_protected(err, &client, &store)
                .await
                .context("Failed to export CSV. Please try again."));
        }
    };

    let path = output.unwrap_or_else(|| PathBuf::from(export_filename(Utc::now())));
    std::fs::write(&path, &bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

pub async fn submit(
    config: &Config,
    name: String,
    email: String,
    phone: String,
    company: Option<String>,
    message: String,
) -> Result<()> {
    let new = enquiries::NewEnquiry {
        name,
        email,
        phone,
        company,
        enquiry: message,
    };

    // Validation failures never reach the network.
    if let Err(errors) = new.validate() {
        bail!("{}", errors.join("\n"));
    }

    let client = build_client(config, None)?;
    enquiries::submit(&client, &new)
        .await
        .map_err(|err| anyhow!("{err}"))
        .context("Failed to submit enquiry")?;

    println!("Enquiry submitted. We'll get back to you shortly.");
    Ok(())
}

fn format_date(enquiry: &Enquiry) -> String {
    enquiry
        .created_at
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().context("flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read confirmation")?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "Yes"))
}
