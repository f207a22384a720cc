//! Login/logout command handlers.

use std::io::{self, BufRead};

use anyhow::{Context, Result, bail};
use enq_core::auth::{self, LoginFlow, LoginState};
use enq_core::config::Config;
use enq_core::session::SessionStore;

use super::{build_client, require_session};

pub async fn login(config: &Config, username: &str, password: Option<String>) -> Result<()> {
    let store = SessionStore::open_default();
    let mut flow = LoginFlow::mount(&store);

    // Already-logged-in short-circuit: skip the form entirely.
    if *flow.state() == LoginState::Authenticated {
        let session = require_session(&store)?;
        println!("Already logged in as {}.", session.user.username);
        return Ok(());
    }

    let password = match password {
        Some(p) => p,
        None => read_password_line()?,
    };

    let client = build_client(config, None)?;
    match auth::login(&client, &store, &mut flow, username, &password).await {
        Ok(session) => {
            println!("Login successful. Logged in as {}.", session.user.username);
            Ok(())
        }
        Err(err) => bail!("{err}"),
    }
}

pub async fn logout(config: &Config) -> Result<()> {
    let store = SessionStore::open_default();
    let token = store.load().map(|s| s.token);
    let client = build_client(config, token)?;

    auth::logout(&client, &store).await?;
    println!("Logged out.");
    Ok(())
}

pub fn whoami() -> Result<()> {
    let store = SessionStore::open_default();
    let session = require_session(&store)?;
    println!("{}", session.user.username);
    if !store.admin_hint() {
        // The hint is display-only; a missing marker next to a valid token
        // is worth mentioning but changes nothing.
        println!("(admin hint marker missing)");
    }
    Ok(())
}

fn read_password_line() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Username and password are required");
    }
    Ok(password)
}
