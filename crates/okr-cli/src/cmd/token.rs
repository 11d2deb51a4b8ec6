use std::sync::Arc;

use clap::Subcommand;
use okr_core::token::{decode_expiry, notify_check};
use okr_core::{spawn_token_watchdog, RemoteObjectiveStore, TokenCheck, TokenChecker};
use tokio::sync::watch;

use super::runtime;
use crate::context::Context;
use crate::notify::ConsoleNotifier;
use crate::output::print_json;

#[derive(Subcommand)]
pub enum TokenSubcommand {
    /// Check how long the session token has left
    Check {
        /// Ask the API's /auth/token-status endpoint instead of decoding locally
        #[arg(long)]
        server: bool,
    },
    /// Warn as the token approaches expiry; stops on expiry or ctrl-c
    Watch,
}

pub fn run(ctx: &Context, subcmd: TokenSubcommand) -> anyhow::Result<()> {
    match subcmd {
        TokenSubcommand::Check { server: false } => check(ctx),
        TokenSubcommand::Check { server: true } => check_server(ctx),
        TokenSubcommand::Watch => watch(ctx),
    }
}

fn check(ctx: &Context) -> anyhow::Result<()> {
    let token = ctx.config.api.token.as_deref();
    let mut checker = TokenChecker::new(ctx.config.token_watch.clone());
    let result = checker.check(token);

    if ctx.json {
        let expires_at = token.and_then(|t| decode_expiry(t).ok());
        print_json(&serde_json::json!({
            "status": label(&result),
            "minutes_left": minutes_left(&result),
            "expires_at": expires_at,
        }))?;
    } else {
        notify_check(&result, &ConsoleNotifier);
        match minutes_left(&result) {
            Some(minutes) => println!("{}: {minutes} minute(s) left", label(&result)),
            None => println!("{}", label(&result)),
        }
    }

    match result {
        TokenCheck::NoToken => anyhow::bail!("no session token (use --token or OKR_TOKEN)"),
        TokenCheck::Expired => anyhow::bail!("session token has expired"),
        _ => Ok(()),
    }
}

fn check_server(ctx: &Context) -> anyhow::Result<()> {
    let store = RemoteObjectiveStore::new(&ctx.config.api)?;
    let status = runtime()?.block_on(store.token_status())?;

    if ctx.json {
        print_json(&status)?;
    } else {
        let minutes = status
            .expires_in_minutes
            .map(|m| format!(" ({m:.1} minute(s) left)"))
            .unwrap_or_default();
        println!("valid: {}, expired: {}{minutes}", status.valid, status.expired);
        if !status.message.is_empty() {
            println!("{}", status.message);
        }
    }

    if !status.valid || status.expired {
        anyhow::bail!("server rejected the session token");
    }
    Ok(())
}

fn watch(ctx: &Context) -> anyhow::Result<()> {
    let token = ctx.config.api.token.clone();
    if token.is_none() {
        anyhow::bail!("no session token (use --token or OKR_TOKEN)");
    }

    let rt = runtime()?;
    rt.block_on(async {
        let (tx, _rx) = watch::channel(token);
        let handle = spawn_token_watchdog(
            tx,
            Arc::new(ConsoleNotifier),
            ctx.config.token_watch.clone(),
        );
        tracing::info!(
            every_secs = ctx.config.token_watch.check_interval_secs,
            "watching session token"
        );

        tokio::select! {
            result = handle => {
                let last = result?;
                println!("{}", label(&last));
            }
            _ = tokio::signal::ctrl_c() => {
                println!("stopped");
            }
        }
        Ok::<_, anyhow::Error>(())
    })
}

fn label(check: &TokenCheck) -> &'static str {
    match check {
        TokenCheck::NoToken => "no token",
        TokenCheck::Expired => "expired",
        TokenCheck::Valid { .. } => "valid",
        TokenCheck::ExpiringSoon { .. } => "expiring soon",
        TokenCheck::FinalWarning { .. } => "expiring now",
    }
}

fn minutes_left(check: &TokenCheck) -> Option<i64> {
    match check {
        TokenCheck::Valid { minutes_left }
        | TokenCheck::ExpiringSoon { minutes_left, .. }
        | TokenCheck::FinalWarning { minutes_left, .. } => Some(*minutes_left),
        TokenCheck::NoToken | TokenCheck::Expired => None,
    }
}
