//! Client-side session expiry watchdog.
//!
//! The access token is a JWT whose `exp` claim is read locally (the signature
//! is not verified). A periodic check warns the user as expiry approaches and
//! clears the token once it has expired.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::TokenWatchConfig;
use crate::error::{OkrError, Result};
use crate::notify::Notifier;

/// Read the `exp` claim (seconds since the epoch) from a JWT.
pub fn decode_expiry(token: &str) -> Result<i64> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(OkrError::Token("token is not a JWT".into()));
    }
    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| OkrError::Token(format!("invalid payload encoding: {e}")))?;
    let claims: serde_json::Value = serde_json::from_slice(&payload)?;
    let exp = &claims["exp"];
    exp.as_i64()
        .or_else(|| exp.as_f64().map(|v| v as i64))
        .ok_or_else(|| OkrError::Token("token has no exp claim".into()))
}

/// Result of one watchdog check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCheck {
    NoToken,
    /// Expired or unreadable.
    Expired,
    Valid { minutes_left: i64 },
    /// Inside the warning window. `notified` is false when throttled.
    ExpiringSoon { minutes_left: i64, notified: bool },
    /// Inside the final window. Only the first check notifies.
    FinalWarning { minutes_left: i64, notified: bool },
}

impl TokenCheck {
    /// Whether the watchdog should keep running after this check.
    pub fn keeps_watching(&self) -> bool {
        !matches!(self, TokenCheck::NoToken | TokenCheck::Expired)
    }
}

/// Stateful evaluator behind the watchdog: remembers when it last warned
/// and whether the final warning was already shown.
#[derive(Debug, Clone)]
pub struct TokenChecker {
    config: TokenWatchConfig,
    last_warning: Option<Instant>,
    final_warning_shown: bool,
}

impl TokenChecker {
    pub fn new(config: TokenWatchConfig) -> Self {
        Self {
            config,
            last_warning: None,
            final_warning_shown: false,
        }
    }

    /// Evaluate `token` at `now_unix` (seconds) / `now` (monotonic).
    pub fn check_at(&mut self, token: Option<&str>, now_unix: i64, now: Instant) -> TokenCheck {
        let Some(token) = token else {
            return TokenCheck::NoToken;
        };
        let exp = match decode_expiry(token) {
            Ok(exp) => exp,
            Err(e) => {
                debug!(error = %e, "unreadable token treated as expired");
                return TokenCheck::Expired;
            }
        };
        if exp < now_unix {
            return TokenCheck::Expired;
        }

        let minutes_left = (exp - now_unix) / 60;
        let warn = self.config.warn_within_minutes;
        let last_call = self.config.final_warning_within_minutes;

        if minutes_left <= warn && minutes_left > last_call {
            let throttled = self
                .last_warning
                .is_some_and(|last| now.duration_since(last) <= self.config.warning_throttle());
            if !throttled {
                self.last_warning = Some(now);
            }
            return TokenCheck::ExpiringSoon {
                minutes_left,
                notified: !throttled,
            };
        }

        if minutes_left <= last_call && minutes_left > 0 {
            let notified = !self.final_warning_shown;
            self.final_warning_shown = true;
            return TokenCheck::FinalWarning {
                minutes_left,
                notified,
            };
        }

        TokenCheck::Valid { minutes_left }
    }

    pub fn check(&mut self, token: Option<&str>) -> TokenCheck {
        self.check_at(token, chrono::Utc::now().timestamp(), Instant::now())
    }
}

/// Emit the user-facing notification for `check`, if any.
pub fn notify_check(check: &TokenCheck, notifier: &dyn Notifier) {
    match check {
        TokenCheck::ExpiringSoon {
            minutes_left,
            notified: true,
        } => notifier.warning(&format!(
            "Sessão expirando em breve: sua sessão expira em {minutes_left} minutos. Considere salvar seu trabalho."
        )),
        TokenCheck::FinalWarning {
            minutes_left,
            notified: true,
        } => notifier.error(&format!(
            "Sessão expirando agora! Sua sessão expira em {minutes_left} minuto(s). Salve seu trabalho e faça login novamente."
        )),
        TokenCheck::Expired => {
            notifier.error("Sessão expirada. Sua sessão expirou, faça login novamente.")
        }
        _ => {}
    }
}

/// Run the watchdog until the token is missing or expired.
///
/// Checks immediately, then every `check_interval`. On expiry the token in
/// `tokens` is cleared so every receiver observes the logout. The final
/// check is returned.
pub fn spawn_token_watchdog(
    tokens: watch::Sender<Option<String>>,
    notifier: Arc<dyn Notifier>,
    config: TokenWatchConfig,
) -> JoinHandle<TokenCheck> {
    spawn_token_watchdog_with_clock(tokens, notifier, config, || {
        chrono::Utc::now().timestamp()
    })
}

/// [`spawn_token_watchdog`] reading wall-clock seconds from `clock`.
///
/// `clock` is called on every tick; the monotonic clock only paces the
/// checks and the warning throttle.
pub fn spawn_token_watchdog_with_clock<C>(
    tokens: watch::Sender<Option<String>>,
    notifier: Arc<dyn Notifier>,
    config: TokenWatchConfig,
    clock: C,
) -> JoinHandle<TokenCheck>
where
    C: Fn() -> i64 + Send + 'static,
{
    let period = config.check_interval().max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut checker = TokenChecker::new(config);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let token = tokens.borrow().clone();
            let check = checker.check_at(token.as_deref(), clock(), Instant::now());
            debug!(?check, "token check");
            notify_check(&check, notifier.as_ref());

            match check {
                TokenCheck::NoToken => return check,
                TokenCheck::Expired => {
                    info!("session token expired, clearing it");
                    tokens.send_replace(None);
                    return check;
                }
                _ => {}
            }
        }
    })
}

#[cfg(test)]
pub(crate) fn make_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"user-1","exp":{exp}}}"#));
    format!("{header}.{claims}.signature")
}
