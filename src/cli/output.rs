use std::io::Write;

use colored::Colorize;

use crate::error::AuthError;
use crate::oauth::JwtExpInfo;

/// Render an epoch timestamp as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_expiry(timestamp: i64) -> String {
    match chrono::DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("invalid timestamp {timestamp}"),
    }
}

fn label(text: &str, is_tty: bool) -> String {
    if is_tty {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

fn life(percent: i64, is_tty: bool) -> String {
    let text = format!("{percent}%");
    if !is_tty {
        return text;
    }
    match percent {
        p if p < crate::oauth::REFRESH_THRESHOLD_PERCENT => text.red().to_string(),
        p if p < 50 => text.yellow().to_string(),
        _ => text.green().to_string(),
    }
}

pub fn print_exp_info(
    out: &mut impl Write,
    info: &JwtExpInfo,
    expiry_label: &str,
    life_label: &str,
    is_tty: bool,
) -> Result<(), AuthError> {
    let expiry = match info.expires_at {
        Some(ts) => format_expiry(ts),
        None => "unknown".to_string(),
    };
    writeln!(out, "{}: {}", label(expiry_label, is_tty), expiry)?;
    writeln!(
        out,
        "{}: {}",
        label(life_label, is_tty),
        life(info.life_remaining, is_tty)
    )?;
    Ok(())
}
