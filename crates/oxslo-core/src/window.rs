//! Standard multi-window multi-burn-rate table and period scaling.

use crate::model::{Slo, WindowOverride, DEFAULT_ERROR_BUDGET_PERIOD};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Alert severity tier. `page` means the budget is burning fast enough to
/// need a human now; `ticket` means a slower burn that can wait for
/// working hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Page,
    Ticket,
}

impl Severity {
    /// Both tiers, page first. Generation order follows this.
    pub const ALL: [Severity; 2] = [Severity::Page, Severity::Ticket];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Page => write!(f, "page"),
            Severity::Ticket => write!(f, "ticket"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" => Ok(Severity::Page),
            "ticket" => Ok(Severity::Ticket),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Evaluation windows and burn-rate threshold factor for one severity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSpec {
    pub severity: Severity,
    pub short_window: Duration,
    pub long_window: Duration,
    pub burn_rate_factor: f64,
}

const PAGE_SHORT: Duration = Duration::from_secs(5 * 60);
const PAGE_LONG: Duration = Duration::from_secs(60 * 60);
const PAGE_FACTOR: f64 = 14.4;

const TICKET_SHORT: Duration = Duration::from_secs(30 * 60);
const TICKET_LONG: Duration = Duration::from_secs(6 * 60 * 60);
const TICKET_FACTOR: f64 = 6.0;

/// Returns the window spec for `severity`, linearly scaled from the
/// standard 30-day table. The burn-rate factor does not scale: moving the
/// windows with the period keeps the fraction of budget consumed before
/// alerting constant per tier.
pub fn windows(period: Duration, severity: Severity) -> WindowSpec {
    let (short, long, factor) = match severity {
        Severity::Page => (PAGE_SHORT, PAGE_LONG, PAGE_FACTOR),
        Severity::Ticket => (TICKET_SHORT, TICKET_LONG, TICKET_FACTOR),
    };
    WindowSpec {
        severity,
        short_window: scale(short, period),
        long_window: scale(long, period),
        burn_rate_factor: factor,
    }
}

fn scale(window: Duration, period: Duration) -> Duration {
    if period == DEFAULT_ERROR_BUDGET_PERIOD {
        return window;
    }
    let ratio = period.as_secs_f64() / DEFAULT_ERROR_BUDGET_PERIOD.as_secs_f64();
    Duration::from_secs((window.as_secs_f64() * ratio).round() as u64)
}

/// Window specs for the enabled severities of `slo`, overrides applied,
/// in page-then-ticket order.
pub fn alert_windows(slo: &Slo) -> Vec<WindowSpec> {
    Severity::ALL
        .iter()
        .filter_map(|&severity| {
            let policy = slo.alerting.policy(severity);
            if !policy.enabled {
                return None;
            }
            Some(match policy.window {
                Some(WindowOverride {
                    short_window,
                    long_window,
                    burn_rate_factor,
                }) => WindowSpec {
                    severity,
                    short_window,
                    long_window,
                    burn_rate_factor,
                },
                None => windows(slo.period, severity),
            })
        })
        .collect()
}
