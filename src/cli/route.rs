//! Route command implementation

use std::io::{self, BufRead};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::router::{RoutingDecision, RuleTable};

/// Print the chunk each module identifier is routed to
#[derive(Args, Debug)]
pub struct RouteCommand {
    /// Module identifiers; read from stdin (one per line) when omitted
    pub ids: Vec<String>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// One routing decision, as printed by `--json`
#[derive(Debug, Serialize)]
struct RouteReport<'a> {
    id: &'a str,
    partition: Option<&'a str>,
    reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
}

impl RouteCommand {
    pub fn execute(&self, config_path: &str) -> Result<()> {
        let table = load_rule_table(config_path)?;

        let ids = if self.ids.is_empty() {
            io::stdin()
                .lock()
                .lines()
                .collect::<io::Result<Vec<_>>>()
                .context("Failed to read module identifiers from stdin")?
                .into_iter()
                .filter(|line| !line.trim().is_empty())
                .collect()
        } else {
            self.ids.clone()
        };

        let reports: Vec<RouteReport> = ids
            .iter()
            .map(|id| report(table.as_ref(), id))
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            for r in &reports {
                match (&r.partition, &r.rule) {
                    (Some(partition), Some(rule)) => println!("{} -> {} ({})", r.id, partition, rule),
                    (Some(partition), None) => println!("{} -> {} ({})", r.id, partition, r.reason),
                    (None, _) => println!("{} -> (entry)", r.id),
                }
            }
        }

        Ok(())
    }
}

/// Rules from the config file, or the built-in policy when there is none
fn load_rule_table(config_path: &str) -> Result<Option<RuleTable>> {
    if Path::new(config_path).exists() {
        Config::load(config_path)?.rule_table()
    } else {
        debug!("{} not found, using the default chunk rules", config_path);
        Ok(Some(RuleTable::default()))
    }
}

fn report<'a>(table: Option<&'a RuleTable>, id: &'a str) -> RouteReport<'a> {
    let decision = table
        .map(|t| t.decide(id))
        .unwrap_or(RoutingDecision::Application);

    let (reason, rule) = match decision {
        RoutingDecision::Application => (
            "application",
            table.map(|t| format!("not {}", t.third_party())),
        ),
        RoutingDecision::Library { rule, .. } => {
            let predicate = table.map(|t| t.rules()[rule].predicate.to_string());
            ("library", predicate.map(|p| format!("rule {}: {}", rule + 1, p)))
        }
        RoutingDecision::Vendor { .. } => ("fallback", None),
    };

    RouteReport {
        id,
        partition: decision.partition().map(|p| p.as_str()),
        reason,
        rule,
    }
}
