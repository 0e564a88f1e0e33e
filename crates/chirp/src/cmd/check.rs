//! Check command - compile a filter and try it on an event
//!
//! ```bash
//! chirp check '{"==": [{"var": "user"}, "ana"]}'
//! echo '{"regex": [{"var": "tweet"}, "^RT"]}' | chirp check - --event '{"tweet": "RT hi"}'
//! ```

use std::io::Read;

use anyhow::{Context, Result};
use clap::Args;

use chirp_predicate::{OperatorRegistry, evaluate, parse_filter};
use chirp_protocol::Event;

/// Check command arguments
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Filter as JSON-Logic (`-` reads stdin)
    pub filter: String,

    /// Event JSON to evaluate the filter against
    #[arg(short, long)]
    pub event: Option<String>,
}

/// Run the check command
pub fn run(args: CheckArgs) -> Result<()> {
    let filter = if args.filter == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read filter from stdin")?;
        buf
    } else {
        args.filter
    };

    let report = check(&filter, args.event.as_deref(), &OperatorRegistry::new())?;
    for line in report {
        println!("{line}");
    }
    Ok(())
}

/// Compile (and optionally evaluate) a filter, returning the lines to print
fn check(filter: &str, event: Option<&str>, ops: &OperatorRegistry) -> Result<Vec<String>> {
    let predicate = parse_filter(filter, ops).context("filter rejected")?;

    let mut lines = vec![match &predicate {
        Some(p) => format!("filter ok: {}", p.rule()),
        None => "no filter: matches every event".to_string(),
    }];

    if let Some(raw) = event {
        let event = Event::from_json(raw).context("invalid event JSON")?;
        let matched = evaluate(predicate.as_ref(), event.value()).context("filter faulted")?;
        lines.push(if matched { "match".into() } else { "no match".into() });
    }

    Ok(lines)
}
