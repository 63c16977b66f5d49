use crate::output::print_json;
use crate::workspace::Workspace;
use std::path::Path;
use waypoint_core::pivot;

pub fn run(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(root)?;
    let session = ws.store.get(id)?;
    let rec = pivot::evaluate(&session, &ws.config.pivot);
    if json {
        return print_json(&rec);
    }
    if rec.recommended {
        println!("pivot recommended: {}", rec.rationale);
        for (i, alt) in rec.alternatives.iter().enumerate() {
            println!("  {}. {} — {}", i + 1, alt.direction, alt.rationale);
        }
    } else {
        println!("no pivot: {}", rec.rationale);
    }
    Ok(())
}
