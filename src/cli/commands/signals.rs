//! List signal generators command.

use anyhow::Result;
use sync_signals::SignalRegistry;

pub async fn run() -> Result<()> {
    let registry = SignalRegistry::new();

    println!("Available Signal Generators");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        println!("  {} ({})", info.name, info.variant);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!("  Defaults: {}", info.default_config);
        println!();
    }

    println!("Use --variant <name> to select a generator.");

    Ok(())
}
