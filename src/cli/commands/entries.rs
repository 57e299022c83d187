//! Entry maintenance - list and clear cached output

use crate::cache::CacheStore;
use crate::error::MemoizeResult;
use console::style;

/// Print every committed entry with its size
pub async fn list(store: &CacheStore) -> MemoizeResult<()> {
    let entries = store.list().await?;

    if entries.is_empty() {
        println!("No cached entries in {}", store.root().display());
        return Ok(());
    }

    println!("{:<10} {:>12}  {}", "KEY", "BYTES", "PATH");
    for entry in &entries {
        println!(
            "{:<10} {:>12}  {}",
            entry.key,
            entry.size,
            entry.path.display()
        );
    }

    Ok(())
}

/// Remove every entry and orphaned wip file
pub async fn clear(store: &CacheStore) -> MemoizeResult<()> {
    let removed = store.clear().await?;
    println!(
        "{} Removed {} cached file{} from {}",
        style("✓").green(),
        removed,
        if removed == 1 { "" } else { "s" },
        store.root().display()
    );
    Ok(())
}
