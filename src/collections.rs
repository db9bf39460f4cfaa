//! `rag collections`: list and drop collections.

use anyhow::{bail, Result};

use repo_rag_core::store::{CollectionInfo, VectorStore};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Pseudo-name selecting every collection in `rag collections drop`.
pub const ALL: &str = "ALL";

pub async fn run_list(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db.path).await?;
    let collections = store.list_collections().await?;
    store.close().await;

    if collections.is_empty() {
        println!("No collections.");
        return Ok(());
    }

    println!("{:<32} {:>10}", "COLLECTION", "DOCUMENTS");
    for CollectionInfo { name, documents } in &collections {
        println!("{:<32} {:>10}", name, documents);
    }
    Ok(())
}

pub async fn run_drop(config: &Config, name: &str, yes: bool) -> Result<()> {
    let store = SqliteStore::open(&config.db.path).await?;
    let result = drop_collections(&store, name, yes).await;
    store.close().await;

    let dropped = result?;
    if dropped.is_empty() {
        println!("No collections to drop.");
    }
    for name in dropped {
        println!("Dropped collection '{}'", name);
    }
    Ok(())
}

/// Drop `name`, or every collection when `name` is [`ALL`].
///
/// Returns the names actually dropped.
pub async fn drop_collections<S: VectorStore + ?Sized>(
    store: &S,
    name: &str,
    yes: bool,
) -> Result<Vec<String>> {
    if name == ALL {
        if !yes {
            bail!("Refusing to drop ALL collections without --yes");
        }
        let mut dropped = Vec::new();
        for info in store.list_collections().await? {
            if store.delete_collection(&info.name).await? {
                dropped.push(info.name);
            }
        }
        return Ok(dropped);
    }

    if !store.delete_collection(name).await? {
        bail!("Collection '{}' does not exist", name);
    }
    Ok(vec![name.to_string()])
}
