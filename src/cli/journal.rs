//! Terminal front end for the journal pipeline.

use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use penpal::config::{PenpalConfig, PINECONE_API_KEY_VAR};
use penpal::pipeline::Pipeline;
use penpal::store::{open_store, CollectionSpec};

/// Add one entry and print the confirmation.
pub async fn add(config: &PenpalConfig, text: &str) -> Result<()> {
    let pipeline = Pipeline::from_config(config).await?;
    println!("{}", pipeline.add_journal_entry(text).await);
    Ok(())
}

/// Answer one question.
pub async fn ask(config: &PenpalConfig, query: &str) -> Result<()> {
    let pipeline = Pipeline::from_config(config).await?;
    println!("{}", pipeline.handle_query(query).await);
    Ok(())
}

/// Read questions from stdin until EOF or `exit`.
pub async fn chat(config: &PenpalConfig) -> Result<()> {
    let pipeline = Pipeline::from_config(config).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Ask Penpal about your journal. Empty line or `exit` to quit.");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() || query == "exit" {
            break;
        }

        println!("Penpal is thinking...");
        println!("{}\n", pipeline.handle_query(query).await);
    }
    Ok(())
}

/// Create the collection (if needed). Only the store credentials are required.
pub async fn init(config: &PenpalConfig) -> Result<()> {
    if config.store.provider == "pinecone" && config.store.api_key.is_none() {
        anyhow::bail!("{PINECONE_API_KEY_VAR} is not set; it is required for the pinecone store");
    }
    let store = open_store(&config.store, &config.embedding.model)?;
    store
        .ensure_collection(&CollectionSpec::from_config(&config.store))
        .await
        .with_context(|| format!("failed to prepare collection {}", config.store.collection))?;
    println!(
        "Collection '{}' is ready ({} store, {} dimensions, {}).",
        config.store.collection, config.store.provider, config.store.dimension, config.store.metric
    );
    Ok(())
}
