use std::path::Path;

use colored::Colorize;

use crate::error::DropbookError;
use crate::service::DropboxService;
use crate::types::{ItemType, MatchType};

pub async fn run_list(service: &DropboxService, path: &str) -> Result<(), DropbookError> {
    let items = service.list_files(path).await?;
    for item in &items {
        match item.item_type {
            ItemType::Folder => println!("{}/", item.name.blue().bold()),
            ItemType::File => match item.size {
                Some(size) => println!("{} ({})", item.name, format_size(size)),
                None => println!("{}", item.name),
            },
        }
    }
    Ok(())
}

pub async fn run_search(
    service: &DropboxService,
    query: &str,
    path: &str,
) -> Result<(), DropbookError> {
    let results = service.search(query, path).await?;
    if results.is_empty() {
        println!("No results found for '{query}'");
        return Ok(());
    }

    println!("Found {} result(s):", results.len());
    for (index, result) in results.iter().enumerate() {
        let kind = match result.match_type {
            MatchType::Filename => "name",
            MatchType::Content => "content",
            MatchType::Both => "name+content",
        };
        println!("[{}] {} ({kind})", index + 1, result.metadata.path);
    }
    Ok(())
}

pub async fn run_upload(
    service: &DropboxService,
    local: &str,
    remote: &str,
    overwrite: bool,
) -> Result<(), DropbookError> {
    let item = service
        .upload_file(Path::new(local), remote, overwrite)
        .await?;
    match item.size {
        Some(size) => println!(
            "{} {} ({})",
            "Uploaded:".green(),
            item.name,
            format_size(size)
        ),
        None => println!("{} {}", "Uploaded:".green(), item.name),
    }
    Ok(())
}

pub async fn run_download(
    service: &DropboxService,
    remote: &str,
    local: &str,
) -> Result<(), DropbookError> {
    service.download_file(remote, Path::new(local)).await?;
    println!("{} {local}", "Downloaded to:".green());
    Ok(())
}

pub async fn run_delete(service: &DropboxService, path: &str) -> Result<(), DropbookError> {
    service.delete(path).await?;
    println!("{} {path}", "Deleted:".green());
    Ok(())
}

pub async fn run_account(service: &DropboxService) -> Result<(), DropbookError> {
    let account = service.account_info().await?;
    println!("{} <{}>", account.name, account.email);
    Ok(())
}

/// Human-readable size, base 1024.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
