use color_eyre::eyre::Result;
use serde_json::json;
use unicode_width::UnicodeWidthStr;

use eventdesk::{
    api::{ApiClient, QueryDescriptor, RecordsBackend, SortDirection},
    config::Config,
    dataset::Dataset,
    table::DisplayState,
};

use crate::util::truncate;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Page to fetch, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Field to sort by; the dataset's default order applies when omitted
    #[arg(long, value_name = "FIELD")]
    pub sort_by: Option<String>,

    /// asc or desc
    #[arg(long, value_name = "ORDER")]
    pub sort_order: Option<SortDirection>,

    /// Free-text filter
    #[arg(long, default_value = "")]
    pub search: String,

    /// Output in JSON format
    #[arg(short, long)]
    pub json: bool,
}

pub async fn command(
    client: &ApiClient,
    dataset: Dataset,
    config: &Config,
    args: Args,
) -> Result<()> {
    let definition = dataset.definition();
    let query = QueryDescriptor {
        page: args.page.max(1),
        page_size: config.page_size,
        sort: Some(
            super::sort_spec(args.sort_by.as_deref(), args.sort_order)
                .unwrap_or_else(|| definition.default_sort.clone()),
        ),
        search: args.search.trim().to_string(),
    };
    let page = client.list(dataset, &query).await?;

    if args.json {
        let output = json!({
            "dataset": dataset.id(),
            "page": page.page,
            "page_size": page.page_size,
            "total_items": page.total_items,
            "total_pages": page.total_pages,
            "items": page.items,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    let filtering = !query.search.is_empty();
    let mut display = DisplayState::new(config.page_size);
    display.apply_page(page);

    let columns: Vec<_> = definition
        .columns
        .iter()
        .filter(|column| !column.annotation)
        .collect();
    let header: Vec<String> = columns
        .iter()
        .map(|column| cell(column.label, column.width))
        .collect();
    println!("{}", header.join(" "));
    if display.items.is_empty() {
        println!("{}", definition.empty_message);
    }
    for record in &display.items {
        let row: Vec<String> = columns
            .iter()
            .map(|column| cell(&column.render_cell(record).text, column.width))
            .collect();
        println!("{}", row.join(" "));
    }
    println!();
    println!(
        "{} · {}",
        display.status_label(),
        display.metrics_label(filtering)
    );
    Ok(())
}

/// `text` cut or padded to exactly `width` columns.
fn cell(text: &str, width: u16) -> String {
    let width = usize::from(width);
    let text = truncate(text, width);
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_have_fixed_width() {
        assert_eq!(cell("Ana", 6), "Ana   ");
        assert_eq!(cell("Integrações", 6), "Integ…");
        assert_eq!(cell("João", 4), "João");
    }
}
