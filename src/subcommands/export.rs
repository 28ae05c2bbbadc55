use color_eyre::eyre::Result;
use humansize::{DECIMAL, format_size};

use eventdesk::{
    api::{ApiClient, ExportQuery, RecordsBackend, SortDirection},
    config::Config,
    dataset::Dataset,
    table::{fallback_export_filename, save_export},
};

use crate::util::abbreviate_home;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Field to sort by; the dataset's default order applies when omitted
    #[arg(long, value_name = "FIELD")]
    pub sort_by: Option<String>,

    /// asc or desc
    #[arg(long, value_name = "ORDER")]
    pub sort_order: Option<SortDirection>,

    /// Free-text filter
    #[arg(long, default_value = "")]
    pub search: String,
}

pub async fn command(
    client: &ApiClient,
    dataset: Dataset,
    config: &Config,
    args: Args,
) -> Result<()> {
    let definition = dataset.definition();
    let query = ExportQuery {
        sort: Some(
            super::sort_spec(args.sort_by.as_deref(), args.sort_order)
                .unwrap_or_else(|| definition.default_sort.clone()),
        ),
        search: args.search.trim().to_string(),
    };
    let payload = client.export(dataset, &query).await?;
    let filename = payload.filename.unwrap_or_else(|| {
        fallback_export_filename(definition.label, chrono::Local::now().naive_local())
    });
    let outcome = save_export(&config.export_dir, &filename, &payload.bytes).await?;

    println!(
        "{} ({})",
        abbreviate_home(&outcome.path),
        format_size(outcome.bytes, DECIMAL)
    );
    Ok(())
}
