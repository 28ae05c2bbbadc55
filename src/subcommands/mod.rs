pub mod export;
pub mod health;
pub mod list;

use eventdesk::api::{SortDirection, SortSpec};

/// `--sort-by`/`--sort-order` as a sort spec; order alone is ignored.
fn sort_spec(sort_by: Option<&str>, order: Option<SortDirection>) -> Option<SortSpec> {
    let field = sort_by.map(str::trim).filter(|field| !field.is_empty())?;
    Some(SortSpec::new(field, order.unwrap_or(SortDirection::Asc)))
}
