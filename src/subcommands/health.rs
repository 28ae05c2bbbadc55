use color_eyre::eyre::{Result, eyre};

use eventdesk::api::ApiClient;

pub struct Options {
    pub json: bool,
}

pub async fn command(client: &ApiClient, options: Options) -> Result<()> {
    let status = client.health().await?;

    if options.json {
        println!("{}", serde_json::to_string(&status)?);
    } else {
        println!(
            "{} {} ({}) em {}",
            status.service,
            status.status,
            client.base_url(),
            status.timestamp
        );
    }

    if !status.is_ok() {
        return Err(eyre!("service reported status '{}'", status.status));
    }
    Ok(())
}
