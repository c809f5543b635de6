use anyhow::Context;
use minio::s3::{Client, creds::StaticProvider, http::BaseUrl};

use crate::config::S3Settings;

pub fn get_s3_client(settings: &S3Settings) -> anyhow::Result<Client> {
    let mut base_url = settings.endpoint.parse::<BaseUrl>().context("Failed to parse s3 endpoint")?;
    if let Some(region) = &settings.region {
        base_url.region = region.clone();
    }
    let static_provider = StaticProvider::new(&settings.access_key_id, &settings.secret_access_key, None);
    Client::new(base_url, Some(Box::new(static_provider)), None, None).context("Failed to create s3 client")
}
