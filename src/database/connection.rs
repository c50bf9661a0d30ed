use log::{error, warn};
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use tokio::time::Duration;
use tokio_postgres::{Client, NoTls};
use url::Url;

const MAX_RETRIES: usize = 10;
const WAIT_BETWEEN_RETRIES: u64 = 5;

pub fn create_ssl_connector(sslrootcert_path: &str) -> Result<MakeTlsConnector, String> {
    let mut builder =
        SslConnector::builder(SslMethod::tls()).map_err(|e| format!("SSL builder error: {}", e))?;

    builder
        .set_ca_file(sslrootcert_path)
        .map_err(|e| format!("Error loading CA cert: {}", e))?;

    builder.set_verify(SslVerifyMode::NONE); // TEMPORARY FOR SELF-SIGNED CERTS

    Ok(MakeTlsConnector::new(builder.build()))
}

/// Split the `sslrootcert` parameter off a connection URL.
///
/// tokio-postgres does not understand `sslrootcert`, so it is removed from
/// the query string and returned separately. The remaining parameters are
/// kept in order.
pub fn split_sslrootcert(database_url: &str) -> Result<(String, Option<String>), String> {
    let url = Url::parse(database_url).map_err(|e| format!("URL parse error: {}", e))?;

    let mut sslrootcert_path = None;
    let mut clean_params = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "sslrootcert" {
            sslrootcert_path = Some(value.to_string());
        } else {
            clean_params.push((key.into_owned(), value.into_owned()));
        }
    }

    let mut clean_url = url.clone();
    clean_url.set_query(None);
    if !clean_params.is_empty() {
        let query = clean_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        clean_url.set_query(Some(&query));
    }

    Ok((clean_url.to_string(), sslrootcert_path))
}

/// Open a connection, over TLS when a root certificate is given.
async fn connect(database_url: &str) -> Result<Client, String> {
    let (clean_database_url, sslrootcert_path) = split_sslrootcert(database_url)?;

    let client = match sslrootcert_path {
        Some(path) => {
            let connector = create_ssl_connector(&path)?;
            let (client, connection) = tokio_postgres::connect(&clean_database_url, connector)
                .await
                .map_err(|e| format!("Connection error: {}", e))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            client
        }
        None => {
            let (client, connection) = tokio_postgres::connect(&clean_database_url, NoTls)
                .await
                .map_err(|e| format!("Connection error: {}", e))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            client
        }
    };

    Ok(client)
}

pub async fn execute_with_retry<F, Fut>(database_url: &str, operation: F) -> Result<(), String>
where
    F: Fn(Client) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<u64, tokio_postgres::Error>> + Send,
{
    for attempt in 0..MAX_RETRIES {
        match connect(database_url).await {
            Ok(client) => match operation(client).await {
                Ok(_) => return Ok(()),
                Err(e) => error!("Attempt {}: query error: {}", attempt + 1, e),
            },
            Err(e) => warn!("Attempt {}: {}", attempt + 1, e),
        }

        if attempt < MAX_RETRIES - 1 {
            tokio::time::sleep(Duration::from_secs(WAIT_BETWEEN_RETRIES)).await;
        }
    }

    Err("Max retries exceeded".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sslrootcert_from_query() {
        let (url, cert) = split_sslrootcert(
            "postgresql://user:pw@db.local:5432/metriful?sslmode=require&sslrootcert=/etc/ca.pem",
        )
        .unwrap();

        assert_eq!(url, "postgresql://user:pw@db.local:5432/metriful?sslmode=require");
        assert_eq!(cert.as_deref(), Some("/etc/ca.pem"));
    }

    #[test]
    fn plain_url_has_no_certificate() {
        let (url, cert) = split_sslrootcert("postgresql://localhost/metriful").unwrap();
        assert_eq!(url, "postgresql://localhost/metriful");
        assert!(cert.is_none());
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(split_sslrootcert("not a url").is_err());
    }
}
