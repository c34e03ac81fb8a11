//! Raw request passthrough.

use std::str::FromStr;

use feastly_storefront::transport::Method;
use feastly_storefront::{ApiRequest, StorefrontClient};

/// Send `method path` with an optional JSON body and print the response.
///
/// # Errors
///
/// Returns an error if the method or body is invalid or the request fails.
#[allow(clippy::print_stdout)]
pub async fn send(
    client: &StorefrontClient,
    method: &str,
    path: &str,
    data: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let method = Method::from_str(&method.to_ascii_uppercase())?;
    let mut request = ApiRequest::new(method, path);
    if let Some(data) = data {
        request = request.json(serde_json::from_str(data)?);
    }

    let response = client.send(request).await?;
    tracing::debug!(status = %response.status(), "Request completed");
    println!("{}", serde_json::to_string_pretty(response.body())?);
    Ok(())
}
