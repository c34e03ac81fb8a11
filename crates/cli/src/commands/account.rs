//! Account and session commands.

use feastly_storefront::{Result, StorefrontClient};
use secrecy::SecretString;
use tracing::info;

/// Sign in and persist the session.
///
/// # Errors
///
/// Returns an error if the email is malformed or the service rejects the
/// credentials.
pub async fn login(client: &StorefrontClient, email: &str, password: String) -> Result<()> {
    let password = SecretString::from(password);
    let user = client.login(email, &password).await?;
    info!(
        "Signed in as {} <{}> ({})",
        user.name,
        user.email.as_str(),
        user.role.as_str()
    );
    Ok(())
}

/// Create a customer account.
///
/// # Errors
///
/// Returns an error if the email is malformed or the service refuses the
/// registration.
pub async fn register(
    client: &StorefrontClient,
    name: &str,
    email: &str,
    password: String,
) -> Result<()> {
    let password = SecretString::from(password);
    client.register(name, email, &password).await?;
    info!("Account created for {email}. Sign in with `feastly login`.");
    Ok(())
}

/// Print the signed-in user.
///
/// # Errors
///
/// Returns an error if no session is stored.
#[allow(clippy::print_stdout)]
pub fn whoami(client: &StorefrontClient) -> Result<()> {
    let user = client.current_user()?;
    println!("{} <{}>", user.name, user.email.as_str());
    println!("  id:   {}", user.id);
    println!("  role: {}", user.role.as_str());
    if let Some(address) = &user.address {
        println!("  address: {address}");
    }
    Ok(())
}
