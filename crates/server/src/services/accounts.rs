use tracing::{error, info, instrument};

use crate::error::{RequestError, ValidationError};
use crate::models::session::Identity;
use crate::models::user::{
    validate_user_email, validate_user_password, CredentialsForm, UserRecord, UserRole,
};
use crate::store::commands::insert_user;
use crate::store::connection::StoreHandles;
use crate::store::error::StoreError;
use crate::store::utils::map_conflict_as_none;
use crate::store::AuthProvider;

pub fn role_for(email: &str, admin_emails: &[String]) -> UserRole {
    if admin_emails
        .iter()
        .any(|admin| admin.trim().eq_ignore_ascii_case(email))
    {
        UserRole::Admin
    } else {
        UserRole::Regular
    }
}

/// Creates the account with the auth service and mirrors it into the `user`
/// table. The password never reaches the table.
#[instrument(skip_all)]
pub async fn register(
    stores: &StoreHandles,
    form: CredentialsForm,
    admin_emails: &[String],
) -> Result<Identity, RequestError> {
    let form = form.trimmed();
    form.require_both()?;
    validate_user_email(&form.username)?;
    validate_user_password(&form.password)?;

    let user = stores
        .auth
        .sign_up(&form.username, &form.password)
        .await
        .map_err(refused_as_validation)?;
    let record = UserRecord {
        id: user.id,
        email: user.email.clone().unwrap_or_else(|| form.username.clone()),
    };
    if let Err(e) = map_conflict_as_none(insert_user(stores.data.as_ref(), &record).await) {
        error!("auth account {} created but not mirrored: {e}", user.id);
        return Err(e.into());
    }

    // unconfirmed addresses cannot sign in yet, the session then carries no token
    let access_token = match stores
        .auth
        .sign_in_with_password(&form.username, &form.password)
        .await
    {
        Ok(session) => Some(session.access_token),
        Err(StoreError::InvalidCredentials) => None,
        Err(e) => return Err(e.into()),
    };
    info!("registered user {}", user.id);
    Ok(Identity {
        user_id: user.id,
        role: role_for(&form.username, admin_emails),
        username: form.username,
        access_token,
    })
}

#[instrument(skip_all)]
pub async fn login(
    auth: &dyn AuthProvider,
    form: CredentialsForm,
    admin_emails: &[String],
) -> Result<Identity, RequestError> {
    let form = form.trimmed();
    form.require_both()?;
    let session = auth
        .sign_in_with_password(&form.username, &form.password)
        .await?;
    Ok(Identity {
        user_id: session.user.id,
        role: role_for(&form.username, admin_emails),
        username: form.username,
        access_token: Some(session.access_token),
    })
}

fn refused_as_validation(e: StoreError) -> RequestError {
    match e {
        StoreError::Rejected { status, message } if (400..500).contains(&status) && status != 429 => {
            ValidationError::Refused { reason: message }.into()
        }
        e => e.into(),
    }
}
