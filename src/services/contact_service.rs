use crate::{
    dto::contact::ContactRequest,
    error::{AppError, AppResult},
    mailer::{Email, templates},
    response::ApiResponse,
    services::required,
    state::AppState,
};

/// Forward a contact-form submission to the site administrator.
pub async fn submit(
    state: &AppState,
    payload: ContactRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let name = required(&payload.name, "name")?;
    let email = required(&payload.email, "email")?;
    if !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    let message = required(&payload.message, "message")?;

    let admin_email = state
        .config
        .admin_email
        .as_deref()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("ADMIN_EMAIL is not configured")))?;

    let (subject, html) = templates::contact_form(&name, &email, &message);
    state
        .mailer
        .send(Email::new(admin_email, subject, html).reply_to(email.as_str()))
        .await?;

    tracing::info!(from = %email, "contact form forwarded");
    Ok(ApiResponse::done("Message sent"))
}
